//! ボリューム操作
//!
//! 存在確認・作成・削除・上書き再作成。存在確認と削除は一時的な
//! エンジンエラーに備えてリトライ付きで実行します。not found は
//! 想定内のエラーとして扱い、リトライしません。

use crate::error::{Result, SyncError};
use crate::retry::with_retry;
use bollard::Docker;
use bollard::volume::{CreateVolumeOptions, RemoveVolumeOptions};
use podflow_core::RemoveBehavior;
use std::time::Duration;

/// 存在確認のリトライ回数とベース遅延
const EXISTS_ATTEMPTS: u32 = 3;
const EXISTS_BASE_DELAY: Duration = Duration::from_millis(80);

/// 削除リトライのベース遅延
const REMOVE_BASE_DELAY: Duration = Duration::from_millis(100);

/// ボリューム操作のエントリポイント
pub struct Volumes {
    docker: Docker,
}

impl Volumes {
    pub fn new(docker: Docker) -> Self {
        Self { docker }
    }

    /// ボリュームが存在するかどうか（リトライ付き）
    pub async fn exists(&self, name: &str) -> Result<bool> {
        with_retry(EXISTS_ATTEMPTS, EXISTS_BASE_DELAY, || async move {
            match self.docker.inspect_volume(name).await {
                Ok(_) => Ok(true),
                Err(bollard::errors::Error::DockerResponseServerError {
                    status_code: 404, ..
                }) => Ok(false),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(SyncError::from)
    }

    /// ボリュームを作成する
    ///
    /// エンジン側で同名ボリュームが既にあればそれがそのまま使われます。
    pub async fn create(&self, name: &str) -> Result<()> {
        self.docker
            .create_volume(CreateVolumeOptions {
                name: name.to_string(),
                ..Default::default()
            })
            .await?;
        Ok(())
    }

    /// ボリュームを削除する
    ///
    /// behavior に従い、リトライ（指数バックオフ）・強制削除への
    /// エスカレーション・not found の容認を行います。最終的な失敗は
    /// VolumeRemove でラップされ、元のエラーは source から辿れます。
    pub async fn remove(&self, name: &str, behavior: &RemoveBehavior) -> Result<()> {
        let result = with_retry(behavior.attempts, REMOVE_BASE_DELAY, || async move {
            match self.try_remove(name, behavior.force).await {
                Ok(()) => Ok(()),
                Err(e) => {
                    if behavior.retry_force && !behavior.force {
                        // 強制削除で再試行
                        self.try_remove(name, true).await
                    } else {
                        Err(e)
                    }
                }
            }
        })
        .await;

        match result {
            Ok(()) => Ok(()),
            Err(e) if behavior.ignore_not_found && is_not_found(&e) => Ok(()),
            Err(e) => Err(SyncError::VolumeRemove {
                name: name.to_string(),
                source: e,
            }),
        }
    }

    /// ボリュームを削除してから作り直す
    ///
    /// 存在しない場合は単に作成します。
    pub async fn overwrite(&self, name: &str) -> Result<()> {
        if self.exists(name).await? {
            self.remove(name, &RemoveBehavior::for_overwrite()).await?;
        }
        self.create(name).await
    }

    async fn try_remove(
        &self,
        name: &str,
        force: bool,
    ) -> std::result::Result<(), bollard::errors::Error> {
        self.docker
            .remove_volume(name, Some(RemoveVolumeOptions { force }))
            .await
    }
}

fn is_not_found(err: &bollard::errors::Error) -> bool {
    matches!(
        err,
        bollard::errors::Error::DockerResponseServerError {
            status_code: 404,
            ..
        }
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    #[ignore] // Docker接続が必要なため、通常のテストではスキップ
    async fn test_volume_create_exists_remove() {
        let docker = podflow_container::init_docker().await.unwrap();
        let volumes = Volumes::new(docker);

        let name = "podflow-test-volume-lifecycle";
        assert!(!volumes.exists(name).await.unwrap());

        volumes.create(name).await.unwrap();
        assert!(volumes.exists(name).await.unwrap());

        volumes
            .remove(name, &RemoveBehavior::default())
            .await
            .unwrap();
        assert!(!volumes.exists(name).await.unwrap());
    }

    #[tokio::test]
    #[ignore] // Docker接続が必要なため、通常のテストではスキップ
    async fn test_remove_missing_volume_with_ignore_not_found() {
        let docker = podflow_container::init_docker().await.unwrap();
        let volumes = Volumes::new(docker);

        let behavior = RemoveBehavior {
            ignore_not_found: true,
            ..Default::default()
        };
        volumes
            .remove("podflow-test-no-such-volume", &behavior)
            .await
            .unwrap();
    }

    #[tokio::test]
    #[ignore] // Docker接続が必要なため、通常のテストではスキップ
    async fn test_remove_missing_volume_reports_wrapped_error() {
        let docker = podflow_container::init_docker().await.unwrap();
        let volumes = Volumes::new(docker);

        let err = volumes
            .remove("podflow-test-no-such-volume", &RemoveBehavior::default())
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::VolumeRemove { .. }));
    }

    #[tokio::test]
    #[ignore] // Docker接続が必要なため、通常のテストではスキップ
    async fn test_overwrite_recreates_volume() {
        let docker = podflow_container::init_docker().await.unwrap();
        let volumes = Volumes::new(docker);

        let name = "podflow-test-volume-overwrite";
        volumes.create(name).await.unwrap();
        volumes.overwrite(name).await.unwrap();
        assert!(volumes.exists(name).await.unwrap());

        volumes
            .remove(name, &RemoveBehavior::default())
            .await
            .unwrap();
    }
}
