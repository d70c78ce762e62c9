//! ホストディレクトリからボリュームへの同期
//!
//! 対象ボリュームをマウントした使い捨てコンテナを立て、ホストの
//! ディレクトリツリーを tar ストリームとしてコピーします。producer
//! （walk + tar 書き込み）と consumer（アーカイブコピー呼び出し）は
//! パイプで結合されて並行に実行されます。

use crate::archive::spawn_tar_stream;
use crate::error::{Result, SyncError};
use crate::volume::Volumes;
use bollard::Docker;
use bollard::container::{DownloadFromContainerOptions, UploadToContainerOptions};
use futures_util::stream::StreamExt;
use podflow_container::Containers;
use podflow_core::{
    ContainerSpec, SyncJob, SyncMode, with_command, with_env, with_image, with_name,
    with_named_volume,
};
use std::io::Read;
use std::time::Duration;

/// 使い捨てコンテナのイメージ
const WRITER_IMAGE: &str = "docker.io/library/alpine:latest";

/// コピー完了後、エンジン側の展開を待つ時間
const SETTLE_DELAY: Duration = Duration::from_millis(500);

/// ボリューム同期のエントリポイント
pub struct VolumeSync {
    docker: Docker,
}

impl VolumeSync {
    pub fn new(docker: Docker) -> Self {
        Self { docker }
    }

    /// ジョブに従ってホストディレクトリをボリュームへ同期する
    ///
    /// - Skip: ボリュームが既にあれば何もせず成功
    /// - Update: 既存ボリュームを維持したまま上書きコピー
    /// - Overwrite: ボリュームを削除・再作成してからコピー
    ///
    /// タイムアウトは呼び出し側がこの future に対して課します。future が
    /// drop されるとパイプが閉じ、producer 側の walk も中断されます。
    pub async fn sync(&self, job: &SyncJob) -> Result<()> {
        let meta = std::fs::metadata(&job.host_dir).map_err(|e| SyncError::HostDirUnreadable {
            path: job.host_dir.clone(),
            source: e,
        })?;
        if !meta.is_dir() {
            return Err(SyncError::HostDirNotDirectory {
                path: job.host_dir.clone(),
            });
        }

        let volumes = Volumes::new(self.docker.clone());
        let exists = volumes.exists(&job.volume).await?;

        match job.mode {
            SyncMode::Skip if exists => {
                tracing::debug!("Volume '{}' already exists, skipping sync", job.volume);
                return Ok(());
            }
            SyncMode::Skip => volumes.create(&job.volume).await?,
            SyncMode::Update => {
                if !exists {
                    volumes.create(&job.volume).await?;
                }
            }
            SyncMode::Overwrite => volumes.overwrite(&job.volume).await?,
        }

        self.copy_tree(job).await
    }

    /// 使い捨てコンテナ経由でホストツリーをボリュームへコピーする
    async fn copy_tree(&self, job: &SyncJob) -> Result<()> {
        let containers = Containers::new(self.docker.clone());

        let spec = writer_spec(
            &format!("podflow-volume-writer-{}", job.volume),
            &job.volume,
            &job.mount_path,
        )?;
        let helper_id = containers.start(&spec).await?;

        let result = self.stream_into(&helper_id, job).await;

        // 後片付けは成否に関わらず実施する。失敗は warn ログのみで、
        // 呼び出し元へ返す結果を覆さない
        containers.stop_and_remove(&helper_id).await;

        if result.is_ok() {
            tokio::time::sleep(SETTLE_DELAY).await;
            tracing::info!(
                "Synced '{}' into volume '{}'",
                job.host_dir.display(),
                job.volume
            );
        }
        result
    }

    /// tar ストリームをアーカイブコピー API へ流し込む
    async fn stream_into(&self, container_id: &str, job: &SyncJob) -> Result<()> {
        let rx = spawn_tar_stream(job.host_dir.clone());
        let chunks = futures_util::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|chunk| (chunk, rx))
        });

        let options = UploadToContainerOptions {
            path: job.mount_path.clone(),
            ..Default::default()
        };
        self.docker
            .upload_to_container(container_id, Some(options), bollard::body_try_stream(chunks))
            .await?;
        Ok(())
    }

    /// ボリューム内のファイルを 1 つ読み出す
    ///
    /// 使い捨てコンテナにボリュームをマウントし、アーカイブとして
    /// 取り出して中身を返します。検証用の補助手段です。
    pub async fn read_file(
        &self,
        volume: &str,
        mount_path: &str,
        file_name: &str,
    ) -> Result<String> {
        let containers = Containers::new(self.docker.clone());

        let spec = writer_spec(
            &format!("podflow-volume-reader-{}", volume),
            volume,
            mount_path,
        )?;
        let helper_id = containers.start(&spec).await?;

        let result = self
            .download_file(&helper_id, mount_path, file_name)
            .await;

        containers.stop_and_remove(&helper_id).await;
        result
    }

    async fn download_file(
        &self,
        container_id: &str,
        mount_path: &str,
        file_name: &str,
    ) -> Result<String> {
        let options = DownloadFromContainerOptions {
            path: format!("{}/{}", mount_path.trim_end_matches('/'), file_name),
        };

        let mut stream = self.docker.download_from_container(container_id, Some(options));
        let mut buf = Vec::new();
        while let Some(chunk) = stream.next().await {
            buf.extend_from_slice(&chunk?);
        }

        let mut archive = tar::Archive::new(&buf[..]);
        for entry in archive.entries()? {
            let mut entry = entry?;
            if entry.path()?.to_string_lossy() == file_name {
                let mut contents = String::new();
                entry.read_to_string(&mut contents)?;
                return Ok(contents);
            }
        }

        Err(SyncError::FileNotFoundInArchive {
            file: file_name.to_string(),
        })
    }
}

/// ボリュームをマウントして常駐する使い捨てコンテナの仕様
fn writer_spec(name: &str, volume: &str, mount_path: &str) -> Result<ContainerSpec> {
    Ok(ContainerSpec::build([
        with_image(WRITER_IMAGE),
        with_name(name),
        with_env("MOUNT", mount_path),
        with_command(["sh", "-c", "mkdir -p \"$MOUNT\"; exec tail -f /dev/null"]),
        with_named_volume(volume, mount_path),
    ])?)
}
