//! コンテナのライフサイクル管理
//!
//! 冪等な作成（既存なら再調整、イメージ未取得なら pull、無ければ作成）、
//! 起動、inspect、ヘルス観測を提供します。ローカルに状態は持たず、
//! 毎回エンジンへ問い合わせます。

use crate::converter::spec_to_container_config;
use crate::error::{ContainerError, Result};
use crate::status::classify_inspection;
use bollard::Docker;
use bollard::container::{
    InspectContainerOptions, RemoveContainerOptions, StartContainerOptions, StopContainerOptions,
};
use bollard::image::CreateImageOptions;
use bollard::models::{ContainerInspectResponse, CreateImageInfo};
use futures_util::stream::StreamExt;
use podflow_core::{ContainerSpec, ContainerStatus};

/// ヘルスログが存在しない場合の番兵値（0 = healthy と区別する）
pub const NO_HEALTH_DATA: i64 = -1;

/// コンテナ作成・再調整の結果
#[derive(Debug, Clone)]
pub struct CreateContainerResult {
    pub name: String,
    pub id: String,
    pub warnings: Vec<String>,
    pub status: ContainerStatus,
}

/// コンテナ操作のエントリポイント
///
/// Docker 接続は呼び出し側が構築して渡します（`init_docker` 参照）。
pub struct Containers {
    docker: Docker,
}

impl Containers {
    pub fn new(docker: Docker) -> Self {
        Self { docker }
    }

    /// コンテナを作成、または既存コンテナの状態を返す（冪等）
    ///
    /// 同名のコンテナが既に存在する場合は一切変更を加えず、inspect した
    /// 状態を分類して返します。存在しない場合はイメージを確認し（無ければ
    /// pull）、作成して Created を返します。
    pub async fn create_or_reconcile(&self, spec: &ContainerSpec) -> Result<CreateContainerResult> {
        if spec.name.is_empty() || spec.image.is_empty() {
            return Err(ContainerError::MissingIdentity);
        }

        if self.exists(&spec.name).await? {
            return self.reconcile_existing(&spec.name).await;
        }

        self.ensure_image(&spec.image).await?;

        tracing::info!("Creating container '{}' from image '{}'", spec.name, spec.image);
        let (config, options) = spec_to_container_config(spec);
        let response = self.docker.create_container(Some(options), config).await?;

        Ok(CreateContainerResult {
            name: spec.name.clone(),
            id: response.id,
            warnings: response.warnings,
            status: ContainerStatus::Created,
        })
    }

    /// 作成（または再調整）して起動し、コンテナ ID を返す
    pub async fn start(&self, spec: &ContainerSpec) -> Result<String> {
        let result = self.create_or_reconcile(spec).await?;

        match self
            .docker
            .start_container(&result.id, None::<StartContainerOptions<String>>)
            .await
        {
            Ok(()) => {}
            // 304 は既に起動済み。再調整パスでは成功として扱う
            Err(bollard::errors::Error::DockerResponseServerError {
                status_code: 304, ..
            }) => {}
            Err(e) => return Err(e.into()),
        }

        Ok(result.id)
    }

    /// コンテナが存在するかどうか（名前または ID）
    pub async fn exists(&self, name: &str) -> Result<bool> {
        match self
            .docker
            .inspect_container(name, None::<InspectContainerOptions>)
            .await
        {
            Ok(_) => Ok(true),
            Err(bollard::errors::Error::DockerResponseServerError {
                status_code: 404, ..
            }) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// inspect 結果をそのまま返す
    pub async fn inspect(&self, name_or_id: &str) -> Result<ContainerInspectResponse> {
        match self
            .docker
            .inspect_container(name_or_id, None::<InspectContainerOptions>)
            .await
        {
            Ok(inspection) => Ok(inspection),
            Err(bollard::errors::Error::DockerResponseServerError {
                status_code: 404, ..
            }) => Err(ContainerError::ContainerNotFound {
                container: name_or_id.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    /// 最新のヘルス状態を観測する
    ///
    /// 戻り値は（状態文字列, exit code）。ヘルスログが無ければ exit code は
    /// -1（データ無しの番兵値）、あれば最初の非 0 エントリ、すべて 0 なら 0。
    pub async fn check_health(&self, id: &str) -> Result<(String, i64)> {
        let inspection = self.inspect(id).await?;

        let state = inspection
            .state
            .ok_or_else(|| ContainerError::MissingState {
                container: id.to_string(),
            })?;
        let status = state
            .status
            .ok_or_else(|| ContainerError::MissingState {
                container: id.to_string(),
            })?
            .to_string();

        let Some(health) = state.health else {
            return Ok((status, NO_HEALTH_DATA));
        };

        for entry in health.log.unwrap_or_default() {
            let code = entry.exit_code.unwrap_or(0);
            if code != 0 {
                return Ok((status, code));
            }
        }

        Ok((status, 0))
    }

    /// コンテナを停止して削除する（ベストエフォート）
    ///
    /// 後片付けが呼び出し元の成否を覆すことはありません。失敗は warn ログのみ。
    pub async fn stop_and_remove(&self, id: &str) {
        if let Err(e) = self
            .docker
            .stop_container(id, Some(StopContainerOptions { t: 10 }))
            .await
        {
            tracing::warn!("stop container {}: {}", id, e);
        }
        if let Err(e) = self
            .docker
            .remove_container(
                id,
                Some(RemoveContainerOptions {
                    force: true,
                    ..Default::default()
                }),
            )
            .await
        {
            tracing::warn!("remove container {}: {}", id, e);
        }
    }

    /// イメージが存在するかどうか
    pub async fn image_exists(&self, image: &str) -> Result<bool> {
        match self.docker.inspect_image(image).await {
            Ok(_) => Ok(true),
            Err(bollard::errors::Error::DockerResponseServerError {
                status_code: 404, ..
            }) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// イメージを pull する
    pub async fn pull_image(&self, image: &str) -> Result<()> {
        let (name, tag) = parse_image_tag(image);
        let options = CreateImageOptions {
            from_image: name,
            tag,
            ..Default::default()
        };

        let mut stream = self.docker.create_image(Some(options), None, None);
        while let Some(info) = stream.next().await {
            match info {
                Ok(CreateImageInfo {
                    status: Some(status),
                    ..
                }) => {
                    tracing::debug!("pull {}: {}", image, status);
                }
                Ok(_) => {}
                Err(e) => {
                    return Err(ContainerError::ImagePullFailed {
                        image: image.to_string(),
                        message: e.to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    /// 既存コンテナを inspect し、状態を分類して返す
    async fn reconcile_existing(&self, name: &str) -> Result<CreateContainerResult> {
        let inspection = self.inspect(name).await?;
        let status = classify_inspection(&inspection);
        let id = inspection.id.unwrap_or_else(|| name.to_string());

        tracing::info!("Container '{}' already exists ({:?})", name, status);

        Ok(CreateContainerResult {
            name: name.to_string(),
            id,
            warnings: Vec::new(),
            status,
        })
    }

    async fn ensure_image(&self, image: &str) -> Result<()> {
        if !self.image_exists(image).await? {
            tracing::info!("Pulling image '{}'...", image);
            self.pull_image(image).await?;
        }
        Ok(())
    }
}

/// イメージ名とタグを分離
/// 例: "redis:7-alpine" -> ("redis", "7-alpine")
///     "postgres" -> ("postgres", "latest")
///     "localhost:5000/app" -> ("localhost:5000/app", "latest")
pub fn parse_image_tag(image: &str) -> (&str, &str) {
    match image.rsplit_once(':') {
        // ':' がレジストリのポート部なら全体をイメージ名として扱う
        Some((name, tag)) if !tag.contains('/') => (name, tag),
        _ => (image, "latest"),
    }
}
