//! pod 操作
//!
//! Docker には pod の概念が無いため、pod は infra コンテナ（sleep で常駐）
//! として実体化します。メンバーコンテナは仕様の pod 所属
//! （`with_pod`）を通じて infra コンテナのネットワーク／IPC 名前空間へ
//! 参加します。podman が内部で行っている構成と同じ仕組みです。

use crate::error::{ContainerError, Result};
use crate::lifecycle::Containers;
use bollard::Docker;
use bollard::container::{RemoveContainerOptions, StopContainerOptions};
use podflow_core::{ContainerSpec, SpecOption, with_command, with_image, with_label, with_name};
use std::collections::HashMap;

/// infra コンテナのデフォルトイメージ
pub const DEFAULT_INFRA_IMAGE: &str = "docker.io/library/alpine:latest";

/// pod の仕様を 1 項目ずつ変更する設定関数
pub type PodOption = Box<dyn FnOnce(&mut PodSpec) -> Result<()> + Send>;

/// pod の仕様
#[derive(Debug, Clone)]
pub struct PodSpec {
    pub name: String,
    pub labels: HashMap<String, String>,
    pub infra_image: String,
}

impl Default for PodSpec {
    fn default() -> Self {
        Self {
            name: String::new(),
            labels: HashMap::new(),
            infra_image: DEFAULT_INFRA_IMAGE.to_string(),
        }
    }
}

/// pod 名を設定
pub fn with_pod_name(name: impl Into<String>) -> PodOption {
    let name = name.into();
    Box::new(move |spec| {
        spec.name = name;
        Ok(())
    })
}

/// pod のラベルを設定
pub fn with_pod_labels(labels: HashMap<String, String>) -> PodOption {
    Box::new(move |spec| {
        spec.labels.extend(labels);
        Ok(())
    })
}

/// infra コンテナのイメージを設定
pub fn with_infra_image(image: impl Into<String>) -> PodOption {
    let image = image.into();
    Box::new(move |spec| {
        spec.infra_image = image;
        Ok(())
    })
}

/// 作成済みの pod
#[derive(Debug, Clone)]
pub struct Pod {
    pub name: String,
    pub infra_id: String,
}

impl Pod {
    /// pod を作成する
    ///
    /// infra コンテナは pod 名をそのまま名乗ります。既に同名の infra
    /// コンテナが存在すれば再利用されます（冪等）。
    pub async fn create<I>(docker: &Docker, options: I) -> Result<Pod>
    where
        I: IntoIterator<Item = PodOption>,
    {
        let mut spec = PodSpec::default();
        for option in options {
            option(&mut spec)?;
        }
        if spec.name.is_empty() {
            return Err(ContainerError::MissingIdentity);
        }

        let mut spec_options: Vec<SpecOption> = vec![
            with_image(spec.infra_image),
            with_name(spec.name.clone()),
            with_command(["sleep", "infinity"]),
            with_label("podflow.pod", spec.name.clone()),
            with_label("podflow.infra", "true"),
        ];
        for (key, value) in spec.labels {
            spec_options.push(with_label(key, value));
        }
        let container_spec = ContainerSpec::build(spec_options)?;

        let containers = Containers::new(docker.clone());
        let infra_id = containers.start(&container_spec).await?;

        tracing::info!("Created pod '{}' (infra {})", spec.name, infra_id);

        Ok(Pod {
            name: spec.name,
            infra_id,
        })
    }

    /// pod を削除する
    ///
    /// infra コンテナを停止（10 秒でタイムアウト）してから削除します。
    /// 停止の失敗は warn ログに留め、削除の失敗はエラーとして返します。
    pub async fn remove(&self, docker: &Docker, force: bool) -> Result<()> {
        if let Err(e) = docker
            .stop_container(&self.infra_id, Some(StopContainerOptions { t: 10 }))
            .await
        {
            tracing::warn!("stop pod infra {}: {}", self.infra_id, e);
        }

        docker
            .remove_container(
                &self.infra_id,
                Some(RemoveContainerOptions {
                    force,
                    ..Default::default()
                }),
            )
            .await?;

        Ok(())
    }
}
