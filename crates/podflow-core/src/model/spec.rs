//! コンテナ仕様とその組み立て
//!
//! 仕様は設定関数（オプション）の列から組み立てます。オプションは
//! 引数順に厳密に適用され、最初のエラーで残りを中断します（fail-fast）。
//! エラー時に部分的な仕様が呼び出し側へ漏れることはありません。

use crate::error::{Result, SpecError};
use crate::model::{HealthCheckConfig, ResourceLimits};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// 仕様を 1 項目ずつ変更・検証する設定関数
pub type SpecOption = Box<dyn FnOnce(&mut ContainerSpec) -> Result<()> + Send>;

/// ホストディレクトリの bind マウント
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindMount {
    pub source: PathBuf,
    pub destination: String,
    pub read_only: bool,
}

/// 名前付きボリュームのマウント
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedVolume {
    pub name: String,
    pub destination: String,
    pub options: Vec<String>,
}

/// コンテナ仕様
///
/// 組み立て後は不変として扱い、作成処理に渡したら再利用しません。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContainerSpec {
    pub name: String,
    pub image: String,
    pub terminal: bool,
    pub command: Vec<String>,
    pub workdir: Option<String>,
    pub env: HashMap<String, String>,
    pub labels: HashMap<String, String>,
    pub health_check: Option<HealthCheckConfig>,
    pub resource_limits: Option<ResourceLimits>,
    pub bind_mounts: Vec<BindMount>,
    pub named_volumes: Vec<NamedVolume>,
    /// 所属する pod（infra コンテナ名）。未指定なら単独コンテナ
    pub pod: Option<String>,
}

impl ContainerSpec {
    /// オプション列から仕様を組み立てる
    ///
    /// オプションは引数順に適用され、最初のエラーで中断します。
    pub fn build<I>(options: I) -> Result<Self>
    where
        I: IntoIterator<Item = SpecOption>,
    {
        let mut spec = Self::default();
        for option in options {
            option(&mut spec)?;
        }
        Ok(spec)
    }

    /// 指定のマウント先を既に使っているマウントの名前を返す
    fn destination_occupant(&self, dest: &str) -> Option<String> {
        if let Some(m) = self.bind_mounts.iter().find(|m| m.destination == dest) {
            return Some(m.source.display().to_string());
        }
        self.named_volumes
            .iter()
            .find(|v| v.destination == dest)
            .map(|v| v.name.clone())
    }
}

/// イメージ参照を設定
pub fn with_image(image: impl Into<String>) -> SpecOption {
    let image = image.into();
    Box::new(move |spec| {
        spec.image = image;
        Ok(())
    })
}

/// コンテナ名を設定
pub fn with_name(name: impl Into<String>) -> SpecOption {
    let name = name.into();
    Box::new(move |spec| {
        spec.name = name;
        Ok(())
    })
}

/// 擬似端末の割り当てを設定
pub fn with_terminal(terminal: bool) -> SpecOption {
    Box::new(move |spec| {
        spec.terminal = terminal;
        Ok(())
    })
}

/// 実行コマンドを設定
pub fn with_command<I, S>(command: I) -> SpecOption
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let command: Vec<String> = command.into_iter().map(Into::into).collect();
    Box::new(move |spec| {
        spec.command = command;
        Ok(())
    })
}

/// 作業ディレクトリを設定
pub fn with_workdir(workdir: impl Into<String>) -> SpecOption {
    let workdir = workdir.into();
    Box::new(move |spec| {
        spec.workdir = Some(workdir);
        Ok(())
    })
}

/// 環境変数を 1 件設定。同じキーは後勝ちで上書き
pub fn with_env(key: impl Into<String>, value: impl Into<String>) -> SpecOption {
    let (key, value) = (key.into(), value.into());
    Box::new(move |spec| {
        spec.env.insert(key, value);
        Ok(())
    })
}

/// ラベルを 1 件設定
pub fn with_label(key: impl Into<String>, value: impl Into<String>) -> SpecOption {
    let (key, value) = (key.into(), value.into());
    Box::new(move |spec| {
        spec.labels.insert(key, value);
        Ok(())
    })
}

/// bind マウントを 1 件追加
///
/// ホスト側パスが存在するディレクトリであることを検証します。
/// マウント先の重複は拒否します。読み取り専用でマウントされます。
pub fn with_bind_mount(source: impl Into<PathBuf>, destination: impl Into<String>) -> SpecOption {
    let (source, destination) = (source.into(), destination.into());
    Box::new(move |spec| {
        let meta = std::fs::metadata(&source).map_err(|e| SpecError::HostPathNotFound {
            path: source.clone(),
            source: e,
        })?;
        if !meta.is_dir() {
            return Err(SpecError::HostPathNotDirectory { path: source });
        }
        if let Some(existing) = spec.destination_occupant(&destination) {
            return Err(SpecError::DestinationConflict {
                dest: destination,
                existing,
            });
        }
        spec.bind_mounts.push(BindMount {
            source,
            destination,
            read_only: true,
        });
        Ok(())
    })
}

/// 名前付きボリュームのマウントを 1 件追加
///
/// 空のボリューム名は匿名ボリュームとして拒否します。同じ名前が既に
/// 同じマウント先へ割り当て済みなら no-op、別の名前なら衝突エラーです。
pub fn with_named_volume(name: impl Into<String>, destination: impl Into<String>) -> SpecOption {
    let (name, destination) = (name.into(), destination.into());
    Box::new(move |spec| {
        let cleaned = name.trim().to_string();
        if cleaned.is_empty() {
            return Err(SpecError::AnonymousVolume { dest: destination });
        }
        if let Some(existing) = spec.destination_occupant(&destination) {
            if existing == cleaned
                && spec
                    .named_volumes
                    .iter()
                    .any(|v| v.destination == destination && v.name == cleaned)
            {
                return Ok(());
            }
            return Err(SpecError::DestinationConflict {
                dest: destination,
                existing,
            });
        }
        spec.named_volumes.push(NamedVolume {
            name: cleaned,
            destination,
            options: Vec::new(),
        });
        Ok(())
    })
}

/// CPU 制限（quota / period / shares）を設定
pub fn with_cpu_limits(quota: i64, period: u64, shares: u64) -> SpecOption {
    Box::new(move |spec| {
        let limits = spec.resource_limits.get_or_insert_with(Default::default);
        limits.cpu_quota = Some(quota);
        limits.cpu_period = Some(period);
        limits.cpu_shares = Some(shares);
        Ok(())
    })
}

/// メモリ上限（バイト）を設定
pub fn with_memory_limit(bytes: i64) -> SpecOption {
    Box::new(move |spec| {
        let limits = spec.resource_limits.get_or_insert_with(Default::default);
        limits.memory_limit = Some(bytes);
        Ok(())
    })
}

/// OOM スコア調整値を設定
pub fn with_oom_score_adj(score: i32) -> SpecOption {
    Box::new(move |spec| {
        let limits = spec.resource_limits.get_or_insert_with(Default::default);
        limits.oom_score_adj = Some(score);
        Ok(())
    })
}

/// ヘルスチェックをコンパイルして添付
///
/// 検証はオプション構築時に行われるため、不正な引数は仕様の組み立て
/// パイプラインが走る前に確定し、build 時に即座にエラーとなります。
pub fn with_health_check(
    cmd: &str,
    interval: &str,
    retries: u32,
    timeout: &str,
    start_period: &str,
) -> SpecOption {
    let compiled = HealthCheckConfig::compile(cmd, interval, retries, timeout, start_period);
    Box::new(move |spec| {
        spec.health_check = Some(compiled?);
        Ok(())
    })
}

/// pod への所属を設定
pub fn with_pod(pod: impl Into<String>) -> SpecOption {
    let pod = pod.into();
    Box::new(move |spec| {
        spec.pod = Some(pod);
        Ok(())
    })
}
