use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("ホストディレクトリ '{path}' を参照できません")]
    HostDirUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("ホストディレクトリ '{path}' はディレクトリではありません")]
    HostDirNotDirectory { path: PathBuf },

    #[error("ボリューム '{name}' の削除に失敗しました: {source}")]
    VolumeRemove {
        name: String,
        #[source]
        source: bollard::errors::Error,
    },

    #[error("ファイル '{file}' がアーカイブに含まれていません")]
    FileNotFoundInArchive { file: String },

    #[error("overlay のマウントに失敗しました ({merged}): {source}")]
    MountFailed {
        merged: PathBuf,
        #[source]
        source: nix::errno::Errno,
    },

    #[error("fuse-overlayfs によるフォールバックマウントに失敗しました ({merged}): {source}")]
    FallbackMountFailed {
        merged: PathBuf,
        #[source]
        source: nix::errno::Errno,
    },

    #[error("仕様エラー: {0}")]
    Spec(#[from] podflow_core::SpecError),

    #[error("コンテナ操作エラー: {0}")]
    Container(#[from] podflow_container::ContainerError),

    #[error("Docker APIエラー: {0}")]
    Engine(#[from] bollard::errors::Error),

    #[error("IO エラー: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SyncError>;
