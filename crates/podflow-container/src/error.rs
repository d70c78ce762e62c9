use thiserror::Error;

#[derive(Error, Debug)]
pub enum ContainerError {
    #[error(
        "Dockerに接続できません: {0}\n\nヒント:\n  • Dockerが起動しているか確認してください\n  • OrbStackまたはDocker Desktopがインストールされているか確認してください"
    )]
    DockerConnectionFailed(String),

    #[error("コンテナ名またはイメージ名が設定されていません")]
    MissingIdentity,

    #[error("コンテナ '{container}' が見つかりません")]
    ContainerNotFound { container: String },

    #[error("コンテナ '{container}' の inspect 結果に状態が含まれていません")]
    MissingState { container: String },

    #[error("イメージ '{image}' の取得に失敗しました: {message}")]
    ImagePullFailed { image: String, message: String },

    #[error("仕様エラー: {0}")]
    Spec(#[from] podflow_core::SpecError),

    #[error("Docker APIエラー: {0}")]
    DockerApiError(String),
}

impl From<bollard::errors::Error> for ContainerError {
    fn from(err: bollard::errors::Error) -> Self {
        match &err {
            // 404/409 は呼び出し側で適切に処理されるべき
            bollard::errors::Error::DockerResponseServerError {
                status_code: 404 | 409,
                ..
            } => ContainerError::DockerApiError(err.to_string()),
            _ => {
                let err_str = err.to_string();
                if err_str.contains("Connection refused")
                    || err_str.contains("No such file or directory")
                {
                    ContainerError::DockerConnectionFailed(err_str)
                } else {
                    ContainerError::DockerApiError(err_str)
                }
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, ContainerError>;
