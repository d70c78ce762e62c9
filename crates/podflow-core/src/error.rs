use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SpecError {
    #[error("ホストパス '{path}' が存在しません")]
    HostPathNotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("ホストパス '{path}' はディレクトリではありません")]
    HostPathNotDirectory { path: PathBuf },

    #[error("マウント先 '{dest}' は既に '{existing}' に割り当てられています")]
    DestinationConflict { dest: String, existing: String },

    #[error("匿名ボリュームは使用できません: マウント先 '{dest}' にボリューム名を指定してください")]
    AnonymousVolume { dest: String },

    #[error("ヘルスチェックコマンドの形式が不正です: 先頭は CMD-SHELL である必要があります")]
    InvalidCommandFormat,

    #[error("ヘルスチェックの interval '{value}' を解析できません")]
    InvalidInterval { value: String },

    #[error("ヘルスチェックの retries は 1 以上である必要があります（指定値: {retries}）")]
    InvalidRetries { retries: u32 },

    #[error("ヘルスチェックの timeout '{value}' が不正です: 1 秒以上を指定してください")]
    InvalidTimeout { value: String },

    #[error("ヘルスチェックの start period '{value}' を解析できません")]
    InvalidStartPeriod { value: String },
}

pub type Result<T> = std::result::Result<T, SpecError>;
