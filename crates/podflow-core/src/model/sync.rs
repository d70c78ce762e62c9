//! ボリューム同期のジョブ定義
//!
//! ジョブは 1 回の同期呼び出しの間だけ存在し、永続化されません。

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// ホストディレクトリをボリュームへ書き込む際の整合性ポリシー
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncMode {
    /// 既存ボリュームがあれば何もせずリターン
    Skip,
    /// 既存ボリュームを維持したまま、同一パスのファイルだけ上書き
    Update,
    /// 既存ボリュームを削除して作り直してから書き込む
    Overwrite,
}

/// 1 回の同期呼び出しの入力
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncJob {
    /// 書き込み先の名前付きボリューム
    pub volume: String,
    /// ヘルパーコンテナ内でボリュームをマウントするパス
    pub mount_path: String,
    /// コピー元のホストディレクトリ
    pub host_dir: PathBuf,
    /// 整合性ポリシー
    pub mode: SyncMode,
}

/// ボリューム削除時の振る舞い（ポリシーオブジェクト）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveBehavior {
    /// 最初から強制削除する
    pub force: bool,
    /// 通常削除が失敗したら強制削除で再試行する
    pub retry_force: bool,
    /// not found エラーを成功として扱う
    pub ignore_not_found: bool,
    /// 試行回数（1 以上）
    pub attempts: u32,
}

impl Default for RemoveBehavior {
    fn default() -> Self {
        Self {
            force: false,
            retry_force: false,
            ignore_not_found: false,
            attempts: 1,
        }
    }
}

impl RemoveBehavior {
    /// Overwrite モードのボリューム削除に使う振る舞い
    pub fn for_overwrite() -> Self {
        Self {
            force: false,
            retry_force: true,
            ignore_not_found: true,
            attempts: 3,
        }
    }
}
