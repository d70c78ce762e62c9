//! コンテナのライフサイクル状態
//!
//! 状態はエンジンの inspect 結果から毎回導出される純粋な値で、
//! 呼び出しをまたいでキャッシュされることはありません。

use serde::{Deserialize, Serialize};

/// コンテナの状態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContainerStatus {
    /// 作成済み・未起動
    Created,
    /// 実行中
    Running,
    /// 終了コード 0 で終了
    Exited,
    /// 終了コード非 0 で終了（シグナルによる強制終了を含む）
    ExitedWithError,
    /// ヘルスチェック成功
    Healthy,
    /// ヘルスチェック失敗
    Unhealthy,
    /// エンジンが dead と報告した状態
    Dead,
    /// 一時停止中
    Paused,
    /// inspect 結果に状態が含まれない場合
    Unknown,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serialization_roundtrip() {
        let json = serde_json::to_string(&ContainerStatus::ExitedWithError).unwrap();
        let back: ContainerStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ContainerStatus::ExitedWithError);
    }
}
