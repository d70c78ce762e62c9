//! リソース制限
//!
//! CPU・メモリ・OOM スコアの各グループは独立してオプショナル。
//! 未指定のグループはエンジンのデフォルトを継承します。

use serde::{Deserialize, Serialize};

/// コンテナのリソース制限
///
/// cpu_quota / cpu_period の組で CPU 使用量を制御します。
/// 例: quota=50000, period=100000 で 0.5 コア、quota=200000 で 2 コア相当。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceLimits {
    /// 1 周期あたりに使用できる CPU 時間（マイクロ秒）
    pub cpu_quota: Option<i64>,
    /// CPU 制限の周期（マイクロ秒）
    pub cpu_period: Option<u64>,
    /// 相対的な CPU 重み
    pub cpu_shares: Option<u64>,
    /// メモリ上限（バイト）
    pub memory_limit: Option<i64>,
    /// OOM キラーの優先度調整。負の値ほど保護される
    pub oom_score_adj: Option<i32>,
}

impl ResourceLimits {
    /// すべてのグループが未指定かどうか
    pub fn is_empty(&self) -> bool {
        self.cpu_quota.is_none()
            && self.cpu_period.is_none()
            && self.cpu_shares.is_none()
            && self.memory_limit.is_none()
            && self.oom_score_adj.is_none()
    }
}
