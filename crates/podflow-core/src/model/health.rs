//! ヘルスチェック設定
//!
//! コマンド文字列と時間文字列から検証済みのヘルスチェック設定を組み立てます。
//! いずれか一つでも不正なフィールドがあれば設定全体を拒否します（部分適用なし）。

use crate::error::{Result, SpecError};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// ヘルスチェックコマンドの先頭トークン
pub const CMD_SHELL: &str = "CMD-SHELL";

/// interval を無効化する指定値（ゼロ時間として扱う）
pub const INTERVAL_DISABLE: &str = "disable";

/// 検証済みヘルスチェック設定
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthCheckConfig {
    /// 実行コマンド（先頭は必ず CMD-SHELL）
    pub test: Vec<String>,
    /// 実行間隔。ゼロは無効化を意味する
    pub interval: Duration,
    /// 失敗許容回数（1 以上）
    pub retries: u32,
    /// タイムアウト（1 秒以上）
    pub timeout: Duration,
    /// 起動猶予期間
    pub start_period: Duration,
}

impl HealthCheckConfig {
    /// コマンド文字列と時間文字列を検証してヘルスチェック設定を構築
    ///
    /// * `cmd` - `"CMD-SHELL /app/healthcheck.sh"` 形式のコマンド
    /// * `interval` - 実行間隔。`"disable"` でゼロ時間（無効化）
    /// * `retries` - 失敗許容回数（1 以上）
    /// * `timeout` - タイムアウト（1 秒以上）
    /// * `start_period` - 起動猶予期間
    pub fn compile(
        cmd: &str,
        interval: &str,
        retries: u32,
        timeout: &str,
        start_period: &str,
    ) -> Result<Self> {
        // コマンドを空白で分割し、CMD-SHELL で始まることを確認
        let test: Vec<String> = cmd.split_whitespace().map(String::from).collect();
        if test.len() < 2 || test[0] != CMD_SHELL {
            return Err(SpecError::InvalidCommandFormat);
        }

        let interval = if interval == INTERVAL_DISABLE {
            Duration::ZERO
        } else {
            humantime::parse_duration(interval).map_err(|_| SpecError::InvalidInterval {
                value: interval.to_string(),
            })?
        };

        if retries < 1 {
            return Err(SpecError::InvalidRetries { retries });
        }

        let timeout_dur =
            humantime::parse_duration(timeout).map_err(|_| SpecError::InvalidTimeout {
                value: timeout.to_string(),
            })?;
        if timeout_dur < Duration::from_secs(1) {
            return Err(SpecError::InvalidTimeout {
                value: timeout.to_string(),
            });
        }

        let start_period =
            humantime::parse_duration(start_period).map_err(|_| SpecError::InvalidStartPeriod {
                value: start_period.to_string(),
            })?;

        Ok(Self {
            test,
            interval,
            retries,
            timeout: timeout_dur,
            start_period,
        })
    }
}
