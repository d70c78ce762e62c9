//! リトライとバックオフ
//!
//! 存在確認や削除のような一時的に失敗しうるエンジン呼び出しを、
//! 上限付きの指数バックオフで再試行します。リトライは逐次実行で、
//! sleep 中に呼び出し元の future が drop されればそのまま中断されます。

use std::time::Duration;
use tokio::time::sleep;

/// バックオフ遅延の上限
pub const MAX_RETRY_DELAY: Duration = Duration::from_secs(2);

/// 処理を最大 attempts 回まで試行する
///
/// 失敗のたびに base_delay から始まる遅延を挟み、遅延は倍々で増えて
/// 2 秒で頭打ちになります。最後の試行の失敗をそのまま返します。
pub async fn with_retry<T, E, F, Fut>(
    attempts: u32,
    base_delay: Duration,
    mut operation: F,
) -> std::result::Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, E>>,
{
    let attempts = attempts.max(1);
    let mut delay = base_delay;
    let mut last_err = None;

    for attempt in 0..attempts {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) => last_err = Some(e),
        }
        if attempt + 1 < attempts {
            sleep(delay).await;
            if delay < MAX_RETRY_DELAY {
                delay *= 2;
            }
        }
    }

    Err(last_err.expect("attempts >= 1"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_succeeds_after_two_failures() {
        let calls = AtomicU32::new(0);

        let result: std::result::Result<u32, &str> =
            with_retry(3, Duration::from_millis(1), || {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                async move { if n < 3 { Err("transient") } else { Ok(n) } }
            })
            .await;

        assert_eq!(result.unwrap(), 3);
        // ちょうど 3 回呼ばれている
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_returns_last_error_when_exhausted() {
        let calls = AtomicU32::new(0);

        let result: std::result::Result<(), u32> = with_retry(3, Duration::from_millis(1), || {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move { Err(n) }
        })
        .await;

        assert_eq!(result.unwrap_err(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_zero_attempts_still_runs_once() {
        let calls = AtomicU32::new(0);

        let result: std::result::Result<u32, &str> =
            with_retry(0, Duration::from_millis(1), || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok(1) }
            })
            .await;

        assert_eq!(result.unwrap(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_first_success_short_circuits() {
        let calls = AtomicU32::new(0);

        let _: std::result::Result<(), &str> = with_retry(5, Duration::from_millis(1), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok(()) }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
