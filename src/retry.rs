//! Retry helper for the idempotent ledger reads (`resolve_tx`, `read_balance`): up to
//! three attempts with exponential backoff, per the concurrency model's timeout policy.
//! `submit_transfer` is never retried here — a timed-out submission must surface
//! `LedgerTimeout` untouched rather than risk a duplicate transfer.

use std::future::Future;
use std::time::Duration;

use crate::ledger::LedgerError;

const MAX_ATTEMPTS: u32 = 3;
const INITIAL_BACKOFF: Duration = Duration::from_millis(200);

pub async fn with_retry<T, F, Fut>(mut call: F) -> Result<T, LedgerError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, LedgerError>>,
{
    let mut backoff = INITIAL_BACKOFF;
    let mut last_err = None;
    for attempt in 0..MAX_ATTEMPTS {
        match call().await {
            Ok(value) => return Ok(value),
            Err(err @ LedgerError::Network(_)) | Err(err @ LedgerError::Timeout(_)) => {
                last_err = Some(err);
                if attempt + 1 < MAX_ATTEMPTS {
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                }
            }
            Err(other) => return Err(other),
        }
    }
    Err(last_err.expect("loop always runs at least once and only exits via return or storing an error"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn retries_transient_network_errors_then_succeeds() {
        let attempts = AtomicU32::new(0);
        let result = with_retry(|| {
            let n = attempts.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(LedgerError::Network("flaky".to_string()))
                } else {
                    Ok(42)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn does_not_retry_non_transient_errors() {
        let attempts = AtomicU32::new(0);
        let result: Result<(), _> = with_retry(|| {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err(LedgerError::Rejected("no".to_string())) }
        })
        .await;
        assert!(matches!(result, Err(LedgerError::Rejected(_))));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn exhausts_attempts_and_surfaces_the_last_error() {
        let result: Result<(), _> = with_retry(|| async { Err(LedgerError::Timeout("slow".to_string())) }).await;
        assert!(matches!(result, Err(LedgerError::Timeout(_))));
    }
}
