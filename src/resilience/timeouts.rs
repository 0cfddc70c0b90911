//! Timeout enforcement.
//!
//! # Responsibilities
//! - Wrap ledger calls with a deadline
//! - Convert expiry into a distinct error
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - Timeout errors are distinct from other errors

use std::future::Future;
use std::time::Duration;

use crate::blockchain::types::{LedgerError, LedgerResult};

/// Run a ledger future with a deadline.
///
/// Inner errors are converted to `LedgerError::Rpc` with their message intact.
pub async fn with_deadline<T, E, F>(deadline: Duration, op: &'static str, fut: F) -> LedgerResult<T>
where
    F: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    match tokio::time::timeout(deadline, fut).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => {
            tracing::warn!(op, error = %e, "RPC error");
            Err(LedgerError::Rpc(e.to_string()))
        }
        Err(_) => {
            tracing::warn!(op, timeout_secs = deadline.as_secs(), "RPC timeout");
            Err(LedgerError::Timeout(deadline.as_secs()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_passes_value_through() {
        let result = with_deadline(Duration::from_secs(1), "ok", async { Ok::<_, String>(7) }).await;
        assert_eq!(result.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_keeps_error_message() {
        let result: LedgerResult<()> =
            with_deadline(Duration::from_secs(1), "err", async { Err("blockhash not found") }).await;
        assert_eq!(result.unwrap_err().to_string(), "blockhash not found");
    }

    #[tokio::test(start_paused = true)]
    async fn test_expiry_is_timeout() {
        let result: LedgerResult<()> = with_deadline(Duration::from_secs(5), "slow", async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok::<_, String>(())
        })
        .await;
        assert!(matches!(result, Err(LedgerError::Timeout(5))));
    }
}
