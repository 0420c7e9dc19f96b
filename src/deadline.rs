//! Per-operation deadlines

use std::future::Future;
use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("operation timed out after {0:?}")]
pub struct DeadlineExceeded(pub Duration);

/// Run `operation` under `budget`. The future is dropped (cancelled) when the
/// budget runs out.
pub async fn with_deadline<F, T, E>(budget: Duration, operation: F) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
    E: From<DeadlineExceeded>,
{
    match tokio::time::timeout(budget, operation).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(budget_ms = budget.as_millis() as u64, "Deadline exceeded");
            Err(E::from(DeadlineExceeded(budget)))
        }
    }
}
