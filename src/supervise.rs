//! Bounded-time execution of user callbacks
//!
//! A callback runs in its own task so a panic surfaces as a join error instead
//! of unwinding into the caller, and the task is aborted once its budget is
//! spent.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::Result;

/// How a supervised callback ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Supervised<T> {
    /// Returned a value in time
    Completed(T),
    /// Returned an error or panicked
    Failed(String),
    /// Ran past its budget and was aborted
    TimedOut,
}

/// Run the future built by `start` with at most `budget` of wall time
///
/// `start` itself runs inside the supervised task, so a callback that panics
/// before returning its future is contained too. On timeout the task is
/// aborted and `cancellation` (when given) is cancelled, so cooperative
/// callbacks can stop work they spawned elsewhere.
pub async fn supervise<T, S, F>(
    budget: Duration,
    cancellation: Option<&CancellationToken>,
    start: S,
) -> Supervised<T>
where
    S: FnOnce() -> F + Send + 'static,
    F: Future<Output = Result<T>> + Send + 'static,
    T: Send + 'static,
{
    let mut task = tokio::spawn(async move { start().await });
    match tokio::time::timeout(budget, &mut task).await {
        Ok(Ok(Ok(value))) => Supervised::Completed(value),
        Ok(Ok(Err(e))) => Supervised::Failed(e.to_string()),
        Ok(Err(join)) if join.is_panic() => Supervised::Failed("callback panicked".to_string()),
        Ok(Err(join)) => Supervised::Failed(format!("callback task ended: {join}")),
        Err(_) => {
            task.abort();
            if let Some(token) = cancellation {
                token.cancel();
            }
            Supervised::TimedOut
        }
    }
}
