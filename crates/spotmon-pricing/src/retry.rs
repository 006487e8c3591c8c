//! Bounded retry helper
//!
//! An explicit attempt-count/delay loop so retry policy reads as data
//! rather than control flow buried in callers.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

/// Run `op` up to `attempts` times with `delay` between failed attempts.
///
/// Returns the first success, or the last error once the bound is
/// exhausted. `attempts` is clamped to at least one.
pub async fn with_retries<T, E, F, Fut>(attempts: usize, delay: Duration, mut op: F) -> Result<T, E>
where
    E: std::fmt::Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let attempts = attempts.max(1);

    for attempt in 1..attempts {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                warn!(attempt, attempts, error = %e, "Attempt failed");
                tokio::time::sleep(delay).await;
            }
        }
    }

    // The final attempt's error is the one the caller sees.
    op().await
}
