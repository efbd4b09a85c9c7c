//! Retry with exponential backoff for transient failures.
//!
//! Used by the model invoker and the evidence client. The caller decides
//! what counts as transient; everything else fails on the first attempt.
//!
//! **Backoff:** `initial_backoff_ms`, doubled after every failed attempt,
//! capped at `max_backoff_ms`.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

fn default_max_attempts()       -> u32 { 3 }
fn default_initial_backoff_ms() -> u64 { 1_000 }
fn default_max_backoff_ms()     -> u64 { 10_000 }

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

impl RetryPolicy {
    /// Policy with no sleeping between attempts. Tests only need the count.
    pub fn immediate(max_attempts: u32) -> Self {
        Self { max_attempts, initial_backoff_ms: 0, max_backoff_ms: 0 }
    }

    /// Delay before attempt `attempt + 1`, given `attempt` failures so far (1-based).
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(16);
        let ms = self.initial_backoff_ms.saturating_mul(1u64 << shift);
        Duration::from_millis(ms.min(self.max_backoff_ms))
    }
}

/// Final failure of a retried operation.
#[derive(Debug)]
pub struct RetryFailure<E> {
    pub error: E,
    pub attempts: u32,
    /// True when the last error was transient and the attempt budget ran out.
    pub transient: bool,
}

/// Run `operation` until it succeeds, fails non-transiently, or the attempt
/// budget is spent. Returns the value together with the attempts used.
pub async fn retry_transient<F, Fut, T, E>(
    operation_name: &str,
    policy: &RetryPolicy,
    is_transient: impl Fn(&E) -> bool,
    mut operation: F,
) -> Result<(T, u32), RetryFailure<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;

        match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    tracing::debug!(operation = operation_name, attempt, "Succeeded after retry");
                }
                return Ok((value, attempt));
            }
            Err(err) => {
                let transient = is_transient(&err);

                if !transient {
                    tracing::warn!(
                        operation = operation_name,
                        attempt,
                        error = %err,
                        "Non-transient failure, not retrying"
                    );
                    return Err(RetryFailure { error: err, attempts: attempt, transient: false });
                }

                if attempt >= max_attempts {
                    tracing::error!(
                        operation = operation_name,
                        attempt,
                        error = %err,
                        "Transient failure, retry budget exhausted"
                    );
                    return Err(RetryFailure { error: err, attempts: attempt, transient: true });
                }

                let backoff = policy.backoff_for(attempt);
                tracing::warn!(
                    operation = operation_name,
                    attempt,
                    backoff_ms = backoff.as_millis() as u64,
                    error = %err,
                    "Transient failure, will retry after backoff"
                );
                if !backoff.is_zero() {
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }
}
