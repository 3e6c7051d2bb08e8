use std::fmt::Display;
use std::time::Duration;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::metrics::{fetch_retry_total, METRICS};

/// Linear backoff: wait `base_delay * n` after the n-th failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 3, base_delay_ms: 1000 }
    }
}

impl RetryPolicy {
    pub fn delay_for(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.base_delay_ms.saturating_mul(attempt as u64))
    }
}

/// Runs `op(attempt)` (1-based) until it succeeds or the policy is exhausted,
/// returning the last error. `sleep` is injected so callers and tests control time.
pub fn retry_with<T, E, S, F>(policy: &RetryPolicy, mut sleep: S, mut op: F) -> Result<T, E>
where
    E: Display,
    S: FnMut(Duration),
    F: FnMut(u32) -> Result<T, E>,
{
    let max = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match op(attempt) {
            Ok(v) => return Ok(v),
            Err(e) if attempt < max => {
                let delay = policy.delay_for(attempt);
                warn!(
                    "attempt {}/{} failed: {}; retrying in {:?}",
                    attempt, max, e, delay
                );
                fetch_retry_total(&METRICS).inc();
                sleep(delay);
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// `retry_with` using a real thread sleep.
pub fn retry<T, E, F>(policy: &RetryPolicy, op: F) -> Result<T, E>
where
    E: Display,
    F: FnMut(u32) -> Result<T, E>,
{
    retry_with(policy, std::thread::sleep, op)
}
