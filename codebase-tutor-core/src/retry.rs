//! Retry loop shared by the LLM stages.
//!
//! A stage attempt covers both the LLM call and the validation of its reply,
//! so a malformed answer is retried just like a network failure. The attempt
//! number is handed to the closure; stages use it to bypass the response
//! cache after the first attempt, otherwise a cached bad answer would be
//! served forever.

use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::{error, warn};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
pub const DEFAULT_WAIT_SECS: u64 = 20;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first. Zero is treated as one.
    pub max_attempts: u32,
    /// Pause between attempts, in seconds.
    pub wait_secs: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            wait_secs: DEFAULT_WAIT_SECS,
        }
    }
}

impl RetryPolicy {
    /// A policy that tries once and never waits.
    pub fn once() -> Self {
        Self {
            max_attempts: 1,
            wait_secs: 0,
        }
    }

    pub fn wait(&self) -> Duration {
        Duration::from_secs(self.wait_secs)
    }

    fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

/// Run `attempt` until it succeeds or the policy is exhausted.
///
/// The closure receives the zero-based attempt number. The error of the last
/// attempt is returned.
pub async fn run_with_retries<T, E, F, Fut>(
    policy: &RetryPolicy,
    stage: &str,
    mut attempt: F,
) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let attempts = policy.attempts();
    let mut current = 0;
    loop {
        match attempt(current).await {
            Ok(value) => return Ok(value),
            Err(e) if current + 1 < attempts => {
                warn!(
                    stage,
                    attempt = current + 1,
                    max_attempts = attempts,
                    error = %e,
                    "Stage attempt failed, retrying"
                );
                if policy.wait_secs > 0 {
                    tokio::time::sleep(policy.wait()).await;
                }
                current += 1;
            }
            Err(e) => {
                error!(stage, attempts, error = %e, "Stage failed after all attempts");
                return Err(e);
            }
        }
    }
}
