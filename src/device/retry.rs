//! Retry policy
//!
//! The engine never retries on its own. The facade may, but only for
//! commands that are safe to repeat: anything that moves hardware is
//! attempted exactly once.

use std::thread;
use std::time::Duration;

use crate::error::Result;
use crate::protocol::Category;

/// How many times the facade tries a repeatable command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub attempts: u32,
    /// Pause between attempts
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::none()
    }
}

impl RetryPolicy {
    /// Single attempt
    pub fn none() -> Self {
        Self {
            attempts: 1,
            backoff: Duration::ZERO,
        }
    }

    pub fn new(attempts: u32, backoff: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            backoff,
        }
    }

    /// Whether commands of this family may be repeated
    pub fn applies_to(category: Category) -> bool {
        !matches!(category, Category::Execution | Category::Acknowledge)
    }

    /// Run `op`, repeating retryable failures while attempts remain
    pub fn run<T>(&self, category: Category, mut op: impl FnMut() -> Result<T>) -> Result<T> {
        let attempts = if Self::applies_to(category) {
            self.attempts.max(1)
        } else {
            1
        };

        let mut attempt = 1;
        loop {
            match op() {
                Err(e) if attempt < attempts && e.is_retryable() => {
                    tracing::debug!("Attempt {}/{} failed: {}; retrying", attempt, attempts, e);
                    attempt += 1;
                    if !self.backoff.is_zero() {
                        thread::sleep(self.backoff);
                    }
                }
                result => return result,
            }
        }
    }
}
