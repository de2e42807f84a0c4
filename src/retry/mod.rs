//! Keyed retry coordination with bounded exponential backoff.
//!
//! [`RetryManager`] deduplicates retries of the same logical operation. Each
//! operation is identified by a stable key (for webhook calls,
//! `"{operation}_{company_id}_{api_key}"`). While one caller is retrying a
//! key, concurrent callers for that key run their attempt once and surface
//! the error instead of starting a second retry sequence.
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use fdk_extension::{RetryManager, RetryPolicy, RetryableError};
//!
//! #[derive(Debug)]
//! struct Flaky;
//! impl RetryableError for Flaky {
//!     fn is_retryable(&self) -> bool { true }
//! }
//!
//! # tokio_test::block_on(async {
//! let manager = RetryManager::new(RetryPolicy::new(3, Duration::from_millis(1), Duration::from_millis(5)));
//! let mut calls = 0;
//! let result: Result<u32, Flaky> = manager
//!     .execute_with_retry("op_1_key", || {
//!         calls += 1;
//!         let ok = calls == 3;
//!         async move { if ok { Ok(7) } else { Err(Flaky) } }
//!     })
//!     .await;
//! assert_eq!(result.unwrap(), 7);
//! # });
//! ```

use std::future::Future;
use std::time::Duration;

use dashmap::DashMap;

/// Default maximum number of retries per sequence.
pub const DEFAULT_MAX_RETRIES: u32 = 5;

/// Default delay before the first retry.
pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_secs(1);

/// Default upper bound for a single backoff delay.
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(30);

/// Classifies errors as transient.
pub trait RetryableError {
    /// Returns `true` if the failed operation may succeed when retried.
    fn is_retryable(&self) -> bool;
}

/// Backoff schedule for a retry sequence.
///
/// Delays double with each attempt, starting at `initial_delay` and capped at
/// `max_delay`, so the schedule is monotonic and bounded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    max_retries: u32,
    initial_delay: Duration,
    max_delay: Duration,
}

impl RetryPolicy {
    /// Creates a policy. `max_delay` is raised to `initial_delay` if smaller.
    #[must_use]
    pub fn new(max_retries: u32, initial_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_retries,
            initial_delay,
            max_delay: max_delay.max(initial_delay),
        }
    }

    /// A policy that never retries.
    #[must_use]
    pub const fn disabled() -> Self {
        Self {
            max_retries: 0,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Returns the maximum number of retries.
    #[must_use]
    pub const fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Returns the delay before retry number `attempt` (1-based).
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let factor = 2u32.saturating_pow(attempt - 1);
        self.initial_delay
            .saturating_mul(factor)
            .min(self.max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RETRIES, DEFAULT_INITIAL_DELAY, DEFAULT_MAX_DELAY)
    }
}

/// Retry state for one operation key.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RetryInfo {
    /// A caller currently owns the retry sequence for this key.
    pub is_retry_in_progress: bool,
    /// The owning caller is between retry attempts.
    pub is_retry: bool,
    /// Retries performed in the current (or last) sequence.
    pub retry_count: u32,
}

/// Coordinates retries of keyed operations.
#[derive(Debug, Default)]
pub struct RetryManager {
    policy: RetryPolicy,
    entries: DashMap<String, RetryInfo>,
}

/// Ends the owned sequence on drop, so a cancelled caller does not leave
/// the key marked in progress.
struct SequenceGuard<'a> {
    manager: &'a RetryManager,
    key: &'a str,
}

impl Drop for SequenceGuard<'_> {
    fn drop(&mut self) {
        if let Some(mut info) = self.manager.entries.get_mut(self.key) {
            info.is_retry_in_progress = false;
            info.is_retry = false;
        }
    }
}

impl RetryManager {
    /// Creates a manager using `policy`.
    #[must_use]
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            entries: DashMap::new(),
        }
    }

    /// Returns the policy in use.
    #[must_use]
    pub const fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Returns a snapshot of the retry state for `key`.
    #[must_use]
    pub fn retry_info(&self, key: &str) -> Option<RetryInfo> {
        self.entries.get(key).map(|info| *info)
    }

    /// Runs `operation`, retrying retryable failures with backoff.
    ///
    /// A retry sequence is only started if no other caller is retrying the
    /// same `key`; otherwise the first error is returned as-is. Starting a
    /// sequence on a key whose previous sequence has ended resets its
    /// counter. Once `max_retries` retries have failed the last error is
    /// returned.
    ///
    /// # Errors
    ///
    /// Returns the operation's error when it is not retryable, when another
    /// caller owns the retry sequence, or when retries are exhausted.
    pub async fn execute_with_retry<T, E, F, Fut>(&self, key: &str, mut operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: RetryableError,
    {
        let mut guard: Option<SequenceGuard<'_>> = None;

        loop {
            let err = match operation().await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            if !err.is_retryable() {
                return Err(err);
            }

            if guard.is_none() {
                if !self.claim(key) {
                    tracing::debug!("Retry for {key} already in progress; not retrying");
                    return Err(err);
                }
                guard = Some(SequenceGuard { manager: self, key });
            }

            let Some(attempt) = self.next_attempt(key) else {
                tracing::debug!(
                    "Retries exhausted for {key} after {} attempts",
                    self.policy.max_retries
                );
                return Err(err);
            };

            let delay = self.policy.delay_for(attempt);
            tracing::debug!(
                "Retrying {key} (attempt {attempt}/{}) in {}ms",
                self.policy.max_retries,
                delay.as_millis()
            );
            tokio::time::sleep(delay).await;
        }
    }

    /// Marks `key` in progress, resetting a dormant sequence.
    fn claim(&self, key: &str) -> bool {
        let mut info = self.entries.entry(key.to_string()).or_default();
        if info.is_retry_in_progress {
            return false;
        }
        *info = RetryInfo {
            is_retry_in_progress: true,
            is_retry: false,
            retry_count: 0,
        };
        true
    }

    fn next_attempt(&self, key: &str) -> Option<u32> {
        let mut info = self.entries.entry(key.to_string()).or_default();
        if info.retry_count >= self.policy.max_retries {
            return None;
        }
        info.retry_count += 1;
        info.is_retry = true;
        Some(info.retry_count)
    }
}

// Verify RetryManager is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<RetryManager>();
};
