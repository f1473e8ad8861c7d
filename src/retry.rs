//! Retry with exponential backoff.
//!
//! Ingestion, querying and audio acquisition all run their external calls
//! through [`retry_with_backoff`]. What gets retried is decided by the
//! policy's predicate; everything else is returned on the first failure.

use crate::config::{DownloadSettings, RetrySettings};
use crate::error::{ErrorKind, Result, VidqaError};
use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};

/// Decides whether a failure is worth another attempt.
pub type RetryPredicate = fn(&VidqaError) -> bool;

/// Bounded exponential backoff.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Delay multiplier per attempt.
    pub multiplier: u32,
    /// Which failures are retried.
    pub retry_on: RetryPredicate,
}

impl RetryPolicy {
    /// Retry only rate-limit failures: 10s, 20s, 40s, ...
    pub fn rate_limited(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay: Duration::from_secs(10),
            multiplier: 2,
            retry_on: VidqaError::is_rate_limit,
        }
    }

    /// Retry every failure except cancellation: 1s, 2s, 4s, ...
    pub fn any_failure(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay: Duration::from_secs(1),
            multiplier: 2,
            retry_on: |e| e.kind() != ErrorKind::Cancelled,
        }
    }

    pub fn from_settings(settings: &RetrySettings) -> Self {
        Self {
            base_delay: Duration::from_secs(settings.base_delay_secs),
            multiplier: settings.multiplier,
            ..Self::rate_limited(settings.max_retries)
        }
    }

    pub fn for_downloads(settings: &DownloadSettings) -> Self {
        Self {
            base_delay: Duration::from_secs(settings.base_delay_secs),
            ..Self::any_failure(settings.max_retries)
        }
    }

    /// Delay after the failed attempt `attempt` (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.saturating_pow(attempt);
        self.base_delay.saturating_mul(factor)
    }

    /// Whether a failure of `attempt` (0-indexed) should be retried.
    pub fn should_retry(&self, attempt: u32, error: &VidqaError) -> bool {
        attempt + 1 < self.max_attempts.max(1) && (self.retry_on)(error)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::rate_limited(3)
    }
}

/// Source of deliberate pauses.
#[async_trait]
pub trait Sleeper: Send + Sync {
    /// Sleep for `duration`, returning early with `Cancelled` if the token fires.
    async fn sleep(&self, duration: Duration, cancel: &CancellationToken) -> Result<()>;
}

/// Sleeper backed by the tokio timer.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration, cancel: &CancellationToken) -> Result<()> {
        tokio::select! {
            _ = tokio::time::sleep(duration) => Ok(()),
            _ = cancel.cancelled() => Err(VidqaError::Cancelled),
        }
    }
}

/// Run `fut` unless `cancel` fires first.
pub async fn cancellable<T, F>(cancel: &CancellationToken, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(VidqaError::Cancelled),
        result = fut => result,
    }
}

/// Run `operation` until it succeeds, fails with a non-retryable error, or
/// the policy's attempt ceiling is reached.
pub async fn retry_with_backoff<T, F, Fut>(
    policy: &RetryPolicy,
    sleeper: &dyn Sleeper,
    cancel: &CancellationToken,
    label: &str,
    mut operation: F,
) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;

    loop {
        if cancel.is_cancelled() {
            return Err(VidqaError::Cancelled);
        }

        match operation(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) if policy.should_retry(attempt, &e) => {
                let delay = policy.delay_for_attempt(attempt);
                warn!(
                    "{} failed (attempt {}/{}): {}. Waiting {} seconds before retry...",
                    label,
                    attempt + 1,
                    policy.max_attempts,
                    e,
                    delay.as_secs()
                );
                if let Some(hint) = e.hint() {
                    warn!("{}", hint);
                }
                sleeper.sleep(delay, cancel).await?;
                attempt += 1;
            }
            Err(e) => {
                match e.hint() {
                    Some(hint) => error!("{} failed: {}. {}", label, e, hint),
                    None => error!("{} failed: {}", label, e),
                }
                return Err(e);
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Records requested pauses instead of sleeping.
    #[derive(Debug, Default)]
    pub struct RecordingSleeper {
        pub sleeps: Mutex<Vec<Duration>>,
    }

    impl RecordingSleeper {
        pub fn recorded(&self) -> Vec<Duration> {
            self.sleeps.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Sleeper for RecordingSleeper {
        async fn sleep(&self, duration: Duration, cancel: &CancellationToken) -> Result<()> {
            if cancel.is_cancelled() {
                return Err(VidqaError::Cancelled);
            }
            self.sleeps.lock().unwrap().push(duration);
            Ok(())
        }
    }
}
