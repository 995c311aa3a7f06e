//! Bounded exponential backoff for rate-limited remote calls.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;

use super::{RemoteCardRef, RemoteDeck, RemoteError, RemoteResult, RemoteService};

const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);

/// How rate-limited calls are retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per call, including the first one
    pub max_attempts: u32,
    /// Wait after the first rate-limited attempt; doubles after each further one
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
        }
    }
}

/// Terminal state of a retried call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryOutcome<T> {
    Success(T),
    /// A non-retryable error
    Failed(RemoteError),
    /// Every attempt was rate limited
    Exhausted { attempts: u32 },
}

impl<T> RetryOutcome<T> {
    pub fn into_result(self) -> RemoteResult<T> {
        match self {
            Self::Success(value) => Ok(value),
            Self::Failed(error) => Err(error),
            Self::Exhausted { .. } => Err(RemoteError::RateLimited),
        }
    }
}

impl RetryPolicy {
    /// Delay after the `attempt`-th (1-based) rate-limited attempt.
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor)
    }

    /// Run `call` until it succeeds, fails with a non-rate-limit error, or
    /// `max_attempts` rate-limited attempts have been made.
    pub async fn run<T, F, Fut>(&self, operation: &str, mut call: F) -> RetryOutcome<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = RemoteResult<T>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match call().await {
                Ok(value) => return RetryOutcome::Success(value),
                Err(RemoteError::RateLimited) if attempt < max_attempts => {
                    let delay = self.delay_for_attempt(attempt);
                    tracing::warn!(
                        operation,
                        attempt,
                        "Rate limited by remote service, retrying in {}ms",
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(RemoteError::RateLimited) => {
                    tracing::warn!(operation, attempts = attempt, "Rate limit retries exhausted");
                    return RetryOutcome::Exhausted { attempts: attempt };
                }
                Err(error) => return RetryOutcome::Failed(error),
            }
        }
    }
}

/// Wraps a service so every call follows a [`RetryPolicy`].
#[derive(Debug, Clone)]
pub struct RetryingService<S> {
    inner: S,
    policy: RetryPolicy,
}

impl<S> RetryingService<S> {
    pub const fn new(inner: S, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub const fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait]
impl<S: RemoteService> RemoteService for RetryingService<S> {
    async fn create_card(
        &self,
        content: &str,
        deck_id: &str,
        tags: &[String],
    ) -> RemoteResult<RemoteCardRef> {
        self.policy
            .run("create_card", move || self.inner.create_card(content, deck_id, tags))
            .await
            .into_result()
    }

    async fn update_card(
        &self,
        remote_id: &str,
        content: &str,
        tags: &[String],
    ) -> RemoteResult<RemoteCardRef> {
        self.policy
            .run("update_card", move || self.inner.update_card(remote_id, content, tags))
            .await
            .into_result()
    }

    async fn list_decks(&self) -> RemoteResult<Vec<RemoteDeck>> {
        self.policy
            .run("list_decks", move || self.inner.list_decks())
            .await
            .into_result()
    }
}
