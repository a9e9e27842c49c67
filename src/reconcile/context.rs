use crate::constants::DEFAULT_WAIT_RETRY_INTERVAL;
use crate::errors::{ProviderError, ProviderResult};
use std::future::Future;
use std::sync::RwLock;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

static WAIT_RETRY_INTERVAL_OVERRIDE: RwLock<Option<Duration>> = RwLock::new(None);

/// Overrides the poll interval of every wait for the whole process, `None` restores the default.
/// Meant for tests, where it is set to zero.
pub fn set_default_wait_retry_interval(interval: Option<Duration>) {
    if let Ok(mut current) = WAIT_RETRY_INTERVAL_OVERRIDE.write() {
        *current = interval;
    }
}

pub fn default_wait_retry_interval() -> Duration {
    WAIT_RETRY_INTERVAL_OVERRIDE
        .read()
        .ok()
        .and_then(|current| *current)
        .unwrap_or(DEFAULT_WAIT_RETRY_INTERVAL)
}

/// OperationContext: deadline and cancellation signal of a single handler invocation.
///
/// The deadline is fixed at construction, nothing below the handler can extend it.
#[derive(Clone, Debug)]
pub struct OperationContext {
    deadline: Instant,
    timeout: Duration,
    cancellation: CancellationToken,
}

impl OperationContext {
    pub fn new(timeout: Duration) -> Self {
        OperationContext {
            deadline: Instant::now() + timeout,
            timeout,
            cancellation: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, cancellation: CancellationToken) -> Self {
        self.cancellation = cancellation;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.deadline
    }

    /// Fails when the invocation was cancelled or ran out of time.
    pub fn check(&self) -> ProviderResult<()> {
        if self.cancellation.is_cancelled() {
            return Err(ProviderError::new_cancelled());
        }
        if self.is_expired() {
            return Err(ProviderError::new_deadline_exceeded(self.timeout));
        }
        Ok(())
    }

    /// Runs a single suspension point (API call, lock acquisition) under the deadline and the cancellation signal.
    pub async fn run<T, F>(&self, fut: F) -> ProviderResult<T>
    where
        F: Future<Output = ProviderResult<T>>,
    {
        tokio::select! {
            biased;
            _ = self.cancellation.cancelled() => Err(ProviderError::new_cancelled()),
            res = tokio::time::timeout_at(self.deadline, fut) => match res {
                Ok(res) => res,
                Err(_) => Err(ProviderError::new_deadline_exceeded(self.timeout)),
            },
        }
    }

    /// Sleeps between two polls. A sleep that would end past the deadline stops at the deadline and fails.
    pub async fn sleep(&self, duration: Duration) -> ProviderResult<()> {
        self.check()?;
        if duration.is_zero() {
            tokio::task::yield_now().await;
            return Ok(());
        }

        let wake_up = Instant::now() + duration;
        tokio::select! {
            biased;
            _ = self.cancellation.cancelled() => Err(ProviderError::new_cancelled()),
            _ = tokio::time::sleep_until(wake_up.min(self.deadline)) => {
                if wake_up > self.deadline {
                    Err(ProviderError::new_deadline_exceeded(self.timeout))
                } else {
                    Ok(())
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::Tag;

    #[tokio::test]
    async fn test_zero_timeout_is_expired() {
        let ctx = OperationContext::new(Duration::ZERO);

        assert!(ctx.is_expired());
        assert_eq!(Some(Tag::DeadlineExceeded), ctx.check().err().map(|e| e.tag()));
    }

    #[tokio::test]
    async fn test_run_returns_cancelled() {
        let token = CancellationToken::new();
        let ctx = OperationContext::new(Duration::from_secs(60)).with_cancellation(token.clone());
        token.cancel();

        let res: ProviderResult<()> = ctx
            .run(async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(())
            })
            .await;

        assert_eq!(Some(Tag::Cancelled), res.err().map(|e| e.tag()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_honors_deadline() {
        let ctx = OperationContext::new(Duration::from_secs(1));

        let res: ProviderResult<()> = ctx
            .run(async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(())
            })
            .await;

        assert_eq!(Some(Tag::DeadlineExceeded), res.err().map(|e| e.tag()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sleep_past_deadline_fails() {
        let ctx = OperationContext::new(Duration::from_secs(10));

        assert!(ctx.sleep(Duration::from_secs(5)).await.is_ok());
        assert_eq!(
            Some(Tag::DeadlineExceeded),
            ctx.sleep(Duration::from_secs(6)).await.err().map(|e| e.tag())
        );
    }
}
