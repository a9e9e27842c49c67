use crate::errors::{ProviderError, ProviderResult, Tag};
use crate::reconcile::OperationContext;
use retry::delay::Fixed;
use std::future::Future;
use std::time::Duration;

/// StatusClass: how the wait engine reads a status observed on the cloud.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StatusClass {
    /// creating, updating, provisioning...
    Transitional,
    /// ready, active...
    TerminalOk,
    /// error, locked, unknown... carries the raw status.
    TerminalBad(String),
}

fn poll_delays(interval: Duration) -> Fixed {
    Fixed::from_millis(u64::try_from(interval.as_millis()).unwrap_or(u64::MAX))
}

fn is_retryable(err: &ProviderError) -> bool {
    matches!(err.tag(), Tag::Transient | Tag::RateLimited)
}

/// Polls `fetch` until the entity reaches a terminal status.
///
/// NotFound is returned as is on the first occurrence, transient errors are retried after `interval`.
/// Polls are serial, and none is issued once the deadline has passed.
pub async fn wait_for<T, F, Fut, C>(
    ctx: &OperationContext,
    interval: Duration,
    mut fetch: F,
    classify: C,
) -> ProviderResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ProviderResult<T>>,
    C: Fn(&T) -> StatusClass,
{
    let mut delays = poll_delays(interval);
    let mut attempt: u32 = 0;

    loop {
        ctx.check()?;
        attempt += 1;

        match ctx.run(fetch()).await {
            Ok(entity) => match classify(&entity) {
                StatusClass::TerminalOk => return Ok(entity),
                StatusClass::TerminalBad(status) => return Err(ProviderError::new_bad_terminal_state(&status)),
                StatusClass::Transitional => debug!("attempt {}: resource is not in a terminal state yet", attempt),
            },
            Err(err) if is_retryable(&err) => {
                warn!("attempt {}: transient error while waiting, retrying: {}", attempt, err)
            }
            Err(err) => return Err(err),
        }

        ctx.sleep(delays.next().unwrap_or(interval)).await?;
    }
}

/// Polls `fetch` until the entity is gone. Observing a bad status before that is an error.
pub async fn wait_for_absence<T, F, Fut, C>(
    ctx: &OperationContext,
    interval: Duration,
    mut fetch: F,
    classify: C,
) -> ProviderResult<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ProviderResult<T>>,
    C: Fn(&T) -> StatusClass,
{
    let mut delays = poll_delays(interval);
    let mut attempt: u32 = 0;

    loop {
        ctx.check()?;
        attempt += 1;

        match ctx.run(fetch()).await {
            Err(err) if err.is_not_found() => return Ok(()),
            Err(err) if is_retryable(&err) => {
                warn!("attempt {}: transient error while waiting for deletion, retrying: {}", attempt, err)
            }
            Err(err) => return Err(err),
            Ok(entity) => {
                if let StatusClass::TerminalBad(status) = classify(&entity) {
                    return Err(ProviderError::new_bad_terminal_state(&status));
                }
                debug!("attempt {}: resource still exists", attempt);
            }
        }

        ctx.sleep(delays.next().unwrap_or(interval)).await?;
    }
}
