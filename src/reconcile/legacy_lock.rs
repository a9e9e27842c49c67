use crate::errors::ProviderResult;
use crate::reconcile::OperationContext;
use tokio::sync::{Mutex, MutexGuard};

// Older instance API endpoints (security group rule sets) are not safe to call concurrently.
static LEGACY_API_LOCK: Mutex<()> = Mutex::const_new(());

/// Serializes calls to legacy endpoints across the whole process. Waiting for the lock honors
/// the deadline and the cancellation signal of the invocation.
pub async fn lock_legacy_api(ctx: &OperationContext) -> ProviderResult<MutexGuard<'static, ()>> {
    ctx.run(async { Ok(LEGACY_API_LOCK.lock().await) }).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::Tag;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_lock_legacy_api_times_out_while_held() {
        let ctx = OperationContext::new(Duration::from_secs(60));
        let guard = lock_legacy_api(&ctx).await.expect("lock should be free");

        let other = OperationContext::new(Duration::from_secs(1));
        let res = lock_legacy_api(&other).await;
        assert_eq!(Some(Tag::DeadlineExceeded), res.err().map(|e| e.tag()));

        drop(guard);
        let again = OperationContext::new(Duration::from_secs(1));
        assert!(lock_legacy_api(&again).await.is_ok());
    }
}
