use crate::errors::{ProviderResult, Tag};
use crate::reconcile::OperationContext;
use std::future::Future;
use std::time::Duration;

/// Issues `op` until it returns something else than a conflict.
///
/// On conflict the parent is awaited to a terminal ok state through `wait_parent` before `op` is reissued,
/// any other error (including one from `wait_parent`) is returned as is.
pub async fn retry_on_conflict<T, P, Op, OpFut, W, WFut>(
    ctx: &OperationContext,
    interval: Duration,
    mut op: Op,
    mut wait_parent: W,
) -> ProviderResult<T>
where
    Op: FnMut() -> OpFut,
    OpFut: Future<Output = ProviderResult<T>>,
    W: FnMut() -> WFut,
    WFut: Future<Output = ProviderResult<P>>,
{
    let mut attempt: u32 = 0;

    loop {
        ctx.check()?;
        attempt += 1;

        match ctx.run(op()).await {
            Err(err) if err.tag() == Tag::Conflict => {
                info!("attempt {}: conflict, waiting for the parent resource before retrying", attempt);
                wait_parent().await?;
                ctx.sleep(interval).await?;
            }
            res => return res,
        }
    }
}
