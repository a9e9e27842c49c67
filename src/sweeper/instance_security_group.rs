use crate::errors::ProviderResult;
use crate::locality::{ScwZone, new_scoped_id};
use crate::provider::ProviderMeta;
use crate::reconcile::{OperationContext, lock_legacy_api};
use crate::sweeper::{SweepReport, Sweeper, is_sweepable_name, listed_or_unsupported};
use async_trait::async_trait;
use strum::IntoEnumIterator;

/// Leftover security groups. The default group of a project is never deleted.
pub struct InstanceSecurityGroupSweeper;

#[async_trait]
impl Sweeper for InstanceSecurityGroupSweeper {
    fn name(&self) -> &'static str {
        "scaleway_instance_security_group"
    }

    async fn sweep(&self, ctx: &OperationContext, meta: &ProviderMeta, project_id: &str) -> ProviderResult<SweepReport> {
        let api = meta.instance();
        let mut report = SweepReport::default();

        for zone in ScwZone::iter() {
            let security_groups = {
                let _lock = lock_legacy_api(ctx).await?;
                ctx.run(api.list_security_groups(zone, None, Some(project_id))).await
            };
            let Some(security_groups) = listed_or_unsupported(zone.as_str(), security_groups)? else {
                continue;
            };

            for security_group in security_groups {
                let scoped_id = new_scoped_id(zone, &security_group.id);
                if security_group.project_default || !is_sweepable_name(&security_group.name) {
                    report.skipped.push(scoped_id);
                    continue;
                }

                info!("sweeping security group `{}` ({})", security_group.name, scoped_id);
                let res = {
                    let _lock = lock_legacy_api(ctx).await?;
                    ctx.run(api.delete_security_group(zone, &security_group.id)).await
                };
                report.record(scoped_id, res);
            }
        }

        Ok(report)
    }
}
