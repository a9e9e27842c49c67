use crate::errors::ProviderResult;
use crate::locality::{ScwRegion, new_scoped_id};
use crate::provider::ProviderMeta;
use crate::reconcile::{OperationContext, default_wait_retry_interval, wait_for_absence};
use crate::services::scaleway::RegistryApi;
use crate::services::scaleway::registry::Namespace;
use crate::sweeper::{SweepReport, Sweeper, is_sweepable_name, listed_or_unsupported};
use async_trait::async_trait;
use strum::IntoEnumIterator;

pub struct RegistryNamespaceSweeper;

async fn sweep_namespace(
    ctx: &OperationContext,
    api: &RegistryApi,
    region: ScwRegion,
    namespace_id: &str,
) -> ProviderResult<()> {
    ctx.run(api.delete_namespace(region, namespace_id)).await?;
    wait_for_absence(
        ctx,
        default_wait_retry_interval(),
        move || api.get_namespace(region, namespace_id),
        |namespace: &Namespace| namespace.status.class(),
    )
    .await
}

#[async_trait]
impl Sweeper for RegistryNamespaceSweeper {
    fn name(&self) -> &'static str {
        "scaleway_registry_namespace"
    }

    async fn sweep(&self, ctx: &OperationContext, meta: &ProviderMeta, project_id: &str) -> ProviderResult<SweepReport> {
        let api = &meta.registry();
        let mut report = SweepReport::default();

        for region in ScwRegion::iter() {
            let namespaces = ctx.run(api.list_namespaces(region, None, Some(project_id))).await;
            let Some(namespaces) = listed_or_unsupported(region.as_str(), namespaces)? else {
                continue;
            };
            for namespace in namespaces {
                let scoped_id = new_scoped_id(region, &namespace.id);
                if !is_sweepable_name(&namespace.name) {
                    report.skipped.push(scoped_id);
                    continue;
                }

                info!("sweeping registry namespace `{}` ({})", namespace.name, scoped_id);
                let res = sweep_namespace(ctx, api, region, &namespace.id).await;
                report.record(scoped_id, res);
            }
        }

        Ok(report)
    }
}
