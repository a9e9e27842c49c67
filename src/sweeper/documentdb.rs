use crate::errors::ProviderResult;
use crate::locality::{ScwRegion, new_scoped_id};
use crate::provider::ProviderMeta;
use crate::reconcile::{OperationContext, StatusClass, default_wait_retry_interval, retry_on_conflict, wait_for_absence};
use crate::resources::documentdb::wait_for_instance;
use crate::services::scaleway::DocumentDbApi;
use crate::services::scaleway::documentdb::Instance;
use crate::sweeper::{SweepReport, Sweeper, is_sweepable_name, listed_or_unsupported};
use async_trait::async_trait;
use strum::IntoEnumIterator;

pub struct DocumentDbInstanceSweeper;

/// Deletes the databases created by tests, then the instance, and waits for it to be gone.
async fn sweep_instance(
    ctx: &OperationContext,
    api: &DocumentDbApi,
    region: ScwRegion,
    instance: &Instance,
) -> ProviderResult<()> {
    let instance_id = instance.id.as_str();
    let interval = default_wait_retry_interval();

    let databases = ctx.run(api.list_databases(region, instance_id, None)).await?;
    for database in databases.iter().filter(|d| !d.managed) {
        let name = database.name.as_str();
        let res = retry_on_conflict(
            ctx,
            interval,
            move || api.delete_database(region, instance_id, name),
            move || wait_for_instance(ctx, api, region, instance_id),
        )
        .await;
        match res {
            Err(err) if !err.is_not_found() => return Err(err),
            _ => {}
        }
    }

    retry_on_conflict(
        ctx,
        interval,
        move || api.delete_instance(region, instance_id),
        move || wait_for_instance(ctx, api, region, instance_id),
    )
    .await?;

    wait_for_absence(
        ctx,
        interval,
        move || api.get_instance(region, instance_id),
        |instance: &Instance| match instance.status.class() {
            StatusClass::TerminalBad(_) => StatusClass::Transitional,
            class => class,
        },
    )
    .await
}

#[async_trait]
impl Sweeper for DocumentDbInstanceSweeper {
    fn name(&self) -> &'static str {
        "scaleway_documentdb_instance"
    }

    async fn sweep(&self, ctx: &OperationContext, meta: &ProviderMeta, project_id: &str) -> ProviderResult<SweepReport> {
        let api = &meta.documentdb();
        let mut report = SweepReport::default();

        for region in ScwRegion::iter() {
            let instances = ctx.run(api.list_instances(region, None, Some(project_id))).await;
            let Some(instances) = listed_or_unsupported(region.as_str(), instances)? else {
                continue;
            };
            for instance in instances {
                let scoped_id = new_scoped_id(region, &instance.id);
                if !is_sweepable_name(&instance.name) {
                    debug!("not sweeping documentdb instance `{}` ({})", instance.name, scoped_id);
                    report.skipped.push(scoped_id);
                    continue;
                }

                info!("sweeping documentdb instance `{}` ({})", instance.name, scoped_id);
                let res = sweep_instance(ctx, api, region, &instance).await;
                report.record(scoped_id, res);
            }
        }

        Ok(report)
    }
}
