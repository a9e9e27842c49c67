use crate::errors::ProviderResult;
use crate::locality::new_scoped_id;
use crate::marshalling::{ResourceData, expand_blocks, flatten_blocks};
use crate::provider::ProviderMeta;
use crate::reconcile::{OperationContext, default_wait_retry_interval, retry_on_conflict};
use crate::resources::documentdb::{instance_locality, wait_for_instance};
use crate::resources::{Resource, found, ignore_not_found, parse_regional_id, stored_id};
use crate::schema::{Attribute, Schema, suppress_locality_diff};
use crate::services::scaleway::documentdb::AclRule;
use async_trait::async_trait;

/// The whole ordered rule set of an instance, its id is the one of the instance.
pub struct DocumentDbAclResource;

impl DocumentDbAclResource {
    async fn set(&self, ctx: &OperationContext, data: &mut ResourceData, meta: &ProviderMeta) -> ProviderResult<()> {
        let api = &meta.documentdb();
        let (region, instance_id) = instance_locality(data, meta)?;
        let instance_id = instance_id.as_str();
        let rules = &expand_blocks::<AclRule>("acl_rules", data.get("acl_rules"))?;

        retry_on_conflict(
            ctx,
            default_wait_retry_interval(),
            move || api.set_acl_rules(region, instance_id, rules),
            move || wait_for_instance(ctx, api, region, instance_id),
        )
        .await?;
        data.set_id(new_scoped_id(region, instance_id));
        wait_for_instance(ctx, api, region, instance_id).await?;

        self.read(ctx, data, meta).await
    }
}

#[async_trait]
impl Resource for DocumentDbAclResource {
    fn kind(&self) -> &'static str {
        "scaleway_documentdb_acl"
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_attribute(
                "instance_id",
                Attribute::required_string()
                    .force_new()
                    .with_diff_suppress(suppress_locality_diff),
            )
            .with_attribute(
                "acl_rules",
                Attribute::optional_blocks().with_description("Ordered list of `{ip, description}` blocks"),
            )
            .with_attribute("region", Attribute::optional_computed_string().force_new())
    }

    async fn create(&self, ctx: &OperationContext, data: &mut ResourceData, meta: &ProviderMeta) -> ProviderResult<()> {
        self.set(ctx, data, meta).await
    }

    async fn read(&self, ctx: &OperationContext, data: &mut ResourceData, meta: &ProviderMeta) -> ProviderResult<()> {
        let raw_id = stored_id(data)?;
        let (region, instance_id) = parse_regional_id(&raw_id)?;
        let api = meta.documentdb();

        let rules = match found(ctx.run(api.list_acl_rules(region, &instance_id)).await, data)? {
            Some(rules) => rules,
            None => return Ok(()),
        };

        data.set("instance_id", raw_id.as_str());
        data.set("acl_rules", flatten_blocks(&rules)?);
        data.set("region", region.as_str());

        Ok(())
    }

    async fn update(&self, ctx: &OperationContext, data: &mut ResourceData, meta: &ProviderMeta) -> ProviderResult<()> {
        match data.has_change("acl_rules") {
            true => self.set(ctx, data, meta).await,
            false => self.read(ctx, data, meta).await,
        }
    }

    async fn delete(&self, ctx: &OperationContext, data: &mut ResourceData, meta: &ProviderMeta) -> ProviderResult<()> {
        let (region, instance_id) = parse_regional_id(&stored_id(data)?)?;
        let instance_id = instance_id.as_str();
        let api = &meta.documentdb();

        let rules = match ctx.run(api.list_acl_rules(region, instance_id)).await {
            Ok(rules) => rules,
            Err(err) if err.is_not_found() => {
                data.clear_id();
                return Ok(());
            }
            Err(err) => return Err(err),
        };
        let ips = &rules.into_iter().map(|r| r.ip).collect::<Vec<String>>();

        if !ips.is_empty() {
            ignore_not_found(
                retry_on_conflict(
                    ctx,
                    default_wait_retry_interval(),
                    move || api.delete_acl_rules(region, instance_id, ips),
                    move || wait_for_instance(ctx, api, region, instance_id),
                )
                .await,
            )?;
            ignore_not_found(wait_for_instance(ctx, api, region, instance_id).await.map(|_| ()))?;
        }

        data.clear_id();
        Ok(())
    }
}
