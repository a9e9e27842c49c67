use crate::errors::{ProviderError, ProviderResult};
use crate::locality::{new_child_id, new_scoped_id, parse_child_id};
use crate::marshalling::ResourceData;
use crate::provider::ProviderMeta;
use crate::reconcile::{OperationContext, default_wait_retry_interval, retry_on_conflict};
use crate::resources::documentdb::{instance_locality, wait_for_instance};
use crate::resources::{Resource, found, ignore_not_found, stored_id};
use crate::schema::{Attribute, Schema, suppress_locality_diff};
use async_trait::async_trait;

pub struct DocumentDbDatabaseResource;

#[async_trait]
impl Resource for DocumentDbDatabaseResource {
    fn kind(&self) -> &'static str {
        "scaleway_documentdb_database"
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_attribute(
                "instance_id",
                Attribute::required_string()
                    .force_new()
                    .with_diff_suppress(suppress_locality_diff),
            )
            .with_attribute("name", Attribute::required_string().force_new())
            .with_attribute("region", Attribute::optional_computed_string().force_new())
            .with_attribute("owner", Attribute::computed_string())
            .with_attribute("managed", Attribute::computed_bool())
            .with_attribute("size", Attribute::computed_int())
    }

    async fn create(&self, ctx: &OperationContext, data: &mut ResourceData, meta: &ProviderMeta) -> ProviderResult<()> {
        let api = &meta.documentdb();
        let (region, instance_id) = instance_locality(data, meta)?;
        let instance_id = instance_id.as_str();
        let name = data
            .get_str("name")
            .ok_or_else(|| ProviderError::new_validation("name", "name is required"))?
            .to_string();
        let database_name = name.as_str();

        retry_on_conflict(
            ctx,
            default_wait_retry_interval(),
            move || api.create_database(region, instance_id, database_name),
            move || wait_for_instance(ctx, api, region, instance_id),
        )
        .await?;
        data.set_id(new_child_id(region, instance_id, &[database_name]));

        self.read(ctx, data, meta).await
    }

    async fn read(&self, ctx: &OperationContext, data: &mut ResourceData, meta: &ProviderMeta) -> ProviderResult<()> {
        let raw_id = stored_id(data)?;
        let id = parse_child_id(&raw_id, 1)?;
        let region = id.scope.region();
        let name = id.subpart(0);
        let api = meta.documentdb();

        let databases = match found(ctx.run(api.list_databases(region, &id.parent_id, Some(name))).await, data)? {
            Some(databases) => databases,
            None => return Ok(()),
        };
        let database = match databases.into_iter().find(|d| d.name == name) {
            Some(database) => database,
            None => {
                warn!("documentdb database `{}` not found, removing it from state", raw_id);
                data.clear_id();
                return Ok(());
            }
        };

        data.set("instance_id", new_scoped_id(region, &id.parent_id));
        data.set("name", database.name.as_str());
        data.set("region", region.as_str());
        data.set("owner", database.owner.as_str());
        data.set("managed", database.managed);
        data.set("size", database.size);

        Ok(())
    }

    /// Every argument forces a re-creation.
    async fn update(&self, ctx: &OperationContext, data: &mut ResourceData, meta: &ProviderMeta) -> ProviderResult<()> {
        self.read(ctx, data, meta).await
    }

    async fn delete(&self, ctx: &OperationContext, data: &mut ResourceData, meta: &ProviderMeta) -> ProviderResult<()> {
        let raw_id = stored_id(data)?;
        let id = parse_child_id(&raw_id, 1)?;
        let region = id.scope.region();
        let instance_id = id.parent_id.as_str();
        let name = id.subpart(0);
        let api = &meta.documentdb();

        ignore_not_found(
            retry_on_conflict(
                ctx,
                default_wait_retry_interval(),
                move || api.delete_database(region, instance_id, name),
                move || wait_for_instance(ctx, api, region, instance_id),
            )
            .await,
        )?;
        ignore_not_found(wait_for_instance(ctx, api, region, instance_id).await.map(|_| ()))?;

        data.clear_id();
        Ok(())
    }
}
