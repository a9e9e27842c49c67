use crate::errors::{ProviderError, ProviderResult};
use crate::locality::{new_child_id, new_scoped_id, parse_child_id};
use crate::marshalling::ResourceData;
use crate::provider::ProviderMeta;
use crate::reconcile::{OperationContext, default_wait_retry_interval, retry_on_conflict};
use crate::resources::documentdb::{instance_locality, wait_for_instance};
use crate::resources::{Resource, found, ignore_not_found, stored_id};
use crate::schema::{Attribute, Schema, suppress_locality_diff};
use async_trait::async_trait;

pub struct DocumentDbUserResource;

#[async_trait]
impl Resource for DocumentDbUserResource {
    fn kind(&self) -> &'static str {
        "scaleway_documentdb_user"
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
            .with_attribute("password", Attribute::required_string().sensitive())
            .with_attribute("is_admin", Attribute::optional_bool().with_default(false))
            .with_attribute("region", Attribute::optional_computed_string().force_new())
    }

    async fn create(&self, ctx: &OperationContext, data: &mut ResourceData, meta: &ProviderMeta) -> ProviderResult<()> {
        let api = &meta.documentdb();
        let (region, instance_id) = instance_locality(data, meta)?;
        let instance_id = instance_id.as_str();
        let name = data
            .get_str("name")
            .ok_or_else(|| ProviderError::new_validation("name", "name is required"))?
            .to_string();
        let password = data.get_str("password").unwrap_or_default().to_string();
        let is_admin = data.get_bool("is_admin").unwrap_or(false);
        let (user_name, password) = (name.as_str(), password.as_str());

        retry_on_conflict(
            ctx,
            default_wait_retry_interval(),
            move || api.create_user(region, instance_id, user_name, password, is_admin),
            move || wait_for_instance(ctx, api, region, instance_id),
        )
        .await?;
        data.set_id(new_child_id(region, instance_id, &[user_name]));

        self.read(ctx, data, meta).await
    }

    /// The password is never read back.
    async fn read(&self, ctx: &OperationContext, data: &mut ResourceData, meta: &ProviderMeta) -> ProviderResult<()> {
        let raw_id = stored_id(data)?;
        let id = parse_child_id(&raw_id, 1)?;
        let region = id.scope.region();
        let name = id.subpart(0);
        let api = meta.documentdb();

        let users = match found(ctx.run(api.list_users(region, &id.parent_id, Some(name))).await, data)? {
            Some(users) => users,
            None => return Ok(()),
        };
        let user = match users.into_iter().find(|u| u.name == name) {
            Some(user) => user,
            None => {
                warn!("documentdb user `{}` not found, removing it from state", raw_id);
                data.clear_id();
                return Ok(());
            }
        };

        data.set("instance_id", new_scoped_id(region, &id.parent_id));
        data.set("name", user.name.as_str());
        data.set("is_admin", user.is_admin);
        data.set("region", region.as_str());

        Ok(())
    }

    async fn update(&self, ctx: &OperationContext, data: &mut ResourceData, meta: &ProviderMeta) -> ProviderResult<()> {
        let raw_id = stored_id(data)?;
        let id = parse_child_id(&raw_id, 1)?;
        let region = id.scope.region();
        let instance_id = id.parent_id.as_str();
        let name = id.subpart(0);
        let api = &meta.documentdb();

        let password = match data.has_change("password") {
            true => data.get_str("password"),
            false => None,
        };
        let is_admin = match data.has_change("is_admin") {
            true => data.get_bool("is_admin"),
            false => None,
        };

        if password.is_some() || is_admin.is_some() {
            retry_on_conflict(
                ctx,
                default_wait_retry_interval(),
                move || api.update_user(region, instance_id, name, password, is_admin),
                move || wait_for_instance(ctx, api, region, instance_id),
            )
            .await?;
        }

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
                move || api.delete_user(region, instance_id, name),
                move || wait_for_instance(ctx, api, region, instance_id),
            )
            .await,
        )?;
        ignore_not_found(wait_for_instance(ctx, api, region, instance_id).await.map(|_| ()))?;

        data.clear_id();
        Ok(())
    }
}
