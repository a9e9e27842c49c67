use crate::errors::{ProviderError, ProviderResult};
use crate::locality::{new_child_id, new_scoped_id, parse_child_id};
use crate::marshalling::ResourceData;
use crate::provider::ProviderMeta;
use crate::reconcile::{OperationContext, default_wait_retry_interval, retry_on_conflict};
use crate::resources::documentdb::{instance_locality, wait_for_instance};
use crate::resources::{Resource, found, ignore_not_found, stored_id};
use crate::schema::{Attribute, Schema, suppress_locality_diff};
use crate::services::scaleway::documentdb::Permission;
use async_trait::async_trait;
use std::str::FromStr;

pub struct DocumentDbPrivilegeResource;

fn permission(data: &ResourceData) -> ProviderResult<Permission> {
    let raw = data
        .get_str("permission")
        .ok_or_else(|| ProviderError::new_validation("permission", "permission is required"))?;

    match Permission::from_str(raw) {
        Ok(Permission::None) | Err(_) => Err(ProviderError::new_validation(
            "permission",
            &format!("permission `{raw}` is not one of readonly, readwrite, all, custom"),
        )),
        Ok(permission) => Ok(permission),
    }
}

impl DocumentDbPrivilegeResource {
    /// Create and Update both set the permission of the binding.
    async fn set(&self, ctx: &OperationContext, data: &mut ResourceData, meta: &ProviderMeta) -> ProviderResult<()> {
        let api = &meta.documentdb();
        let (region, instance_id) = instance_locality(data, meta)?;
        let instance_id = instance_id.as_str();
        let permission = permission(data)?;
        let database_name = data
            .get_str("database_name")
            .ok_or_else(|| ProviderError::new_validation("database_name", "database_name is required"))?
            .to_string();
        let user_name = data
            .get_str("user_name")
            .ok_or_else(|| ProviderError::new_validation("user_name", "user_name is required"))?
            .to_string();
        let (database_name, user_name) = (database_name.as_str(), user_name.as_str());

        retry_on_conflict(
            ctx,
            default_wait_retry_interval(),
            move || api.set_privilege(region, instance_id, database_name, user_name, permission),
            move || wait_for_instance(ctx, api, region, instance_id),
        )
        .await?;
        data.set_id(new_child_id(region, instance_id, &[database_name, user_name]));

        self.read(ctx, data, meta).await
    }
}

#[async_trait]
impl Resource for DocumentDbPrivilegeResource {
    fn kind(&self) -> &'static str {
        "scaleway_documentdb_privilege"
    }

    /// Version 1: the id carries the database and the user.
    fn schema(&self) -> Schema {
        Schema::v0()
            .with_version(1)
            .with_attribute(
                "instance_id",
                Attribute::required_string()
                    .force_new()
                    .with_diff_suppress(suppress_locality_diff),
            )
            .with_attribute("database_name", Attribute::required_string().force_new())
            .with_attribute("user_name", Attribute::required_string().force_new())
            .with_attribute(
                "permission",
                Attribute::required_string().with_description("readonly, readwrite, all or custom"),
            )
            .with_attribute("region", Attribute::optional_computed_string().force_new())
    }

    async fn create(&self, ctx: &OperationContext, data: &mut ResourceData, meta: &ProviderMeta) -> ProviderResult<()> {
        self.set(ctx, data, meta).await
    }

    async fn read(&self, ctx: &OperationContext, data: &mut ResourceData, meta: &ProviderMeta) -> ProviderResult<()> {
        let raw_id = stored_id(data)?;
        let id = parse_child_id(&raw_id, 2)?;
        let region = id.scope.region();
        let (database_name, user_name) = (id.subpart(0), id.subpart(1));
        let api = meta.documentdb();

        let privileges = match found(
            ctx.run(api.list_privileges(region, &id.parent_id, Some(database_name), Some(user_name)))
                .await,
            data,
        )? {
            Some(privileges) => privileges,
            None => return Ok(()),
        };

        let mut matches = privileges
            .into_iter()
            .filter(|p| p.database_name == database_name && p.user_name == user_name && p.permission != Permission::None);
        let privilege = match (matches.next(), matches.next()) {
            (None, _) => {
                warn!("documentdb privilege `{}` not found, removing it from state", raw_id);
                data.clear_id();
                return Ok(());
            }
            (Some(privilege), None) => privilege,
            (Some(_), Some(_)) => {
                return Err(ProviderError::new_internal(&format!(
                    "more than one privilege is bound to database `{database_name}` and user `{user_name}`"
                )));
            }
        };

        data.set("instance_id", new_scoped_id(region, &id.parent_id));
        data.set("database_name", privilege.database_name.as_str());
        data.set("user_name", privilege.user_name.as_str());
        data.set("permission", privilege.permission.to_string());
        data.set("region", region.as_str());

        Ok(())
    }

    async fn update(&self, ctx: &OperationContext, data: &mut ResourceData, meta: &ProviderMeta) -> ProviderResult<()> {
        self.set(ctx, data, meta).await
    }

    /// Resets the permission to none. A user or a database already gone means the binding is gone too.
    async fn delete(&self, ctx: &OperationContext, data: &mut ResourceData, meta: &ProviderMeta) -> ProviderResult<()> {
        let raw_id = stored_id(data)?;
        let id = parse_child_id(&raw_id, 2)?;
        let region = id.scope.region();
        let instance_id = id.parent_id.as_str();
        let (database_name, user_name) = (id.subpart(0), id.subpart(1));
        let api = &meta.documentdb();

        ignore_not_found(
            retry_on_conflict(
                ctx,
                default_wait_retry_interval(),
                move || api.set_privilege(region, instance_id, database_name, user_name, Permission::None),
                move || wait_for_instance(ctx, api, region, instance_id),
            )
            .await
            .map(|_| ()),
        )?;

        data.clear_id();
        Ok(())
    }
}
