use crate::errors::{ProviderError, ProviderResult};
use crate::locality::{ScwRegion, new_scoped_id};
use crate::marshalling::ResourceData;
use crate::provider::ProviderMeta;
use crate::reconcile::{OperationContext, default_wait_retry_interval, wait_for, wait_for_absence};
use crate::resources::{Resource, found, ignore_not_found, parse_regional_id, stored_id};
use crate::schema::{Attribute, Schema};
use crate::services::scaleway::registry::{
    CreateNamespaceRequest, Namespace, UpdateNamespaceRequest, check_namespace_naming_rules,
};
use crate::services::scaleway::RegistryApi;
use async_trait::async_trait;
use itertools::Itertools;

pub struct RegistryNamespaceResource;

async fn wait_for_namespace(
    ctx: &OperationContext,
    api: &RegistryApi,
    region: ScwRegion,
    namespace_id: &str,
) -> ProviderResult<Namespace> {
    wait_for(
        ctx,
        default_wait_retry_interval(),
        move || api.get_namespace(region, namespace_id),
        |namespace: &Namespace| namespace.status.class(),
    )
    .await
}

#[async_trait]
impl Resource for RegistryNamespaceResource {
    fn kind(&self) -> &'static str {
        "scaleway_registry_namespace"
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_attribute("name", Attribute::required_string().force_new())
            .with_attribute("description", Attribute::optional_string())
            .with_attribute("is_public", Attribute::optional_bool().with_default(false))
            .with_attribute("project_id", Attribute::optional_computed_string().force_new())
            .with_attribute("region", Attribute::optional_computed_string().force_new())
            .with_attribute("endpoint", Attribute::computed_string())
            .with_attribute("status", Attribute::computed_string())
    }

    async fn create(&self, ctx: &OperationContext, data: &mut ResourceData, meta: &ProviderMeta) -> ProviderResult<()> {
        let api = &meta.registry();
        let region = meta.region(data)?;
        let name = data.get_str("name").unwrap_or_default();

        if let Some(broken_rules) = check_namespace_naming_rules(name) {
            return Err(ProviderError::new_validation(
                "name",
                &format!(
                    "name `{}` is invalid: {}",
                    name,
                    broken_rules.iter().map(|r| r.to_string()).sorted().join(" ")
                ),
            ));
        }

        let request = CreateNamespaceRequest {
            name: name.to_string(),
            description: data.get_str("description").unwrap_or_default().to_string(),
            project_id: meta.project_id(data)?,
            is_public: data.get_bool("is_public").unwrap_or(false),
        };

        let namespace = ctx.run(api.create_namespace(region, &request)).await?;
        data.set_id(new_scoped_id(region, &namespace.id));
        wait_for_namespace(ctx, api, region, &namespace.id).await?;

        self.read(ctx, data, meta).await
    }

    async fn read(&self, ctx: &OperationContext, data: &mut ResourceData, meta: &ProviderMeta) -> ProviderResult<()> {
        let (region, namespace_id) = parse_regional_id(&stored_id(data)?)?;
        let api = meta.registry();

        let namespace = match found(ctx.run(api.get_namespace(region, &namespace_id)).await, data)? {
            Some(namespace) => namespace,
            None => return Ok(()),
        };

        data.set("name", namespace.name.as_str());
        data.set("description", namespace.description.as_str());
        data.set("is_public", namespace.is_public);
        data.set("project_id", namespace.project_id.as_str());
        data.set("region", region.as_str());
        data.set("endpoint", namespace.endpoint.as_str());
        data.set("status", namespace.status.to_string());

        Ok(())
    }

    async fn update(&self, ctx: &OperationContext, data: &mut ResourceData, meta: &ProviderMeta) -> ProviderResult<()> {
        let (region, namespace_id) = parse_regional_id(&stored_id(data)?)?;
        let api = meta.registry();

        let mut request = UpdateNamespaceRequest::default();
        if data.has_change("description") {
            request.description = Some(data.get_str("description").unwrap_or_default().to_string());
        }
        if data.has_change("is_public") {
            request.is_public = data.get_bool("is_public");
        }

        if request.description.is_some() || request.is_public.is_some() {
            ctx.run(api.update_namespace(region, &namespace_id, &request)).await?;
        }

        self.read(ctx, data, meta).await
    }

    async fn delete(&self, ctx: &OperationContext, data: &mut ResourceData, meta: &ProviderMeta) -> ProviderResult<()> {
        let (region, namespace_id) = parse_regional_id(&stored_id(data)?)?;
        let namespace_id = namespace_id.as_str();
        let api = &meta.registry();

        match wait_for_namespace(ctx, api, region, namespace_id).await {
            Ok(_) => {}
            Err(err) if err.is_not_found() => {
                data.clear_id();
                return Ok(());
            }
            Err(err) => return Err(err),
        }

        ignore_not_found(ctx.run(api.delete_namespace(region, namespace_id)).await)?;
        wait_for_absence(
            ctx,
            default_wait_retry_interval(),
            move || api.get_namespace(region, namespace_id),
            |namespace: &Namespace| namespace.status.class(),
        )
        .await?;

        data.clear_id();
        Ok(())
    }
}
