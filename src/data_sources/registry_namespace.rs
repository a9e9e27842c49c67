use crate::data_sources::{DataSource, read_as_resource, select_by_name};
use crate::errors::{ProviderError, ProviderResult};
use crate::locality::{is_uuid, new_scoped_id};
use crate::marshalling::ResourceData;
use crate::provider::ProviderMeta;
use crate::reconcile::OperationContext;
use crate::resources::registry_namespace::RegistryNamespaceResource;
use crate::resources::{Resource, parse_regional_id};
use crate::schema::{Schema, datasource_schema_from_resource};
use async_trait::async_trait;

pub struct RegistryNamespaceDataSource;

#[async_trait]
impl DataSource for RegistryNamespaceDataSource {
    fn kind(&self) -> &'static str {
        "scaleway_registry_namespace"
    }

    fn schema(&self) -> Schema {
        datasource_schema_from_resource(
            &RegistryNamespaceResource.schema(),
            &["namespace_id", "name", "region", "project_id"],
        )
    }

    async fn read(&self, ctx: &OperationContext, data: &mut ResourceData, meta: &ProviderMeta) -> ProviderResult<()> {
        let region = meta.region(data)?;

        let id = match (data.get_str("namespace_id"), data.get_str("name")) {
            (Some(raw), _) if is_uuid(raw) => new_scoped_id(region, raw),
            (Some(raw), _) => {
                parse_regional_id(raw)?;
                raw.to_string()
            }
            (None, Some(name)) => {
                let namespaces = ctx
                    .run(meta.registry().list_namespaces(region, Some(name), data.get_str("project_id")))
                    .await?;
                let namespace = select_by_name("registry namespace", name, namespaces, |n| n.name.as_str())?;
                new_scoped_id(region, &namespace.id)
            }
            (None, None) => {
                return Err(ProviderError::new_validation(
                    "namespace_id",
                    "one of namespace_id or name must be set",
                ));
            }
        };

        read_as_resource(&RegistryNamespaceResource, id.clone(), ctx, data, meta).await?;
        data.set("namespace_id", id);

        Ok(())
    }
}
