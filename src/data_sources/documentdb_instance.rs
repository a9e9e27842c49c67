use crate::data_sources::{DataSource, read_as_resource, select_by_name};
use crate::errors::{ProviderError, ProviderResult};
use crate::locality::{is_uuid, new_scoped_id};
use crate::marshalling::ResourceData;
use crate::provider::ProviderMeta;
use crate::reconcile::OperationContext;
use crate::resources::Resource;
use crate::resources::documentdb::DocumentDbInstanceResource;
use crate::resources::parse_regional_id;
use crate::schema::{Schema, datasource_schema_from_resource};
use async_trait::async_trait;

pub struct DocumentDbInstanceDataSource;

#[async_trait]
impl DataSource for DocumentDbInstanceDataSource {
    fn kind(&self) -> &'static str {
        "scaleway_documentdb_instance"
    }

    fn schema(&self) -> Schema {
        datasource_schema_from_resource(
            &DocumentDbInstanceResource.schema(),
            &["instance_id", "name", "region", "project_id"],
        )
    }

    async fn read(&self, ctx: &OperationContext, data: &mut ResourceData, meta: &ProviderMeta) -> ProviderResult<()> {
        let region = meta.region(data)?;

        let id = match (data.get_str("instance_id"), data.get_str("name")) {
            (Some(raw), _) if is_uuid(raw) => new_scoped_id(region, raw),
            (Some(raw), _) => {
                parse_regional_id(raw)?;
                raw.to_string()
            }
            (None, Some(name)) => {
                let instances = ctx
                    .run(
                        meta.documentdb()
                            .list_instances(region, Some(name), data.get_str("project_id")),
                    )
                    .await?;
                let instance = select_by_name("documentdb instance", name, instances, |i| i.name.as_str())?;
                new_scoped_id(region, &instance.id)
            }
            (None, None) => {
                return Err(ProviderError::new_validation(
                    "instance_id",
                    "one of instance_id or name must be set",
                ));
            }
        };

        read_as_resource(&DocumentDbInstanceResource, id.clone(), ctx, data, meta).await?;
        data.set("instance_id", id);

        Ok(())
    }
}
