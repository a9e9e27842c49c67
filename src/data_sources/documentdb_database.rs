use crate::data_sources::{DataSource, read_as_resource};
use crate::errors::{ProviderError, ProviderResult};
use crate::locality::new_child_id;
use crate::marshalling::ResourceData;
use crate::provider::ProviderMeta;
use crate::reconcile::OperationContext;
use crate::resources::Resource;
use crate::resources::documentdb::{DocumentDbDatabaseResource, instance_locality};
use crate::schema::{Schema, datasource_schema_from_resource};
use async_trait::async_trait;

pub struct DocumentDbDatabaseDataSource;

#[async_trait]
impl DataSource for DocumentDbDatabaseDataSource {
    fn kind(&self) -> &'static str {
        "scaleway_documentdb_database"
    }

    fn schema(&self) -> Schema {
        datasource_schema_from_resource(&DocumentDbDatabaseResource.schema(), &["instance_id", "name", "region"])
    }

    async fn read(&self, ctx: &OperationContext, data: &mut ResourceData, meta: &ProviderMeta) -> ProviderResult<()> {
        let (region, instance_id) = instance_locality(data, meta)?;
        let name = data
            .get_str("name")
            .ok_or_else(|| ProviderError::new_validation("name", "name is required"))?;
        let id = new_child_id(region, &instance_id, &[name]);

        read_as_resource(&DocumentDbDatabaseResource, id, ctx, data, meta).await
    }
}
