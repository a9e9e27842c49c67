//! Lookup adapters. A data source finds the id of an existing entity, by id or by exact name,
//! then reads it like the managed resource does.

mod documentdb_database;
mod documentdb_instance;
mod lookup;
mod registry_namespace;

pub use documentdb_database::DocumentDbDatabaseDataSource;
pub use documentdb_instance::DocumentDbInstanceDataSource;
pub use lookup::select_by_name;
pub use registry_namespace::RegistryNamespaceDataSource;

use crate::errors::{ProviderError, ProviderResult};
use crate::marshalling::ResourceData;
use crate::provider::ProviderMeta;
use crate::reconcile::OperationContext;
use crate::resources::Resource;
use crate::schema::Schema;
use async_trait::async_trait;

#[async_trait]
pub trait DataSource: Send + Sync {
    fn kind(&self) -> &'static str;
    fn schema(&self) -> Schema;
    async fn read(&self, ctx: &OperationContext, data: &mut ResourceData, meta: &ProviderMeta) -> ProviderResult<()>;
}

/// Reads `id` with the managed resource, an entity gone in between is reported as not found.
pub(crate) async fn read_as_resource(
    resource: &dyn Resource,
    id: String,
    ctx: &OperationContext,
    data: &mut ResourceData,
    meta: &ProviderMeta,
) -> ProviderResult<()> {
    data.set_id(id.clone());
    resource.read(ctx, data, meta).await?;

    match data.is_absent() {
        true => Err(ProviderError::new_not_found(&format!("{} `{}`", resource.kind(), id))),
        false => Ok(()),
    }
}
