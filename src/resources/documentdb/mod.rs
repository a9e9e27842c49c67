//! Managed DocumentDB: the instance and the resources living inside it.

mod acl;
mod database;
mod instance;
mod privilege;
mod user;

pub use acl::DocumentDbAclResource;
pub use database::DocumentDbDatabaseResource;
pub use instance::DocumentDbInstanceResource;
pub use privilege::DocumentDbPrivilegeResource;
pub use user::DocumentDbUserResource;

use crate::errors::{ProviderError, ProviderResult};
use crate::locality::{ScwRegion, is_uuid};
use crate::marshalling::ResourceData;
use crate::provider::ProviderMeta;
use crate::reconcile::{OperationContext, default_wait_retry_interval, wait_for};
use crate::resources::parse_regional_id;
use crate::services::scaleway::DocumentDbApi;
use crate::services::scaleway::documentdb::Instance;

/// Waits for the instance to be ready, mutations of a busy instance are refused by the API.
pub(crate) async fn wait_for_instance(
    ctx: &OperationContext,
    api: &DocumentDbApi,
    region: ScwRegion,
    instance_id: &str,
) -> ProviderResult<Instance> {
    wait_for(
        ctx,
        default_wait_retry_interval(),
        move || api.get_instance(region, instance_id),
        |instance: &Instance| instance.status.class(),
    )
    .await
}

/// Region and uuid of the parent instance referenced by `instance_id`, scoped or not.
pub(crate) fn instance_locality(data: &ResourceData, meta: &ProviderMeta) -> ProviderResult<(ScwRegion, String)> {
    let raw = data
        .get_str("instance_id")
        .ok_or_else(|| ProviderError::new_validation("instance_id", "instance_id is required"))?;

    match is_uuid(raw) {
        true => Ok((meta.region(data)?, raw.to_string())),
        false => parse_regional_id(raw),
    }
}
