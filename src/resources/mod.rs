//! Lifecycle adapters, one per managed resource kind.

pub mod documentdb;
pub mod instance_security_group_rules;
pub mod object;
pub mod object_bucket_policy;
pub mod registry_namespace;

use crate::errors::{ProviderError, ProviderResult};
use crate::locality::{Scope, ScwRegion, ScwZone, parse_scoped_id};
use crate::marshalling::ResourceData;
use crate::provider::ProviderMeta;
use crate::reconcile::OperationContext;
use crate::schema::{ResourceTimeouts, Schema};
use async_trait::async_trait;

/// Resource: Create, Read, Update and Delete of one resource kind.
///
/// Read clears the id of `data` when the entity is gone instead of failing, Delete succeeds when the
/// entity is already gone.
#[async_trait]
pub trait Resource: Send + Sync {
    fn kind(&self) -> &'static str;
    fn schema(&self) -> Schema;
    fn timeouts(&self) -> ResourceTimeouts {
        ResourceTimeouts::default()
    }

    async fn create(&self, ctx: &OperationContext, data: &mut ResourceData, meta: &ProviderMeta) -> ProviderResult<()>;
    async fn read(&self, ctx: &OperationContext, data: &mut ResourceData, meta: &ProviderMeta) -> ProviderResult<()>;
    async fn update(&self, ctx: &OperationContext, data: &mut ResourceData, meta: &ProviderMeta) -> ProviderResult<()>;
    async fn delete(&self, ctx: &OperationContext, data: &mut ResourceData, meta: &ProviderMeta) -> ProviderResult<()>;
}

pub(crate) fn stored_id(data: &ResourceData) -> ProviderResult<String> {
    data.id()
        .map(|id| id.to_string())
        .ok_or_else(|| ProviderError::new_internal("the resource has no id"))
}

pub(crate) fn parse_regional_id(raw: &str) -> ProviderResult<(ScwRegion, String)> {
    match parse_scoped_id(raw)? {
        (Scope::Region(region), id) => Ok((region, id)),
        (Scope::Zone(_), _) => Err(ProviderError::new_invalid_id(raw, "expected a region, got a zone")),
    }
}

pub(crate) fn parse_zonal_id(raw: &str) -> ProviderResult<(ScwZone, String)> {
    match parse_scoped_id(raw)? {
        (Scope::Zone(zone), id) => Ok((zone, id)),
        (Scope::Region(_), _) => Err(ProviderError::new_invalid_id(raw, "expected a zone, got a region")),
    }
}

/// `Some(entity)` when found. When the entity is gone the id is cleared and `None` returned.
pub(crate) fn found<T>(res: ProviderResult<T>, data: &mut ResourceData) -> ProviderResult<Option<T>> {
    match res {
        Ok(entity) => Ok(Some(entity)),
        Err(err) if err.is_not_found() => {
            warn!("`{}` not found, removing it from state", data.id().unwrap_or_default());
            data.clear_id();
            Ok(None)
        }
        Err(err) => Err(err),
    }
}

pub(crate) fn ignore_not_found(res: ProviderResult<()>) -> ProviderResult<()> {
    match res {
        Err(err) if err.is_not_found() => Ok(()),
        res => res,
    }
}
