//! Host integration surface: the registry of resource kinds and data sources, configuration of a
//! session, and dispatch of a handler invocation.

pub mod config;
mod meta;

pub use config::{ConfigLoader, ExplicitConfig, ProviderConfig};
pub use meta::ProviderMeta;

use crate::data_sources::{
    DataSource, DocumentDbDatabaseDataSource, DocumentDbInstanceDataSource, RegistryNamespaceDataSource,
};
use crate::errors::{ProviderError, ProviderResult};
use crate::logger::{LogLevel, ProviderEvent};
use crate::marshalling::ResourceData;
use crate::migrations::{StateUpgrader, state_upgraders, upgrade_state};
use crate::reconcile::OperationContext;
use crate::resources::documentdb::{
    DocumentDbAclResource, DocumentDbDatabaseResource, DocumentDbInstanceResource, DocumentDbPrivilegeResource,
    DocumentDbUserResource,
};
use crate::resources::instance_security_group_rules::InstanceSecurityGroupRulesResource;
use crate::resources::object::ObjectResource;
use crate::resources::object_bucket_policy::ObjectBucketPolicyResource;
use crate::resources::registry_namespace::RegistryNamespaceResource;
use crate::resources::Resource;
use crate::schema::{Operation, ResourceTimeouts, Schema};
use crate::unit_conversion::parse_duration;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Provider: every resource kind and data source this crate handles.
pub struct Provider {
    resources: BTreeMap<&'static str, Arc<dyn Resource>>,
    data_sources: BTreeMap<&'static str, Arc<dyn DataSource>>,
    upgraders: Vec<StateUpgrader>,
}

impl Default for Provider {
    fn default() -> Self {
        Provider::new()
    }
}

impl Provider {
    pub fn new() -> Self {
        let resources: Vec<Arc<dyn Resource>> = vec![
            Arc::new(DocumentDbInstanceResource),
            Arc::new(DocumentDbDatabaseResource),
            Arc::new(DocumentDbUserResource),
            Arc::new(DocumentDbPrivilegeResource),
            Arc::new(DocumentDbAclResource),
            Arc::new(RegistryNamespaceResource),
            Arc::new(InstanceSecurityGroupRulesResource),
            Arc::new(ObjectResource),
            Arc::new(ObjectBucketPolicyResource),
        ];
        let data_sources: Vec<Arc<dyn DataSource>> = vec![
            Arc::new(DocumentDbInstanceDataSource),
            Arc::new(DocumentDbDatabaseDataSource),
            Arc::new(RegistryNamespaceDataSource),
        ];

        Provider {
            resources: resources.into_iter().map(|r| (r.kind(), r)).collect(),
            data_sources: data_sources.into_iter().map(|d| (d.kind(), d)).collect(),
            upgraders: state_upgraders(),
        }
    }

    pub fn resource_kinds(&self) -> Vec<&'static str> {
        self.resources.keys().copied().collect()
    }

    pub fn data_source_kinds(&self) -> Vec<&'static str> {
        self.data_sources.keys().copied().collect()
    }

    pub fn resource(&self, kind: &str) -> ProviderResult<Arc<dyn Resource>> {
        self.resources
            .get(kind)
            .cloned()
            .ok_or_else(|| ProviderError::new_invalid_configuration(&format!("Unknown resource kind `{kind}`.")))
    }

    pub fn data_source(&self, kind: &str) -> ProviderResult<Arc<dyn DataSource>> {
        self.data_sources
            .get(kind)
            .cloned()
            .ok_or_else(|| ProviderError::new_invalid_configuration(&format!("Unknown data source `{kind}`.")))
    }

    pub fn resource_schema(&self, kind: &str) -> ProviderResult<Schema> {
        Ok(self.resource(kind)?.schema())
    }

    pub fn data_source_schema(&self, kind: &str) -> ProviderResult<Schema> {
        Ok(self.data_source(kind)?.schema())
    }

    /// Resolves the configuration of a session from the explicit block and the process environment.
    pub fn configure(&self, explicit: &ExplicitConfig) -> ProviderResult<ProviderMeta> {
        let config = ConfigLoader::from_process_env().load(explicit)?;
        info!(
            "provider configured: region {}, zone {}, api {}",
            config.default_region, config.default_zone, config.api_url
        );
        ProviderMeta::from_config(config)
    }

    /// Context of one invocation. `timeout` is the host's override of the timeout the resource kind
    /// declares, written as a duration string such as `20m` or `1h30m`.
    pub fn operation_context(
        &self,
        kind: &str,
        operation: Operation,
        timeout: Option<&str>,
        cancellation: CancellationToken,
    ) -> ProviderResult<OperationContext> {
        let timeouts = match (self.resources.get(kind), self.data_sources.get(kind)) {
            (Some(resource), _) => resource.timeouts(),
            (None, Some(_)) => ResourceTimeouts::default(),
            (None, None) => return Err(ProviderError::new_invalid_configuration(&format!("Unknown kind `{kind}`."))),
        };
        let timeout = match timeout {
            Some(raw) => parse_duration(raw).map_err(|e| ProviderError::new_validation("timeouts", &e.to_string()))?,
            None => timeouts.for_operation(operation),
        };

        Ok(OperationContext::new(timeout).with_cancellation(cancellation))
    }

    /// Runs one lifecycle handler of a resource kind.
    pub async fn apply(
        &self,
        kind: &str,
        operation: Operation,
        ctx: &OperationContext,
        data: &mut ResourceData,
        meta: &ProviderMeta,
    ) -> ProviderResult<()> {
        let resource = self.resource(kind)?;
        let schema = resource.schema();
        let logger = meta.logger();

        logger.log(
            LogLevel::Debug,
            ProviderEvent::new(kind, operation, format!("{operation} started")).with_scoped_id(data.id()),
        );

        let res = match operation {
            Operation::Create => {
                schema.apply_defaults(data);
                match schema.validate(data) {
                    Ok(()) => resource.create(ctx, data, meta).await,
                    Err(err) => Err(err),
                }
            }
            Operation::Read => resource.read(ctx, data, meta).await,
            Operation::Update => {
                let replaced = schema.requires_replace(data);
                if !replaced.is_empty() {
                    Err(ProviderError::new_internal(&format!(
                        "update called while {} require(s) a replacement",
                        replaced.join(", ")
                    )))
                } else {
                    match schema.validate(data) {
                        Ok(()) => resource.update(ctx, data, meta).await,
                        Err(err) => Err(err),
                    }
                }
            }
            Operation::Delete => resource.delete(ctx, data, meta).await,
        };

        match res {
            Ok(()) => {
                let message = match (operation, data.is_absent()) {
                    (Operation::Read, true) => "resource is gone, removed from state".to_string(),
                    _ => format!("{operation} done"),
                };
                logger.log(
                    LogLevel::Info,
                    ProviderEvent::new(kind, operation, message).with_scoped_id(data.id()),
                );
                Ok(())
            }
            Err(err) => {
                let err = err.with_resource(kind, data.id());
                logger.log(
                    LogLevel::Error,
                    ProviderEvent::new(kind, operation, err.to_string()).with_scoped_id(data.id()),
                );
                Err(err)
            }
        }
    }

    /// Runs the lookup of a data source.
    pub async fn read_data_source(
        &self,
        kind: &str,
        ctx: &OperationContext,
        data: &mut ResourceData,
        meta: &ProviderMeta,
    ) -> ProviderResult<()> {
        let data_source = self.data_source(kind)?;

        match data_source.read(ctx, data, meta).await {
            Ok(()) => {
                meta.logger().log(
                    LogLevel::Debug,
                    ProviderEvent::new(kind, Operation::Read, "lookup done".to_string()).with_scoped_id(data.id()),
                );
                Ok(())
            }
            Err(err) => {
                let err = err.with_resource(kind, data.id());
                meta.logger().log(
                    LogLevel::Error,
                    ProviderEvent::new(kind, Operation::Read, err.to_string()).with_scoped_id(data.id()),
                );
                Err(err)
            }
        }
    }

    /// Brings a state persisted at `from_version` to the current schema version of `kind`.
    pub fn upgrade_state(&self, kind: &str, from_version: u32, data: &mut ResourceData) -> ProviderResult<()> {
        let to_version = self.resource(kind)?.schema().version();
        upgrade_state(&self.upgraders, kind, from_version, to_version, data).map_err(|e| e.with_resource(kind, data.id()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::Tag;
    use std::time::Duration;

    #[test]
    fn test_registered_kinds() {
        let provider = Provider::new();

        assert_eq!(
            vec![
                "scaleway_documentdb_acl",
                "scaleway_documentdb_database",
                "scaleway_documentdb_instance",
                "scaleway_documentdb_privilege",
                "scaleway_documentdb_user",
                "scaleway_instance_security_group_rules",
                "scaleway_object",
                "scaleway_object_bucket_policy",
                "scaleway_registry_namespace",
            ],
            provider.resource_kinds()
        );
        assert_eq!(
            vec![
                "scaleway_documentdb_database",
                "scaleway_documentdb_instance",
                "scaleway_registry_namespace",
            ],
            provider.data_source_kinds()
        );
        assert_eq!(
            Some(Tag::InvalidConfiguration),
            provider.resource("scaleway_unknown").err().map(|e| e.tag())
        );
    }

    #[tokio::test]
    async fn test_operation_context_timeouts() {
        let provider = Provider::new();

        let ctx = provider
            .operation_context(
                "scaleway_documentdb_instance",
                Operation::Update,
                None,
                CancellationToken::new(),
            )
            .expect("known kind");
        assert_eq!(Duration::from_secs(60 * 60), ctx.timeout());

        let ctx = provider
            .operation_context(
                "scaleway_documentdb_instance",
                Operation::Update,
                Some("1h30m"),
                CancellationToken::new(),
            )
            .expect("known kind");
        assert_eq!(Duration::from_secs(90 * 60), ctx.timeout());

        let res = provider.operation_context(
            "scaleway_documentdb_instance",
            Operation::Update,
            Some("soon"),
            CancellationToken::new(),
        );
        assert_eq!(Some(Tag::Validation), res.err().map(|e| e.tag()));

        let ctx = provider
            .operation_context("scaleway_registry_namespace", Operation::Read, None, CancellationToken::new())
            .expect("known data source");
        assert_eq!(Duration::from_secs(5 * 60), ctx.timeout());
    }

    #[test]
    fn test_data_source_schema_lookup_arguments() {
        let schema = Provider::new()
            .data_source_schema("scaleway_documentdb_instance")
            .expect("known data source");

        let name = schema.attribute("name").expect("name attribute");
        assert!(!name.required);
        let node_type = schema.attribute("node_type").expect("node_type attribute");
        assert!(node_type.is_read_only());
    }
}
