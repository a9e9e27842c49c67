use crate::scaleway::{FakeObjectStorage, FakeScaleway};
use qovery_scaleway_provider::locality::ScwRegion;
use qovery_scaleway_provider::logger::{StdIoLogger, init_tracing};
use qovery_scaleway_provider::marshalling::{ResourceData, Value};
use qovery_scaleway_provider::provider::{ProviderConfig, ProviderMeta};
use qovery_scaleway_provider::reconcile::{OperationContext, set_default_wait_retry_interval};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

pub const TEST_PROJECT_ID: &str = "6170692e-7363-616c-6577-61792e636f6d";

pub fn init() {
    init_tracing(false);
    // the fake cloud answers instantly, no need to wait between polls
    set_default_wait_retry_interval(Some(Duration::ZERO));
}

/// Name following the prefix sweepers are allowed to delete.
pub fn generate_id() -> String {
    format!("tf-test-{}", &Uuid::new_v4().simple().to_string()[..12])
}

pub fn test_config() -> ProviderConfig {
    ProviderConfig {
        access_key: Some("SCWXXXXXXXXXXXXXXXXX".to_string()),
        secret_key: Some(Uuid::new_v4().to_string()),
        default_project_id: Some(TEST_PROJECT_ID.to_string()),
        default_region: ScwRegion::Paris,
        default_zone: ScwRegion::Paris.default_zone(),
        ..Default::default()
    }
}

pub fn test_meta(scaleway: &Arc<FakeScaleway>, object_storage: &Arc<FakeObjectStorage>) -> ProviderMeta {
    ProviderMeta::new(
        test_config(),
        scaleway.clone(),
        object_storage.clone(),
        Box::new(StdIoLogger::new()),
    )
}

pub fn context() -> OperationContext {
    OperationContext::new(Duration::from_secs(60))
}

/// Attributes out of `(name, value)` pairs.
pub fn attributes(values: Vec<(&str, Value)>) -> BTreeMap<String, Value> {
    values.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
}

/// State as persisted after an apply, the planned values being `changes` applied over it.
pub fn planned_update(data: &ResourceData, changes: Vec<(&str, Value)>) -> ResourceData {
    let prior = data.attributes().clone();
    let mut planned = prior.clone();
    planned.extend(attributes(changes));

    ResourceData::with_planned(data.id().unwrap_or_default(), prior, planned)
}
