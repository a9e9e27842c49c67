//! Housekeeping of test leftovers. Sweepers delete every entity whose name carries a test prefix,
//! in every region or zone, and only run against an account explicitly marked as a test account.

mod documentdb;
mod instance_security_group;
mod registry_namespace;

pub use documentdb::DocumentDbInstanceSweeper;
pub use instance_security_group::InstanceSecurityGroupSweeper;
pub use registry_namespace::RegistryNamespaceSweeper;

use crate::constants::{SCW_SWEEP_TEST_ACCOUNT, SWEEPABLE_NAME_PREFIXES};
use crate::errors::{ProviderError, ProviderResult, is_feature_not_supported};
use crate::provider::ProviderMeta;
use crate::reconcile::OperationContext;
use async_trait::async_trait;

/// Scoped ids a sweeper went through.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub deleted: Vec<String>,
    /// default entities and entities without a test prefix
    pub skipped: Vec<String>,
    pub failed: Vec<String>,
}

impl SweepReport {
    /// Records the outcome of a deletion, an entity already gone counts as deleted.
    pub(crate) fn record(&mut self, scoped_id: String, res: ProviderResult<()>) {
        match res {
            Ok(()) => self.deleted.push(scoped_id),
            Err(err) if err.is_not_found() => self.deleted.push(scoped_id),
            Err(err) => {
                error!("cannot sweep `{}`: {}", scoped_id, err);
                self.failed.push(scoped_id);
            }
        }
    }
}

#[async_trait]
pub trait Sweeper: Send + Sync {
    /// Resource kind swept.
    fn name(&self) -> &'static str;
    async fn sweep(&self, ctx: &OperationContext, meta: &ProviderMeta, project_id: &str) -> ProviderResult<SweepReport>;
}

/// Entities listed by a sweeper in one region or zone, `None` when the product is not offered there.
pub(crate) fn listed_or_unsupported<T>(locality: &str, res: ProviderResult<Vec<T>>) -> ProviderResult<Option<Vec<T>>> {
    match res {
        Ok(entities) => Ok(Some(entities)),
        Err(err) if err.cloud_error().is_some_and(is_feature_not_supported) => {
            warn!("not sweeping {}, the product is not available there: {}", locality, err);
            Ok(None)
        }
        Err(err) => Err(err),
    }
}

pub fn is_sweepable_name(name: &str) -> bool {
    SWEEPABLE_NAME_PREFIXES.iter().any(|prefix| name.starts_with(prefix))
}

/// Sweepers, parents after the kinds they may contain.
pub fn all_sweepers() -> Vec<Box<dyn Sweeper>> {
    vec![
        Box::new(DocumentDbInstanceSweeper),
        Box::new(RegistryNamespaceSweeper),
        Box::new(InstanceSecurityGroupSweeper),
    ]
}

/// Returns the project to sweep, only when `test_account` names the configured project.
pub fn check_test_account(meta: &ProviderMeta, test_account: Option<&str>) -> ProviderResult<String> {
    let project_id = meta.config().default_project_id.as_deref().ok_or_else(|| {
        ProviderError::new_invalid_configuration("Sweepers need a default project id to be configured.")
    })?;

    match test_account {
        Some(account) if account == project_id => Ok(project_id.to_string()),
        _ => Err(ProviderError::new_invalid_configuration(&format!(
            "Sweepers refuse to run: {SCW_SWEEP_TEST_ACCOUNT} must be set to the configured project id."
        ))),
    }
}

/// Runs `sweepers` one after the other, the account gate is checked first.
pub async fn run_sweepers(
    ctx: &OperationContext,
    meta: &ProviderMeta,
    test_account: Option<&str>,
    sweepers: &[Box<dyn Sweeper>],
) -> ProviderResult<Vec<(&'static str, SweepReport)>> {
    let project_id = check_test_account(meta, test_account)?;
    let mut reports = Vec::with_capacity(sweepers.len());

    for sweeper in sweepers {
        info!("sweeping {} in project {}", sweeper.name(), project_id);
        let report = sweeper.sweep(ctx, meta, &project_id).await?;
        info!(
            "{}: {} deleted, {} skipped, {} failed",
            sweeper.name(),
            report.deleted.len(),
            report.skipped.len(),
            report.failed.len()
        );
        reports.push((sweeper.name(), report));
    }

    Ok(reports)
}

/// Same as [`run_sweepers`] with every sweeper, the test account being read from the environment.
pub async fn run_all_sweepers_from_env(
    ctx: &OperationContext,
    meta: &ProviderMeta,
) -> ProviderResult<Vec<(&'static str, SweepReport)>> {
    let test_account = std::env::var(SCW_SWEEP_TEST_ACCOUNT).ok();
    run_sweepers(ctx, meta, test_account.as_deref(), &all_sweepers()).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{ApiError, Tag};

    #[test]
    fn test_is_sweepable_name() {
        struct TestCase<'a> {
            name: &'a str,
            expected: bool,
        }

        let test_cases = vec![
            TestCase {
                name: "tf-test-documentdb",
                expected: true,
            },
            TestCase {
                name: "test-namespace",
                expected: true,
            },
            TestCase {
                name: "production",
                expected: false,
            },
            TestCase {
                name: "my-test-db",
                expected: false,
            },
        ];

        for tc in test_cases {
            assert_eq!(tc.expected, is_sweepable_name(tc.name), "name: {}", tc.name);
        }
    }

    #[test]
    fn test_listed_or_unsupported() {
        let listed = listed_or_unsupported("fr-par", Ok(vec!["a"])).expect("listing succeeded");
        assert_eq!(Some(vec!["a"]), listed);

        let unsupported: ProviderResult<Vec<&str>> = Err(ProviderError::new_from_api(ApiError::new(
            501,
            Some("not_implemented"),
            "document db is not available in this region",
        )));
        assert_eq!(None, listed_or_unsupported("pl-waw", unsupported).expect("region is skipped"));

        let denied: ProviderResult<Vec<&str>> = Err(ProviderError::new_from_api(ApiError::new(403, None, "denied")));
        assert_eq!(
            Some(Tag::Forbidden),
            listed_or_unsupported("pl-waw", denied).err().map(|e| e.tag())
        );
    }

    #[test]
    fn test_report_record() {
        let mut report = SweepReport::default();

        report.record("fr-par/a".to_string(), Ok(()));
        report.record("fr-par/b".to_string(), Err(ProviderError::new_not_found("b")));
        report.record("fr-par/c".to_string(), Err(ProviderError::new_internal("boom")));

        assert_eq!(vec!["fr-par/a".to_string(), "fr-par/b".to_string()], report.deleted);
        assert_eq!(vec!["fr-par/c".to_string()], report.failed);
    }
}
