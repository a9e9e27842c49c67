use ::function_name::named;
use qovery_scaleway_provider::errors::{ApiError, Tag};
use qovery_scaleway_provider::locality::ScwRegion;
use qovery_scaleway_provider::marshalling::{ResourceData, Value};
use qovery_scaleway_provider::provider::{Provider, ProviderMeta};
use qovery_scaleway_provider::schema::Operation;
use qovery_scaleway_provider::services::scaleway::Method;
use qovery_scaleway_provider::sweeper::{all_sweepers, run_sweepers};
use std::sync::Arc;
use test_utilities::scaleway::{FakeObjectStorage, FakeScaleway};
use test_utilities::utilities::{TEST_PROJECT_ID, attributes, context, generate_id, init, test_meta};
use tracing::{Level, span};

async fn create_instance(provider: &Provider, meta: &ProviderMeta, name: &str) -> String {
    let mut data = ResourceData::new(attributes(vec![
        ("name", Value::from(name)),
        ("node_type", Value::from("docdb-play2-pico")),
        ("engine", Value::from("FerretDB-1")),
        ("user_name", Value::from("u")),
        ("password", Value::from("P@ss")),
    ]));
    provider
        .apply("scaleway_documentdb_instance", Operation::Create, &context(), &mut data, meta)
        .await
        .expect("create should succeed");
    data.id().expect("instance id").to_string()
}

#[named]
#[tokio::test]
async fn sweepers_refuse_to_run_outside_a_test_account() {
    let test_name = function_name!();
    init();
    let span = span!(Level::INFO, "test", name = test_name);
    let _enter = span.enter();

    // setup:
    let scaleway = Arc::new(FakeScaleway::default());
    let meta = test_meta(&scaleway, &Arc::new(FakeObjectStorage::default()));
    scaleway.add_namespace(ScwRegion::Paris, &generate_id(), TEST_PROJECT_ID);

    for test_account in [None, Some("11111111-1111-1111-1111-111111111111")] {
        // execute:
        let res = run_sweepers(&context(), &meta, test_account, &all_sweepers()).await;

        // verify:
        assert_eq!(Some(Tag::InvalidConfiguration), res.err().map(|e| e.tag()));
        assert!(scaleway.calls().is_empty());
        assert_eq!(1, scaleway.namespace_count());
    }
}

#[named]
#[tokio::test]
async fn sweepers_delete_test_leftovers_only() {
    let test_name = function_name!();
    init();
    let span = span!(Level::INFO, "test", name = test_name);
    let _enter = span.enter();

    // setup:
    let provider = Provider::new();
    let scaleway = Arc::new(FakeScaleway::default());
    let meta = test_meta(&scaleway, &Arc::new(FakeObjectStorage::default()));

    let leftover_instance = create_instance(&provider, &meta, &generate_id()).await;
    let kept_instance = create_instance(&provider, &meta, "production").await;
    let mut database = ResourceData::new(attributes(vec![
        ("instance_id", Value::from(leftover_instance.as_str())),
        ("name", Value::from("db")),
    ]));
    provider
        .apply("scaleway_documentdb_database", Operation::Create, &context(), &mut database, &meta)
        .await
        .expect("create should succeed");
    let leftover_uuid = leftover_instance.trim_start_matches("fr-par/").to_string();
    scaleway.add_managed_database(&leftover_uuid, "admin");

    let leftover_namespace = scaleway.add_namespace(ScwRegion::Paris, &generate_id(), TEST_PROJECT_ID);
    scaleway.add_namespace(ScwRegion::Paris, "images", TEST_PROJECT_ID);
    scaleway.add_namespace(ScwRegion::Paris, &generate_id(), "22222222-2222-2222-2222-222222222222");

    let leftover_security_group = scaleway.add_security_group("fr-par-1", &generate_id(), TEST_PROJECT_ID, false);
    let default_security_group = scaleway.add_security_group("fr-par-1", "tf-test-default", TEST_PROJECT_ID, true);
    let kept_security_group = scaleway.add_security_group("fr-par-1", "web", TEST_PROJECT_ID, false);

    // execute:
    let reports = run_sweepers(&context(), &meta, Some(TEST_PROJECT_ID), &all_sweepers())
        .await
        .expect("sweepers should run");

    // verify:
    let names: Vec<&str> = reports.iter().map(|(name, _)| *name).collect();
    assert_eq!(
        vec![
            "scaleway_documentdb_instance",
            "scaleway_registry_namespace",
            "scaleway_instance_security_group",
        ],
        names
    );
    for (name, report) in &reports {
        assert!(report.failed.is_empty(), "{name} failed to sweep {:?}", report.failed);
    }

    let (_, documentdb) = &reports[0];
    assert_eq!(vec![leftover_instance.clone()], documentdb.deleted);
    assert!(scaleway.instance(&leftover_uuid).is_none());
    assert!(
        scaleway
            .instance(kept_instance.trim_start_matches("fr-par/"))
            .is_some()
    );
    // databases created by the cloud are left to the instance deletion
    assert_eq!(1, scaleway.count_calls(Method::Delete, "/databases/db"));
    assert_eq!(0, scaleway.count_calls(Method::Delete, "/databases/admin"));

    let (_, registry) = &reports[1];
    assert_eq!(vec![format!("fr-par/{leftover_namespace}")], registry.deleted);
    assert_eq!(2, scaleway.namespace_count());

    let (_, security_groups) = &reports[2];
    assert_eq!(vec![format!("fr-par-1/{leftover_security_group}")], security_groups.deleted);
    assert!(!scaleway.security_group_exists(&leftover_security_group));
    assert!(scaleway.security_group_exists(&default_security_group));
    assert!(scaleway.security_group_exists(&kept_security_group));
}

#[named]
#[tokio::test]
async fn sweepers_skip_regions_without_the_product() {
    let test_name = function_name!();
    init();
    let span = span!(Level::INFO, "test", name = test_name);
    let _enter = span.enter();

    // setup:
    let scaleway = Arc::new(FakeScaleway::default());
    let meta = test_meta(&scaleway, &Arc::new(FakeObjectStorage::default()));
    let leftover_namespace = scaleway.add_namespace(ScwRegion::Paris, &generate_id(), TEST_PROJECT_ID);
    scaleway.fail_next(
        Method::Get,
        "/document-db/v1beta1/regions/pl-waw/instances",
        ApiError::new(501, Some("not_implemented"), "document db is not available in this region"),
    );

    // execute:
    let reports = run_sweepers(&context(), &meta, Some(TEST_PROJECT_ID), &all_sweepers()).await;

    // verify:
    let reports = reports.expect("sweepers should go on in the other regions");
    assert_eq!(3, reports.len());
    let (_, registry) = &reports[1];
    assert_eq!(vec![format!("fr-par/{leftover_namespace}")], registry.deleted);
    assert_eq!(0, scaleway.namespace_count());
}

#[named]
#[tokio::test]
async fn sweepers_stop_on_other_listing_errors() {
    let test_name = function_name!();
    init();
    let span = span!(Level::INFO, "test", name = test_name);
    let _enter = span.enter();

    // setup:
    let scaleway = Arc::new(FakeScaleway::default());
    let meta = test_meta(&scaleway, &Arc::new(FakeObjectStorage::default()));
    scaleway.add_namespace(ScwRegion::Paris, &generate_id(), TEST_PROJECT_ID);
    scaleway.fail_next(
        Method::Get,
        "/document-db/v1beta1/regions/fr-par/instances",
        ApiError::new(403, Some("permissions_denied"), "insufficient permissions"),
    );

    // execute:
    let res = run_sweepers(&context(), &meta, Some(TEST_PROJECT_ID), &all_sweepers()).await;

    // verify:
    assert_eq!(Some(Tag::Forbidden), res.err().map(|e| e.tag()));
    assert_eq!(1, scaleway.namespace_count());
}

#[cfg(feature = "test-scw-sweepers")]
#[named]
#[tokio::test]
async fn sweep_test_account() {
    use qovery_scaleway_provider::provider::ExplicitConfig;
    use qovery_scaleway_provider::sweeper::run_all_sweepers_from_env;

    let test_name = function_name!();
    init();
    let span = span!(Level::INFO, "test", name = test_name);
    let _enter = span.enter();

    // setup:
    let meta = Provider::new()
        .configure(&ExplicitConfig::default())
        .expect("credentials should be configured");

    // execute:
    let reports = run_all_sweepers_from_env(&context(), &meta).await;

    // verify:
    let reports = reports.expect("sweepers should run");
    for (name, report) in reports {
        assert!(report.failed.is_empty(), "{name} failed to sweep {:?}", report.failed);
    }
}
