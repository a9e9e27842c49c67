use ::function_name::named;
use qovery_scaleway_provider::errors::Tag;
use qovery_scaleway_provider::locality::ScwRegion;
use qovery_scaleway_provider::marshalling::{ResourceData, Value};
use qovery_scaleway_provider::provider::Provider;
use qovery_scaleway_provider::schema::Operation;
use qovery_scaleway_provider::services::scaleway::Method;
use std::sync::Arc;
use test_utilities::scaleway::{FakeObjectStorage, FakeScaleway};
use test_utilities::utilities::{TEST_PROJECT_ID, attributes, context, generate_id, init, planned_update, test_meta};
use tracing::{Level, span};

const NAMESPACE: &str = "scaleway_registry_namespace";

#[named]
#[tokio::test]
async fn registry_namespace_lifecycle() {
    let test_name = function_name!();
    init();
    let span = span!(Level::INFO, "test", name = test_name);
    let _enter = span.enter();

    // setup:
    let provider = Provider::new();
    let scaleway = Arc::new(FakeScaleway::default());
    let meta = test_meta(&scaleway, &Arc::new(FakeObjectStorage::default()));
    let name = generate_id();
    let mut data = ResourceData::new(attributes(vec![("name", Value::from(name.as_str()))]));

    // execute:
    let res = provider
        .apply(NAMESPACE, Operation::Create, &context(), &mut data, &meta)
        .await;

    // verify:
    assert!(res.is_ok());
    assert!(data.id().is_some_and(|id| id.starts_with("fr-par/")));
    assert_eq!(Some(false), data.get_bool("is_public"));
    assert_eq!(Some(TEST_PROJECT_ID), data.get_str("project_id"));
    assert_eq!(Some(format!("rg.fr-par.scw.cloud/{name}").as_str()), data.get_str("endpoint"));
    assert_eq!(Some("ready"), data.get_str("status"));

    // execute:
    let mut data = planned_update(
        &data,
        vec![
            ("description", Value::from("images of the test suite")),
            ("is_public", Value::from(true)),
        ],
    );
    let res = provider
        .apply(NAMESPACE, Operation::Update, &context(), &mut data, &meta)
        .await;

    // verify:
    assert!(res.is_ok());
    assert_eq!(1, scaleway.count_calls(Method::Patch, data.id().and_then(|id| id.split('/').nth(1)).unwrap_or_default()));
    assert_eq!(Some("images of the test suite"), data.get_str("description"));
    assert_eq!(Some(true), data.get_bool("is_public"));

    // execute:
    let res = provider
        .apply(NAMESPACE, Operation::Delete, &context(), &mut data, &meta)
        .await;

    // verify:
    assert!(res.is_ok());
    assert!(data.is_absent());
    assert_eq!(0, scaleway.namespace_count());
}

#[named]
#[tokio::test]
async fn registry_namespace_in_an_unlisted_status_keeps_the_raw_status() {
    let test_name = function_name!();
    init();
    let span = span!(Level::INFO, "test", name = test_name);
    let _enter = span.enter();

    // setup:
    let provider = Provider::new();
    let scaleway = Arc::new(FakeScaleway::default());
    let meta = test_meta(&scaleway, &Arc::new(FakeObjectStorage::default()));
    let namespace_id = scaleway.add_namespace(ScwRegion::Paris, &generate_id(), TEST_PROJECT_ID);
    scaleway.set_namespace_status(&namespace_id, "weird_state");
    let mut data = ResourceData::from_id(&format!("fr-par/{namespace_id}"));

    // execute:
    let read_res = provider.apply(NAMESPACE, Operation::Read, &context(), &mut data, &meta).await;

    // verify:
    assert!(read_res.is_ok());
    assert_eq!(Some("weird_state"), data.get_str("status"));

    // execute:
    let delete_res = provider
        .apply(NAMESPACE, Operation::Delete, &context(), &mut data, &meta)
        .await;

    // verify:
    let err = delete_res.expect_err("a namespace in an unlisted status is not deleted");
    assert_eq!(Tag::BadTerminalState, err.tag());
    assert_eq!(Some("weird_state"), err.observed_status());
    assert_eq!(1, scaleway.namespace_count());
    assert_eq!(0, scaleway.count_calls(Method::Delete, &namespace_id));
}

#[named]
#[tokio::test]
async fn registry_namespace_name_is_validated() {
    let test_name = function_name!();
    init();
    let span = span!(Level::INFO, "test", name = test_name);
    let _enter = span.enter();

    // setup:
    let provider = Provider::new();
    let scaleway = Arc::new(FakeScaleway::default());
    let meta = test_meta(&scaleway, &Arc::new(FakeObjectStorage::default()));
    let mut data = ResourceData::new(attributes(vec![("name", Value::from("Not_A_Valid_Name"))]));

    // execute:
    let res = provider
        .apply(NAMESPACE, Operation::Create, &context(), &mut data, &meta)
        .await;

    // verify:
    assert_eq!(Some(Tag::Validation), res.err().map(|e| e.tag()));
    assert_eq!(0, scaleway.count_calls(Method::Post, "/namespaces"));
}

#[named]
#[tokio::test]
async fn registry_namespace_data_source() {
    let test_name = function_name!();
    init();
    let span = span!(Level::INFO, "test", name = test_name);
    let _enter = span.enter();

    // setup:
    let provider = Provider::new();
    let scaleway = Arc::new(FakeScaleway::default());
    let meta = test_meta(&scaleway, &Arc::new(FakeObjectStorage::default()));
    let namespace_id = scaleway.add_namespace(ScwRegion::Paris, "images", TEST_PROJECT_ID);
    scaleway.add_namespace(ScwRegion::Paris, "images-legacy", TEST_PROJECT_ID);

    // execute:
    let mut by_name = ResourceData::new(attributes(vec![("name", Value::from("images"))]));
    let res = provider
        .read_data_source(NAMESPACE, &context(), &mut by_name, &meta)
        .await;

    // verify:
    assert!(res.is_ok());
    assert_eq!(Some(format!("fr-par/{namespace_id}").as_str()), by_name.id());
    assert_eq!(Some(format!("fr-par/{namespace_id}").as_str()), by_name.get_str("namespace_id"));
    assert_eq!(Some("rg.fr-par.scw.cloud/images"), by_name.get_str("endpoint"));

    // execute:
    let mut by_id = ResourceData::new(attributes(vec![("namespace_id", Value::from(namespace_id.as_str()))]));
    let res = provider
        .read_data_source(NAMESPACE, &context(), &mut by_id, &meta)
        .await;

    // verify:
    assert!(res.is_ok());
    assert_eq!(by_name.attributes(), by_id.attributes());

    // execute:
    let mut missing = ResourceData::new(attributes(vec![(
        "namespace_id",
        Value::from("fr-par/11111111-1111-1111-1111-111111111111"),
    )]));
    let res = provider
        .read_data_source(NAMESPACE, &context(), &mut missing, &meta)
        .await;

    // verify:
    assert_eq!(Some(Tag::NotFound), res.err().map(|e| e.tag()));
}
