use ::function_name::named;
use qovery_scaleway_provider::errors::{ApiError, Tag};
use qovery_scaleway_provider::marshalling::{ResourceData, Value};
use qovery_scaleway_provider::provider::{Provider, ProviderMeta};
use qovery_scaleway_provider::resources::Resource;
use qovery_scaleway_provider::resources::documentdb::DocumentDbInstanceResource;
use qovery_scaleway_provider::schema::Operation;
use qovery_scaleway_provider::services::scaleway::Method;
use std::sync::Arc;
use test_utilities::scaleway::{FakeObjectStorage, FakeScaleway};
use test_utilities::utilities::{attributes, context, init, planned_update, test_meta};
use tracing::{Level, span};

const INSTANCE: &str = "scaleway_documentdb_instance";

struct Setup {
    provider: Provider,
    scaleway: Arc<FakeScaleway>,
    meta: ProviderMeta,
}

fn setup() -> Setup {
    init();
    let scaleway = Arc::new(FakeScaleway::default());
    let meta = test_meta(&scaleway, &Arc::new(FakeObjectStorage::default()));

    Setup {
        provider: Provider::new(),
        scaleway,
        meta,
    }
}

fn instance_inputs(name: &str) -> Vec<(&str, Value)> {
    vec![
        ("name", Value::from(name)),
        ("node_type", Value::from("docdb-play2-pico")),
        ("engine", Value::from("FerretDB-1")),
        ("user_name", Value::from("u")),
        ("password", Value::from("P@ss")),
        ("volume_size_in_gb", Value::from(20i64)),
    ]
}

async fn apply(setup: &Setup, kind: &str, operation: Operation, data: &mut ResourceData) -> Result<(), Tag> {
    setup
        .provider
        .apply(kind, operation, &context(), data, &setup.meta)
        .await
        .map_err(|e| e.tag())
}

async fn create(setup: &Setup, kind: &str, inputs: Vec<(&str, Value)>) -> ResourceData {
    let mut data = ResourceData::new(attributes(inputs));
    apply(setup, kind, Operation::Create, &mut data)
        .await
        .expect("create should succeed");
    data
}

fn instance_uuid(data: &ResourceData) -> String {
    data.id()
        .and_then(|id| id.split('/').nth(1))
        .expect("instance id")
        .to_string()
}

#[named]
#[tokio::test]
async fn create_and_read_documentdb_instance() {
    let test_name = function_name!();
    let setup = setup();
    let span = span!(Level::INFO, "test", name = test_name);
    let _enter = span.enter();

    // setup:
    let inputs = instance_inputs("test");

    // execute:
    let mut data = create(&setup, INSTANCE, inputs.clone()).await;

    // verify:
    let id = data.id().expect("instance id").to_string();
    assert!(id.starts_with("fr-par/"));
    assert_eq!(Some("ready"), data.get_str("status"));
    assert_eq!(Some("51.159.0.10"), data.get_str("endpoint_ip"));

    apply(&setup, INSTANCE, Operation::Read, &mut data)
        .await
        .expect("read should succeed");
    for (name, value) in inputs {
        assert_eq!(&value, data.get(name), "attribute {name} should round-trip");
    }
    assert_eq!(Some(20), data.get_i64("volume_size_in_gb"));
    assert_eq!(Some(id.as_str()), data.id());
}

#[named]
#[tokio::test]
async fn upgrade_documentdb_instance_node_type() {
    let test_name = function_name!();
    let setup = setup();
    let span = span!(Level::INFO, "test", name = test_name);
    let _enter = span.enter();

    // setup:
    let data = create(&setup, INSTANCE, instance_inputs("test")).await;
    let mut data = planned_update(&data, vec![("node_type", Value::from("docdb-play2-nano"))]);

    // execute:
    let res = apply(&setup, INSTANCE, Operation::Update, &mut data).await;

    // verify:
    assert_eq!(Ok(()), res);
    assert_eq!(1, setup.scaleway.count_calls(Method::Post, "/upgrade"));
    assert_eq!(0, setup.scaleway.count_calls(Method::Patch, &instance_uuid(&data)));
    assert_eq!(Some("docdb-play2-nano"), data.get_str("node_type"));
    assert_eq!(Some("ready"), data.get_str("status"));
    assert_eq!(Some(20), data.get_i64("volume_size_in_gb"));
}

#[named]
#[tokio::test]
async fn shrinking_documentdb_volume_is_rejected() {
    let test_name = function_name!();
    let setup = setup();
    let span = span!(Level::INFO, "test", name = test_name);
    let _enter = span.enter();

    // setup:
    let data = create(&setup, INSTANCE, instance_inputs("test")).await;
    let mut data = planned_update(&data, vec![("volume_size_in_gb", Value::from(10i64))]);

    // execute:
    let res = setup
        .provider
        .apply(INSTANCE, Operation::Update, &context(), &mut data, &setup.meta)
        .await;

    // verify:
    let err = res.expect_err("shrinking the volume must fail");
    assert_eq!(Tag::Validation, err.tag());
    assert!(err.message().contains("volume_size_in_gb cannot be decreased"));
    assert_eq!(Some(INSTANCE), err.resource_kind());
    assert_eq!(0, setup.scaleway.count_calls(Method::Post, "/upgrade"));
}

#[named]
#[tokio::test]
async fn update_documentdb_instance_coalesces_metadata_and_serializes_upgrades() {
    let test_name = function_name!();
    let setup = setup();
    let span = span!(Level::INFO, "test", name = test_name);
    let _enter = span.enter();

    // setup:
    let data = create(&setup, INSTANCE, instance_inputs("test")).await;
    let mut data = planned_update(
        &data,
        vec![
            ("name", Value::from("renamed")),
            ("tags", Value::from(vec![Value::from("a"), Value::from("b")])),
            ("is_ha_cluster", Value::from(true)),
            ("volume_size_in_gb", Value::from(30i64)),
            ("password", Value::from("N3w-P@ss")),
        ],
    );

    // execute:
    let res = apply(&setup, INSTANCE, Operation::Update, &mut data).await;

    // verify:
    assert_eq!(Ok(()), res);
    let instance_id = instance_uuid(&data);
    assert_eq!(1, setup.scaleway.count_calls(Method::Patch, &instance_id));
    let upgrades: Vec<serde_json::Value> = setup
        .scaleway
        .calls()
        .into_iter()
        .filter(|c| c.method == Method::Post && c.path.ends_with("/upgrade"))
        .filter_map(|c| c.body)
        .collect();
    assert_eq!(
        vec![
            serde_json::json!({ "enable_ha": true }),
            serde_json::json!({ "volume_size": 30_000_000_000u64 }),
        ],
        upgrades
    );
    assert_eq!(Some("renamed"), data.get_str("name"));
    assert_eq!(Some(true), data.get_bool("is_ha_cluster"));
    assert_eq!(Some(30), data.get_i64("volume_size_in_gb"));
    assert_eq!(
        Some("N3w-P@ss".to_string()),
        setup.scaleway.user_password(&instance_id, "u")
    );
}

#[named]
#[tokio::test]
async fn documentdb_instance_settings_are_applied_after_creation() {
    let test_name = function_name!();
    let setup = setup();
    let span = span!(Level::INFO, "test", name = test_name);
    let _enter = span.enter();

    // setup:
    let mut inputs = instance_inputs("test");
    inputs.push((
        "settings",
        Value::from(btreemap! { "maxConns".to_string() => Value::from("200") }),
    ));

    // execute:
    let data = create(&setup, INSTANCE, inputs).await;

    // verify:
    assert_eq!(1, setup.scaleway.count_calls(Method::Put, "/settings"));
    assert_eq!(
        &Value::from(btreemap! { "maxConns".to_string() => Value::from("200") }),
        data.get("settings")
    );
}

#[named]
#[tokio::test]
async fn delete_documentdb_instance_waits_for_absence() {
    let test_name = function_name!();
    let setup = setup();
    let span = span!(Level::INFO, "test", name = test_name);
    let _enter = span.enter();

    // setup:
    let mut data = create(&setup, INSTANCE, instance_inputs("test")).await;
    let instance_id = instance_uuid(&data);
    setup.scaleway.fail_next(
        Method::Delete,
        &instance_id,
        ApiError::new(409, Some("transient_state"), "instance is busy"),
    );

    // execute:
    let res = apply(&setup, INSTANCE, Operation::Delete, &mut data).await;

    // verify:
    assert_eq!(Ok(()), res);
    assert!(data.is_absent());
    assert!(setup.scaleway.instance(&instance_id).is_none());
    assert_eq!(2, setup.scaleway.count_calls(Method::Delete, &instance_id));

    // deleting again is a no-op
    let mut again = ResourceData::from_id(&format!("fr-par/{instance_id}"));
    assert_eq!(Ok(()), apply(&setup, INSTANCE, Operation::Delete, &mut again).await);
}

#[named]
#[tokio::test]
async fn upgrading_a_documentdb_instance_in_error_fails_with_its_status() {
    let test_name = function_name!();
    let setup = setup();
    let span = span!(Level::INFO, "test", name = test_name);
    let _enter = span.enter();

    // setup:
    let data = create(&setup, INSTANCE, instance_inputs("test")).await;
    let instance_id = instance_uuid(&data);
    setup.scaleway.set_instance_status(&instance_id, "error", 0);
    let mut data = planned_update(&data, vec![("node_type", Value::from("docdb-play2-nano"))]);

    // execute:
    let res = setup
        .provider
        .apply(INSTANCE, Operation::Update, &context(), &mut data, &setup.meta)
        .await;

    // verify:
    let err = res.expect_err("an instance in error cannot be upgraded");
    assert_eq!(Tag::BadTerminalState, err.tag());
    assert_eq!(Some("error"), err.observed_status());
}

#[named]
#[tokio::test]
async fn upgrading_a_documentdb_instance_waits_while_it_is_updating() {
    let test_name = function_name!();
    let setup = setup();
    let span = span!(Level::INFO, "test", name = test_name);
    let _enter = span.enter();

    // setup:
    let data = create(&setup, INSTANCE, instance_inputs("test")).await;
    let instance_id = instance_uuid(&data);
    setup.scaleway.set_instance_status(&instance_id, "updating", 3);
    let mut data = planned_update(&data, vec![("node_type", Value::from("docdb-play2-nano"))]);

    // execute:
    let res = apply(&setup, INSTANCE, Operation::Update, &mut data).await;

    // verify:
    assert_eq!(Ok(()), res);
    // refused while updating, then issued again once the instance is ready
    assert_eq!(2, setup.scaleway.count_calls(Method::Post, "/upgrade"));
    assert_eq!(Some("docdb-play2-nano"), data.get_str("node_type"));
    assert_eq!(Some("ready"), data.get_str("status"));
}

#[named]
#[tokio::test]
async fn documentdb_instance_in_an_unlisted_status_keeps_the_raw_status() {
    let test_name = function_name!();
    let setup = setup();
    let span = span!(Level::INFO, "test", name = test_name);
    let _enter = span.enter();

    // setup:
    let data = create(&setup, INSTANCE, instance_inputs("test")).await;
    let instance_id = instance_uuid(&data);
    setup.scaleway.set_instance_status(&instance_id, "weird_state", 0);

    // execute:
    let mut read = ResourceData::from_id(&format!("fr-par/{instance_id}"));
    let read_res = apply(&setup, INSTANCE, Operation::Read, &mut read).await;
    let mut data = planned_update(&data, vec![("node_type", Value::from("docdb-play2-nano"))]);
    let update_res = setup
        .provider
        .apply(INSTANCE, Operation::Update, &context(), &mut data, &setup.meta)
        .await;

    // verify:
    assert_eq!(Ok(()), read_res);
    assert_eq!(Some("weird_state"), read.get_str("status"));

    let err = update_res.expect_err("an instance in an unlisted status cannot be upgraded");
    assert_eq!(Tag::BadTerminalState, err.tag());
    assert_eq!(Some("weird_state"), err.observed_status());
    let instance = setup.scaleway.instance(&instance_id).expect("instance still exists");
    assert_eq!("docdb-play2-pico", instance["node_type"]);
}

#[named]
#[tokio::test]
async fn privilege_survives_password_change_and_disappears_with_user() {
    let test_name = function_name!();
    let setup = setup();
    let span = span!(Level::INFO, "test", name = test_name);
    let _enter = span.enter();

    // setup:
    let instance = create(&setup, INSTANCE, instance_inputs("test")).await;
    let instance_id = instance.id().expect("instance id").to_string();
    let _database = create(
        &setup,
        "scaleway_documentdb_database",
        vec![("instance_id", Value::from(instance_id.as_str())), ("name", Value::from("db"))],
    )
    .await;
    // the instance is still configuring after the database creation
    let user = create(
        &setup,
        "scaleway_documentdb_user",
        vec![
            ("instance_id", Value::from(instance_id.as_str())),
            ("name", Value::from("foo")),
            ("password", Value::from("F00-P@ss")),
        ],
    )
    .await;
    let mut privilege = create(
        &setup,
        "scaleway_documentdb_privilege",
        vec![
            ("instance_id", Value::from(instance_id.as_str())),
            ("database_name", Value::from("db")),
            ("user_name", Value::from("foo")),
            ("permission", Value::from("all")),
        ],
    )
    .await;
    assert_eq!(Some(format!("{instance_id}/db/foo").as_str()), privilege.id());

    // execute:
    let mut user = planned_update(&user, vec![("password", Value::from("N3w-F00-P@ss"))]);
    apply(&setup, "scaleway_documentdb_user", Operation::Update, &mut user)
        .await
        .expect("password change should succeed");
    apply(&setup, "scaleway_documentdb_privilege", Operation::Read, &mut privilege)
        .await
        .expect("read should succeed");

    // verify:
    assert_eq!(Some("all"), privilege.get_str("permission"));

    // execute:
    apply(&setup, "scaleway_documentdb_user", Operation::Delete, &mut user)
        .await
        .expect("user deletion should succeed");
    let res = apply(&setup, "scaleway_documentdb_privilege", Operation::Read, &mut privilege).await;

    // verify:
    assert_eq!(Ok(()), res);
    assert!(privilege.is_absent());
}

#[named]
#[tokio::test]
async fn delete_privilege_of_a_deleted_database_succeeds() {
    let test_name = function_name!();
    let setup = setup();
    let span = span!(Level::INFO, "test", name = test_name);
    let _enter = span.enter();

    // setup:
    let instance = create(&setup, INSTANCE, instance_inputs("test")).await;
    let instance_id = instance.id().expect("instance id").to_string();
    let mut database = create(
        &setup,
        "scaleway_documentdb_database",
        vec![("instance_id", Value::from(instance_id.as_str())), ("name", Value::from("db"))],
    )
    .await;
    let mut privilege = create(
        &setup,
        "scaleway_documentdb_privilege",
        vec![
            ("instance_id", Value::from(instance_id.as_str())),
            ("database_name", Value::from("db")),
            ("user_name", Value::from("u")),
            ("permission", Value::from("readonly")),
        ],
    )
    .await;
    apply(&setup, "scaleway_documentdb_database", Operation::Delete, &mut database)
        .await
        .expect("database deletion should succeed");

    // execute:
    let res = apply(&setup, "scaleway_documentdb_privilege", Operation::Delete, &mut privilege).await;

    // verify:
    assert_eq!(Ok(()), res);
    assert!(privilege.is_absent());
    assert!(setup.scaleway.privileges(&instance_uuid(&instance)).is_empty());
}

#[named]
#[tokio::test]
async fn documentdb_acl_rules_keep_their_order() {
    let test_name = function_name!();
    let setup = setup();
    let span = span!(Level::INFO, "test", name = test_name);
    let _enter = span.enter();

    // setup:
    let instance = create(&setup, INSTANCE, instance_inputs("test")).await;
    let instance_id = instance.id().expect("instance id").to_string();
    let rules = Value::from(vec![
        Value::from(btreemap! {
            "ip".to_string() => Value::from("10.0.0.0/8"),
            "description".to_string() => Value::from("private"),
        }),
        Value::from(btreemap! {
            "ip".to_string() => Value::from("1.2.3.4/32"),
            "description".to_string() => Value::from("office"),
        }),
    ]);

    // execute:
    let mut acl = create(
        &setup,
        "scaleway_documentdb_acl",
        vec![("instance_id", Value::from(instance_id.as_str())), ("acl_rules", rules.clone())],
    )
    .await;

    // verify:
    assert_eq!(Some(instance_id.as_str()), acl.id());
    assert_eq!(&rules, acl.get("acl_rules"));

    // execute:
    apply(&setup, "scaleway_documentdb_acl", Operation::Delete, &mut acl)
        .await
        .expect("delete should succeed");

    // verify:
    assert!(acl.is_absent());
    assert_eq!(1, setup.scaleway.count_calls(Method::Delete, "/acls"));
}

#[named]
#[tokio::test]
async fn documentdb_instance_data_source_by_name() {
    let test_name = function_name!();
    let setup = setup();
    let span = span!(Level::INFO, "test", name = test_name);
    let _enter = span.enter();

    // setup:
    create(&setup, INSTANCE, instance_inputs("alpha")).await;
    create(&setup, INSTANCE, instance_inputs("alpha")).await;
    let beta = create(&setup, INSTANCE, instance_inputs("beta")).await;
    create(&setup, INSTANCE, instance_inputs("beta-2")).await;

    // execute:
    let mut ambiguous = ResourceData::new(attributes(vec![("name", Value::from("alpha"))]));
    let res = setup
        .provider
        .read_data_source(INSTANCE, &context(), &mut ambiguous, &setup.meta)
        .await;

    // verify:
    assert_eq!(Some(Tag::Ambiguous), res.err().map(|e| e.tag()));

    // execute:
    let mut unknown = ResourceData::new(attributes(vec![("name", Value::from("gamma"))]));
    let res = setup
        .provider
        .read_data_source(INSTANCE, &context(), &mut unknown, &setup.meta)
        .await;

    // verify:
    assert_eq!(Some(Tag::NotFound), res.err().map(|e| e.tag()));

    // execute:
    let mut by_name = ResourceData::new(attributes(vec![("name", Value::from("beta"))]));
    setup
        .provider
        .read_data_source(INSTANCE, &context(), &mut by_name, &setup.meta)
        .await
        .expect("unique name should be found");
    let beta_id = beta.id().expect("instance id");
    let mut managed = ResourceData::from_id(beta_id);
    DocumentDbInstanceResource
        .read(&context(), &mut managed, &setup.meta)
        .await
        .expect("read should succeed");

    // verify:
    assert_eq!(Some(beta_id), by_name.id());
    assert_eq!(Some(beta_id), by_name.get_str("instance_id"));
    for (name, value) in managed.attributes() {
        assert_eq!(value, by_name.get(name), "attribute {name} should match the managed resource");
    }
}

#[named]
#[tokio::test]
async fn documentdb_database_data_source() {
    let test_name = function_name!();
    let setup = setup();
    let span = span!(Level::INFO, "test", name = test_name);
    let _enter = span.enter();

    // setup:
    let instance = create(&setup, INSTANCE, instance_inputs("test")).await;
    let instance_uuid = instance_uuid(&instance);
    create(
        &setup,
        "scaleway_documentdb_database",
        vec![("instance_id", Value::from(instance_uuid.as_str())), ("name", Value::from("db"))],
    )
    .await;

    // execute:
    let mut data = ResourceData::new(attributes(vec![
        ("instance_id", Value::from(instance_uuid.as_str())),
        ("name", Value::from("db")),
    ]));
    let res = setup
        .provider
        .read_data_source("scaleway_documentdb_database", &context(), &mut data, &setup.meta)
        .await;

    // verify:
    assert!(res.is_ok());
    assert_eq!(Some(format!("fr-par/{instance_uuid}/db").as_str()), data.id());
    assert_eq!(Some(false), data.get_bool("managed"));

    // execute:
    let mut missing = ResourceData::new(attributes(vec![
        ("instance_id", Value::from(instance_uuid.as_str())),
        ("name", Value::from("other")),
    ]));
    let res = setup
        .provider
        .read_data_source("scaleway_documentdb_database", &context(), &mut missing, &setup.meta)
        .await;

    // verify:
    assert_eq!(Some(Tag::NotFound), res.err().map(|e| e.tag()));
}
