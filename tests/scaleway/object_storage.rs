use ::function_name::named;
use qovery_scaleway_provider::errors::Tag;
use qovery_scaleway_provider::locality::ScwRegion;
use qovery_scaleway_provider::marshalling::{ResourceData, Value};
use qovery_scaleway_provider::provider::{Provider, ProviderMeta};
use qovery_scaleway_provider::schema::Operation;
use std::sync::Arc;
use test_utilities::scaleway::{FakeObjectStorage, FakeScaleway};
use test_utilities::utilities::{attributes, context, init, planned_update, test_meta};
use tracing::{Level, span};

const OBJECT: &str = "scaleway_object";
const BUCKET_POLICY: &str = "scaleway_object_bucket_policy";

const POLICY: &str = r#"{"Version":"2023-04-17","Id":"policy","Statement":[{"Sid":"read","Effect":"Allow","Principal":{"SCW":"*"},"Action":["s3:GetObject"],"Resource":["bucket/*"]}]}"#;

struct Setup {
    provider: Provider,
    storage: Arc<FakeObjectStorage>,
    meta: ProviderMeta,
}

fn setup() -> Setup {
    init();
    let storage = Arc::new(FakeObjectStorage::default());
    let meta = test_meta(&Arc::new(FakeScaleway::default()), &storage);

    Setup {
        provider: Provider::new(),
        storage,
        meta,
    }
}

impl Setup {
    async fn apply(&self, kind: &str, operation: Operation, data: &mut ResourceData) -> Result<(), Tag> {
        self.provider
            .apply(kind, operation, &context(), data, &self.meta)
            .await
            .map_err(|e| e.tag())
    }

    fn count_calls(&self, operation: &str) -> usize {
        self.storage.calls().iter().filter(|c| c.as_str() == operation).count()
    }
}

fn metadata(value: &str) -> Value {
    Value::from(btreemap! { "version".to_string() => Value::from(value) })
}

#[named]
#[tokio::test]
async fn object_metadata_change_is_a_copy_in_place() {
    let test_name = function_name!();
    let setup = setup();
    let span = span!(Level::INFO, "test", name = test_name);
    let _enter = span.enter();

    // setup:
    let mut data = ResourceData::new(attributes(vec![
        ("bucket", Value::from("bucket")),
        ("key", Value::from("dir/file.txt")),
        ("content", Value::from("hello")),
        ("metadata", metadata("1")),
    ]));
    setup
        .apply(OBJECT, Operation::Create, &mut data)
        .await
        .expect("create should succeed");
    assert_eq!(Some("fr-par/bucket/dir/file.txt"), data.id());
    assert_eq!(Some("private"), data.get_str("visibility"));

    // execute:
    let mut data = planned_update(&data, vec![("metadata", metadata("2"))]);
    let res = setup.apply(OBJECT, Operation::Update, &mut data).await;

    // verify:
    assert_eq!(Ok(()), res);
    assert_eq!(1, setup.count_calls("put_object"));
    assert_eq!(1, setup.count_calls("copy_object_in_place"));
    let stored = setup
        .storage
        .object(ScwRegion::Paris, "bucket", "dir/file.txt")
        .expect("object is stored");
    assert_eq!(b"hello".to_vec(), stored.body);
    assert_eq!(Some(&"2".to_string()), stored.metadata.get("version"));
    assert_eq!(&metadata("2"), data.get("metadata"));

    // execute:
    let mut data = planned_update(
        &data,
        vec![("content", Value::from("hello again")), ("hash", Value::from("v2"))],
    );
    let res = setup.apply(OBJECT, Operation::Update, &mut data).await;

    // verify:
    assert_eq!(Ok(()), res);
    assert_eq!(2, setup.count_calls("put_object"));
    assert_eq!(1, setup.count_calls("copy_object_in_place"));
    let stored = setup
        .storage
        .object(ScwRegion::Paris, "bucket", "dir/file.txt")
        .expect("object is stored");
    assert_eq!(b"hello again".to_vec(), stored.body);
    assert_eq!(Some(&"2".to_string()), stored.metadata.get("version"));
}

#[named]
#[tokio::test]
async fn object_visibility_and_tags() {
    let test_name = function_name!();
    let setup = setup();
    let span = span!(Level::INFO, "test", name = test_name);
    let _enter = span.enter();

    // setup:
    let mut data = ResourceData::new(attributes(vec![
        ("bucket", Value::from("fr-par/bucket")),
        ("key", Value::from("file.txt")),
        ("content", Value::from("hello")),
    ]));
    setup
        .apply(OBJECT, Operation::Create, &mut data)
        .await
        .expect("create should succeed");

    // execute:
    let mut data = planned_update(
        &data,
        vec![
            ("visibility", Value::from("public-read")),
            ("tags", Value::from(btreemap! { "team".to_string() => Value::from("storage") })),
        ],
    );
    let res = setup.apply(OBJECT, Operation::Update, &mut data).await;

    // verify:
    assert_eq!(Ok(()), res);
    assert_eq!(1, setup.count_calls("put_object"));
    assert_eq!(1, setup.count_calls("put_object_acl"));
    assert_eq!(1, setup.count_calls("put_object_tagging"));
    assert_eq!(Some("public-read"), data.get_str("visibility"));
    assert_eq!(Some("storage"), data.get("tags").as_map().and_then(|t| t.get("team")).and_then(|t| t.as_str()));
    // the region given along the bucket name is kept
    assert_eq!(Some("fr-par/bucket"), data.get_str("bucket"));

    // execute:
    let res = setup.apply(OBJECT, Operation::Delete, &mut data).await;

    // verify:
    assert_eq!(Ok(()), res);
    assert!(data.is_absent());
    assert!(setup.storage.object(ScwRegion::Paris, "bucket", "file.txt").is_none());
}

#[named]
#[tokio::test]
async fn object_with_unknown_visibility_is_rejected() {
    let test_name = function_name!();
    let setup = setup();
    let span = span!(Level::INFO, "test", name = test_name);
    let _enter = span.enter();

    // setup:
    let mut data = ResourceData::new(attributes(vec![
        ("bucket", Value::from("bucket")),
        ("key", Value::from("file.txt")),
        ("content", Value::from("hello")),
        ("visibility", Value::from("public")),
    ]));

    // execute:
    let res = setup.apply(OBJECT, Operation::Create, &mut data).await;

    // verify:
    assert_eq!(Err(Tag::Validation), res);
    assert_eq!(0, setup.count_calls("put_object"));
}

#[named]
#[tokio::test]
async fn bucket_policy_keeps_an_equivalent_document() {
    let test_name = function_name!();
    let setup = setup();
    let span = span!(Level::INFO, "test", name = test_name);
    let _enter = span.enter();

    // setup:
    let mut data = ResourceData::new(attributes(vec![
        ("bucket", Value::from("bucket")),
        ("policy", Value::from(POLICY)),
    ]));
    setup
        .apply(BUCKET_POLICY, Operation::Create, &mut data)
        .await
        .expect("create should succeed");
    assert_eq!(Some("fr-par/bucket"), data.id());

    // the cloud answers with its own formatting
    let reformatted = serde_json::to_string_pretty(
        &serde_json::from_str::<serde_json::Value>(POLICY).expect("valid policy"),
    )
    .expect("serializable policy");
    setup.storage.set_policy(ScwRegion::Paris, "bucket", &reformatted);

    // execute:
    let res = setup.apply(BUCKET_POLICY, Operation::Read, &mut data).await;

    // verify:
    assert_eq!(Ok(()), res);
    assert_eq!(Some(POLICY), data.get_str("policy"));

    // execute:
    let changed = POLICY.replace("s3:GetObject", "s3:ListBucket");
    setup.storage.set_policy(ScwRegion::Paris, "bucket", &changed);
    let res = setup.apply(BUCKET_POLICY, Operation::Read, &mut data).await;

    // verify:
    assert_eq!(Ok(()), res);
    assert!(data.get_str("policy").is_some_and(|p| p.contains("s3:ListBucket")));

    // execute:
    let res = setup.apply(BUCKET_POLICY, Operation::Delete, &mut data).await;

    // verify:
    assert_eq!(Ok(()), res);
    assert!(setup.storage.policy(ScwRegion::Paris, "bucket").is_none());

    // a policy deleted out of band is gone from the state
    let mut gone = ResourceData::from_id("fr-par/bucket");
    assert_eq!(Ok(()), setup.apply(BUCKET_POLICY, Operation::Read, &mut gone).await);
    assert!(gone.is_absent());
}

#[named]
#[tokio::test]
async fn bucket_policy_must_be_json() {
    let test_name = function_name!();
    let setup = setup();
    let span = span!(Level::INFO, "test", name = test_name);
    let _enter = span.enter();

    // setup:
    let mut data = ResourceData::new(attributes(vec![
        ("bucket", Value::from("bucket")),
        ("policy", Value::from("{ not json")),
    ]));

    // execute:
    let res = setup.apply(BUCKET_POLICY, Operation::Create, &mut data).await;

    // verify:
    assert_eq!(Err(Tag::Validation), res);
    assert_eq!(0, setup.count_calls("put_bucket_policy"));
}
