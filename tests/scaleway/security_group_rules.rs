use ::function_name::named;
use qovery_scaleway_provider::errors::Tag;
use qovery_scaleway_provider::marshalling::{ResourceData, Value};
use qovery_scaleway_provider::provider::Provider;
use qovery_scaleway_provider::schema::Operation;
use std::sync::Arc;
use test_utilities::scaleway::{FakeObjectStorage, FakeScaleway};
use test_utilities::utilities::{TEST_PROJECT_ID, attributes, context, generate_id, init, planned_update, test_meta};
use tracing::{Level, span};

const RULES: &str = "scaleway_instance_security_group_rules";

fn rule(action: &str, protocol: &str, port: Option<i64>) -> Value {
    let mut block = btreemap! {
        "action".to_string() => Value::from(action),
        "protocol".to_string() => Value::from(protocol),
        "ip_range".to_string() => Value::from("0.0.0.0/0"),
    };
    if let Some(port) = port {
        block.insert("port".to_string(), Value::from(port));
    }
    Value::from(block)
}

fn ports(rules: &[serde_json::Value]) -> Vec<Option<u64>> {
    rules
        .iter()
        .filter(|r| r["editable"].as_bool() == Some(true))
        .map(|r| r["dest_port_from"].as_u64())
        .collect()
}

#[named]
#[tokio::test]
async fn security_group_rules_keep_their_order() {
    let test_name = function_name!();
    init();
    let span = span!(Level::INFO, "test", name = test_name);
    let _enter = span.enter();

    // setup:
    let provider = Provider::new();
    let scaleway = Arc::new(FakeScaleway::default());
    let meta = test_meta(&scaleway, &Arc::new(FakeObjectStorage::default()));
    let security_group_id = scaleway.add_security_group("fr-par-1", &generate_id(), TEST_PROJECT_ID, false);
    let inbound = Value::from(vec![
        rule("accept", "TCP", Some(443)),
        rule("accept", "TCP", Some(22)),
        rule("drop", "UDP", Some(53)),
    ]);
    let outbound = Value::from(vec![rule("accept", "ANY", None)]);
    let mut data = ResourceData::new(attributes(vec![
        ("security_group_id", Value::from(security_group_id.as_str())),
        ("inbound_rule", inbound.clone()),
        ("outbound_rule", outbound.clone()),
    ]));

    // execute:
    let res = provider
        .apply(RULES, Operation::Create, &context(), &mut data, &meta)
        .await;

    // verify:
    assert!(res.is_ok());
    assert_eq!(Some(format!("fr-par-1/{security_group_id}").as_str()), data.id());
    assert_eq!(&inbound, data.get("inbound_rule"));
    assert_eq!(&outbound, data.get("outbound_rule"));
    let stored = scaleway.security_group_rules(&security_group_id);
    // the rule managed by the cloud is left alone
    assert_eq!(1, stored.iter().filter(|r| r["editable"].as_bool() == Some(false)).count());
    assert_eq!(vec![Some(443), Some(22), Some(53), None], ports(&stored));

    // execute:
    let reordered = Value::from(vec![rule("drop", "UDP", Some(53)), rule("accept", "TCP", Some(443))]);
    let mut data = planned_update(&data, vec![("inbound_rule", reordered.clone())]);
    let res = provider
        .apply(RULES, Operation::Update, &context(), &mut data, &meta)
        .await;

    // verify:
    assert!(res.is_ok());
    assert_eq!(&reordered, data.get("inbound_rule"));
    assert_eq!(&outbound, data.get("outbound_rule"));
    assert_eq!(
        vec![Some(53), Some(443), None],
        ports(&scaleway.security_group_rules(&security_group_id))
    );

    // execute:
    let res = provider
        .apply(RULES, Operation::Delete, &context(), &mut data, &meta)
        .await;

    // verify:
    assert!(res.is_ok());
    assert!(data.is_absent());
    let stored = scaleway.security_group_rules(&security_group_id);
    assert_eq!(1, stored.len());
    assert_eq!(Some(false), stored[0]["editable"].as_bool());
    assert!(scaleway.security_group_exists(&security_group_id));
}

#[named]
#[tokio::test]
async fn security_group_rules_of_an_unknown_group() {
    let test_name = function_name!();
    init();
    let span = span!(Level::INFO, "test", name = test_name);
    let _enter = span.enter();

    // setup:
    let provider = Provider::new();
    let scaleway = Arc::new(FakeScaleway::default());
    let meta = test_meta(&scaleway, &Arc::new(FakeObjectStorage::default()));
    let mut data = ResourceData::new(attributes(vec![
        ("security_group_id", Value::from("fr-par-1/11111111-1111-1111-1111-111111111111")),
        ("inbound_rule", Value::from(vec![rule("accept", "TCP", Some(80))])),
    ]));

    // execute:
    let res = provider
        .apply(RULES, Operation::Create, &context(), &mut data, &meta)
        .await;

    // verify:
    assert_eq!(Some(Tag::NotFound), res.err().map(|e| e.tag()));

    // execute:
    let mut stale = ResourceData::from_id("fr-par-1/11111111-1111-1111-1111-111111111111");
    let res = provider
        .apply(RULES, Operation::Read, &context(), &mut stale, &meta)
        .await;

    // verify:
    assert!(res.is_ok());
    assert!(stale.is_absent());
}
