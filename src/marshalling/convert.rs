use crate::errors::{ProviderError, ProviderResult};
use crate::marshalling::Value;
use serde::de::DeserializeOwned;
use serde_derive::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Unset, or empty string, is `None`.
pub fn expand_optional_string(value: &Value) -> Option<String> {
    value.as_str().filter(|s| !s.is_empty()).map(|s| s.to_string())
}

/// Unset is `None`, zero is `Some(0)`.
pub fn expand_optional_i64(value: &Value) -> Option<i64> {
    value.as_i64()
}

/// Unset is `None`, false is `Some(false)`.
pub fn expand_optional_bool(value: &Value) -> Option<bool> {
    value.as_bool()
}

pub fn flatten_optional_string(value: Option<&str>) -> Value {
    match value {
        Some(s) if !s.is_empty() => Value::from(s),
        _ => Value::Null,
    }
}

pub fn expand_string_list(value: &Value) -> Vec<String> {
    value
        .as_list()
        .map(|l| l.iter().filter_map(|v| v.as_str().map(|s| s.to_string())).collect())
        .unwrap_or_default()
}

pub fn flatten_string_list(values: &[String]) -> Value {
    Value::List(values.iter().map(Value::from).collect())
}

pub fn expand_string_map(value: &Value) -> BTreeMap<String, String> {
    value
        .as_map()
        .map(|m| {
            m.iter()
                .filter_map(|(k, v)| match v {
                    Value::String(s) => Some((k.clone(), s.clone())),
                    Value::Int(i) => Some((k.clone(), i.to_string())),
                    Value::Bool(b) => Some((k.clone(), b.to_string())),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default()
}

pub fn flatten_string_map(values: &BTreeMap<String, String>) -> Value {
    Value::Map(values.iter().map(|(k, v)| (k.clone(), Value::from(v))).collect())
}

/// KeyValue: map entry as some APIs (init settings, object tagging) want it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyValue {
    #[serde(alias = "name")]
    pub key: String,
    pub value: String,
}

/// Map entries sorted by key.
pub fn expand_key_value_list(value: &Value) -> Vec<KeyValue> {
    expand_string_map(value)
        .into_iter()
        .map(|(key, value)| KeyValue { key, value })
        .collect()
}

pub fn flatten_key_value_list(values: &[KeyValue]) -> Value {
    Value::Map(values.iter().map(|kv| (kv.key.clone(), Value::from(&kv.value))).collect())
}

/// Ordered nested blocks into typed records, order is kept.
pub fn expand_blocks<T: DeserializeOwned>(field: &str, value: &Value) -> ProviderResult<Vec<T>> {
    if value.is_null() {
        return Ok(vec![]);
    }

    serde_json::from_value(value.to_json())
        .map_err(|e| ProviderError::new_validation(field, &format!("{field}: invalid block ({e})")))
}

pub fn flatten_blocks<T: serde::Serialize>(blocks: &[T]) -> ProviderResult<Value> {
    serde_json::to_value(blocks)
        .map(Value::from)
        .map_err(|e| ProviderError::new_internal(&format!("cannot serialize blocks: {e}")))
}
