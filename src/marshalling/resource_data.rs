use crate::marshalling::Value;
use std::collections::BTreeMap;

static NULL: Value = Value::Null;

/// ResourceData: the host's view of one resource during a handler invocation.
///
/// `prior` is the last persisted state (empty on create), `attributes` the desired state handed by the host,
/// overwritten by what Read observes on the cloud. A `None` id means the resource is absent.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResourceData {
    id: Option<String>,
    prior: BTreeMap<String, Value>,
    attributes: BTreeMap<String, Value>,
}

impl ResourceData {
    /// Desired state of a resource about to be created.
    pub fn new(attributes: BTreeMap<String, Value>) -> Self {
        ResourceData {
            id: None,
            prior: BTreeMap::new(),
            attributes,
        }
    }

    /// Persisted state, as given to Read and Delete.
    pub fn from_state(id: &str, state: BTreeMap<String, Value>) -> Self {
        ResourceData {
            id: Some(id.to_string()),
            prior: state.clone(),
            attributes: state,
        }
    }

    /// Persisted state plus the planned one, as given to Update.
    pub fn with_planned(id: &str, prior: BTreeMap<String, Value>, planned: BTreeMap<String, Value>) -> Self {
        ResourceData {
            id: Some(id.to_string()),
            prior,
            attributes: planned,
        }
    }

    /// Id only, as given to an import.
    pub fn from_id(id: &str) -> Self {
        ResourceData {
            id: Some(id.to_string()),
            ..Default::default()
        }
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn set_id(&mut self, id: String) {
        self.id = Some(id);
    }

    /// Marks the resource as gone, the host will plan a re-creation.
    pub fn clear_id(&mut self) {
        self.id = None;
    }

    pub fn is_absent(&self) -> bool {
        self.id.is_none()
    }

    pub fn get(&self, key: &str) -> &Value {
        self.attributes.get(key).unwrap_or(&NULL)
    }

    /// Non empty string value.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).as_str().filter(|s| !s.is_empty())
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.get(key).as_i64()
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).as_bool()
    }

    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        self.attributes.insert(key.to_string(), value.into());
    }

    /// Value persisted before this invocation.
    pub fn old(&self, key: &str) -> &Value {
        self.prior.get(key).unwrap_or(&NULL)
    }

    pub fn has_change(&self, key: &str) -> bool {
        self.old(key) != self.get(key)
    }

    pub fn has_changes(&self, keys: &[&str]) -> bool {
        keys.iter().any(|k| self.has_change(k))
    }

    pub fn attributes(&self) -> &BTreeMap<String, Value> {
        &self.attributes
    }

    pub fn into_attributes(self) -> BTreeMap<String, Value> {
        self.attributes
    }
}
