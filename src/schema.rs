use crate::errors::{ProviderError, ProviderResult};
use crate::locality::diff_suppress_locality;
use crate::marshalling::{ResourceData, Value, policy_equivalent};
use std::collections::BTreeMap;
use std::time::Duration;
use strum_macros::Display;

/// Returns true when `old` and `new` must be considered equal although they differ.
pub type DiffSuppressFn = fn(&Value, &Value) -> bool;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AttributeType {
    String,
    Int,
    Bool,
    StringList,
    StringMap,
    /// Ordered list of nested blocks.
    BlockList,
}

#[derive(Clone, Debug)]
pub struct Attribute {
    pub attribute_type: AttributeType,
    pub required: bool,
    pub optional: bool,
    pub computed: bool,
    /// A change destroys then re-creates the resource.
    pub force_new: bool,
    /// Never logged, never read back from the cloud.
    pub sensitive: bool,
    pub description: String,
    pub default: Option<Value>,
    pub diff_suppress: Option<DiffSuppressFn>,
}

impl Attribute {
    fn new(attribute_type: AttributeType, required: bool, optional: bool, computed: bool) -> Self {
        Attribute {
            attribute_type,
            required,
            optional,
            computed,
            force_new: false,
            sensitive: false,
            description: String::new(),
            default: None,
            diff_suppress: None,
        }
    }

    pub fn required_string() -> Self {
        Attribute::new(AttributeType::String, true, false, false)
    }

    pub fn optional_string() -> Self {
        Attribute::new(AttributeType::String, false, true, false)
    }

    /// Optional, filled by the cloud when not set.
    pub fn optional_computed_string() -> Self {
        Attribute::new(AttributeType::String, false, true, true)
    }

    pub fn computed_string() -> Self {
        Attribute::new(AttributeType::String, false, false, true)
    }

    pub fn required_int() -> Self {
        Attribute::new(AttributeType::Int, true, false, false)
    }

    pub fn optional_computed_int() -> Self {
        Attribute::new(AttributeType::Int, false, true, true)
    }

    pub fn computed_int() -> Self {
        Attribute::new(AttributeType::Int, false, false, true)
    }

    pub fn optional_bool() -> Self {
        Attribute::new(AttributeType::Bool, false, true, false)
    }

    pub fn computed_bool() -> Self {
        Attribute::new(AttributeType::Bool, false, false, true)
    }

    pub fn optional_string_list() -> Self {
        Attribute::new(AttributeType::StringList, false, true, false)
    }

    pub fn optional_string_map() -> Self {
        Attribute::new(AttributeType::StringMap, false, true, false)
    }

    pub fn optional_computed_string_map() -> Self {
        Attribute::new(AttributeType::StringMap, false, true, true)
    }

    pub fn optional_blocks() -> Self {
        Attribute::new(AttributeType::BlockList, false, true, false)
    }

    pub fn computed_blocks() -> Self {
        Attribute::new(AttributeType::BlockList, false, false, true)
    }

    pub fn force_new(mut self) -> Self {
        self.force_new = true;
        self
    }

    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn with_diff_suppress(mut self, diff_suppress: DiffSuppressFn) -> Self {
        self.diff_suppress = Some(diff_suppress);
        self
    }

    /// Set by the cloud only.
    pub fn is_read_only(&self) -> bool {
        self.computed && !self.optional && !self.required
    }
}

/// Schema: attributes of a resource kind or a data source, versioned for state migrations.
#[derive(Clone, Debug, Default)]
pub struct Schema {
    version: u32,
    attributes: BTreeMap<String, Attribute>,
}

impl Schema {
    pub fn v0() -> Self {
        Schema::default()
    }

    pub fn with_version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    pub fn with_attribute(mut self, name: &str, attribute: Attribute) -> Self {
        self.attributes.insert(name.to_string(), attribute);
        self
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.get(name)
    }

    pub fn attributes(&self) -> &BTreeMap<String, Attribute> {
        &self.attributes
    }

    pub fn is_sensitive(&self, name: &str) -> bool {
        self.attribute(name).map(|a| a.sensitive).unwrap_or(false)
    }

    /// Fills unset attributes which declare a default.
    pub fn apply_defaults(&self, data: &mut ResourceData) {
        for (name, attribute) in &self.attributes {
            if let Some(default) = &attribute.default {
                if data.get(name).is_null() {
                    data.set(name, default.clone());
                }
            }
        }
    }

    /// Required attributes must be set.
    pub fn validate(&self, data: &ResourceData) -> ProviderResult<()> {
        for (name, attribute) in &self.attributes {
            if attribute.required && data.get(name).is_empty() {
                return Err(ProviderError::new_validation(name, &format!("{name} is required")));
            }
        }
        Ok(())
    }

    /// Whether the change between the persisted and the planned value of an attribute is real.
    pub fn has_change(&self, data: &ResourceData, name: &str) -> bool {
        if !data.has_change(name) {
            return false;
        }

        match self.attribute(name) {
            Some(Attribute {
                diff_suppress: Some(suppress),
                ..
            }) => !suppress(data.old(name), data.get(name)),
            // unset optional computed attribute keeps the cloud value
            Some(attribute) if attribute.computed && data.get(name).is_null() => false,
            _ => true,
        }
    }

    /// ForceNew attributes whose change would destroy then re-create the resource.
    pub fn requires_replace(&self, data: &ResourceData) -> Vec<String> {
        self.attributes
            .iter()
            .filter(|(name, attribute)| attribute.force_new && self.has_change(data, name))
            .map(|(name, _)| name.clone())
            .collect()
    }
}

/// Schema of a data source exposing the same attributes as the resource: everything is computed,
/// except the lookup arguments which become optional.
pub fn datasource_schema_from_resource(resource: &Schema, lookup_arguments: &[&str]) -> Schema {
    let mut schema = Schema::v0();
    for (name, attribute) in resource.attributes() {
        let mut attribute = attribute.clone();
        attribute.required = false;
        attribute.force_new = false;
        attribute.default = None;
        let is_argument = lookup_arguments.contains(&name.as_str());
        attribute.optional = is_argument;
        attribute.computed = !is_argument;
        schema = schema.with_attribute(name, attribute);
    }
    for argument in lookup_arguments {
        if schema.attribute(argument).is_none() {
            schema = schema.with_attribute(argument, Attribute::optional_string());
        }
    }
    schema
}

pub fn suppress_locality_diff(old: &Value, new: &Value) -> bool {
    match (old.as_str(), new.as_str()) {
        (Some(old), Some(new)) => diff_suppress_locality(old, new),
        _ => false,
    }
}

pub fn suppress_equivalent_policy(old: &Value, new: &Value) -> bool {
    match (old.as_str(), new.as_str()) {
        (Some(old), Some(new)) => policy_equivalent(old, new),
        _ => false,
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Operation {
    Create,
    Read,
    Update,
    Delete,
}

/// Per operation deadlines of a resource kind, the host may override them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResourceTimeouts {
    pub create: Duration,
    pub read: Duration,
    pub update: Duration,
    pub delete: Duration,
}

impl ResourceTimeouts {
    pub fn uniform(timeout: Duration) -> Self {
        ResourceTimeouts {
            create: timeout,
            read: timeout,
            update: timeout,
            delete: timeout,
        }
    }

    pub fn for_operation(&self, operation: Operation) -> Duration {
        match operation {
            Operation::Create => self.create,
            Operation::Read => self.read,
            Operation::Update => self.update,
            Operation::Delete => self.delete,
        }
    }
}

impl Default for ResourceTimeouts {
    fn default() -> Self {
        ResourceTimeouts::uniform(Duration::from_secs(5 * 60))
    }
}
