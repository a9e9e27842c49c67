//! Conversions between the host's declarative values and typed API payloads.

mod convert;
mod policy;
mod resource_data;
mod value;

pub use convert::{
    KeyValue, expand_blocks, expand_key_value_list, expand_optional_bool, expand_optional_i64,
    expand_optional_string, expand_string_list, expand_string_map, flatten_blocks, flatten_key_value_list,
    flatten_optional_string, flatten_string_list, flatten_string_map,
};
pub use policy::{normalize_policy_json, policy_equivalent};
pub use resource_data::ResourceData;
pub use value::Value;
