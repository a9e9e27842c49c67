//! Typed access to the Scaleway APIs used by the resources.

pub mod client;
pub mod documentdb;
pub mod instance;
pub mod object_storage;
pub mod registry;

pub use client::{ApiRequest, ApiTransport, Method, ReqwestTransport, ScwClient};
pub use documentdb::DocumentDbApi;
pub use instance::InstanceApi;
pub use object_storage::{ObjectStorageApi, RusotoObjectStorage};
pub use registry::RegistryApi;
