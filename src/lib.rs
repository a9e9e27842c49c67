#[macro_use]
extern crate tracing;

pub mod constants;
pub mod data_sources;
pub mod errors;
pub mod locality;
pub mod logger;
pub mod marshalling;
pub mod migrations;
pub mod provider;
pub mod reconcile;
pub mod resources;
pub mod schema;
pub mod services;
pub mod sweeper;
pub mod unit_conversion;
