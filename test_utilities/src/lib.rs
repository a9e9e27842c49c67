pub mod scaleway;
pub mod utilities;
