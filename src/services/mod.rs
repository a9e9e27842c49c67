pub mod scaleway;
