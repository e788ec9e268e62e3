pub mod config;
pub mod error;
pub mod loader;
pub mod metrics_consts;
pub mod server;
pub mod worker;
