//! fleet-core — shared domain types and daemon configuration.

pub mod config;
pub mod types;

pub use config::DaemonConfig;
pub use types::*;
