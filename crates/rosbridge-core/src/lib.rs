//! # rosbridge-core
//!
//! Shared building blocks for the rosbridge client workspace: the error
//! taxonomy, configuration loading, and logging setup helpers used by the
//! transport, protocol, and client crates.

mod config;
mod error;
mod logging;

pub use config::{
    Config, GlobalConfig, ReconnectConfig, TransportConfig, WebSocketConfig, load_config,
};
pub use error::{ConfigError, CoreError};
pub use logging::setup_logging;
