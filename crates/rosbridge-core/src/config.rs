use std::path::PathBuf;

use serde::Deserialize;

use crate::error::CoreError;

#[derive(Deserialize, Debug, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub global: GlobalConfig,
    #[serde(default)]
    pub transport: TransportConfig,
    #[serde(default)]
    pub reconnect: ReconnectConfig,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct GlobalConfig {
    pub log_level: String,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct TransportConfig {
    pub connect_timeout_ms: u64,
    pub websocket: WebSocketConfig,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 10_000, // 10 seconds
            websocket: WebSocketConfig::default(),
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct WebSocketConfig {
    pub max_message_size: Option<usize>,
    pub accept_unmasked_frames: bool,
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            max_message_size: Some(64 * 1024 * 1024), // 64 MiB
            accept_unmasked_frames: false,
        }
    }
}

/// Retry timing for the reconnect loop. The growth factor and jitter follow
/// the reconnecting-client defaults rosbridge deployments are used to; the
/// maximum delay is capped at one minute.
#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ReconnectConfig {
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub growth_factor: f64,
    pub jitter_factor: f64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: 1_000,
            max_delay_ms: 60_000,
            growth_factor: 1.618,
            jitter_factor: 0.12,
        }
    }
}

// --- Loading Logic ---

pub fn load_config(source_path: Option<PathBuf>) -> Result<Config, CoreError> {
    let default_config_name = "rosbridge_config"; // Base name for config files

    let mut builder = config::Config::builder()
        .set_default("global.log_level", GlobalConfig::default().log_level)?
        .set_default(
            "transport.connect_timeout_ms",
            TransportConfig::default().connect_timeout_ms,
        )?
        .set_default(
            "reconnect.initial_delay_ms",
            ReconnectConfig::default().initial_delay_ms,
        )?;

    // Load from specified file path if provided
    if let Some(path) = source_path {
        if path.exists() {
            log::debug!("Loading configuration from: {:?}", path);
            builder = builder.add_source(config::File::from(path).required(true));
        } else {
            log::warn!("Specified configuration file not found: {:?}", path);
        }
    } else {
        log::debug!(
            "Attempting to load configuration from default locations (e.g., {}.toml)",
            default_config_name
        );
        builder = builder.add_source(config::File::with_name(default_config_name).required(false));
    }

    // Load from environment variables (e.g., ROSBRIDGE_GLOBAL__LOG_LEVEL).
    // A double-underscore level separator keeps keys that themselves contain
    // underscores (connect_timeout_ms) addressable.
    builder = builder.add_source(
        config::Environment::with_prefix("ROSBRIDGE")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    );

    let cfg = builder.build()?.try_deserialize::<Config>()?;

    log::debug!("Successfully loaded configuration: {:?}", cfg);
    Ok(cfg)
}
