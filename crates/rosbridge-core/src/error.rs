use thiserror::Error;

// Re-export for convenience elsewhere
pub use config::ConfigError;

/// Top-level errors for configuration and process setup.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Logging setup failed: {0}")]
    LoggingSetup(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
