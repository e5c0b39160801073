//! Configuration management for the liveasr service
//!
//! Two layers:
//! - [`constants`] — fixed protocol/DSP parameters the spec does not allow
//!   deployers to change (sample rate, VAD aggressiveness, Korean morpheme
//!   sets).
//! - [`settings`] — deployer-tunable configuration loaded from
//!   `config/default.yaml`, an optional `config/{env}.yaml` overlay, and
//!   `LIVEASR__*` environment variables, in that priority order.

pub mod constants;
pub mod settings;

pub use settings::{
    load_settings, DecoderConfig, ObservabilityConfig, RuntimeEnvironment, ServerConfig,
    SessionDefaults, Settings, TranscriberConfig, TranslationConfig,
};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    #[error("failed to parse configuration: {0}")]
    ParseError(String),

    #[error("missing required field: {0}")]
    MissingField(String),

    #[error("invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}
