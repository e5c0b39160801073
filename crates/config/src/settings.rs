//! Application settings, layered file + environment configuration.

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Runtime environment; relaxes/tightens validation and log verbosity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeEnvironment {
    #[default]
    Development,
    Staging,
    Production,
}

impl RuntimeEnvironment {
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

/// Top-level application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub environment: RuntimeEnvironment,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub decoder: DecoderConfig,

    #[serde(default)]
    pub transcriber: TranscriberConfig,

    #[serde(default)]
    pub session: SessionDefaults,

    #[serde(default)]
    pub translation: TranslationConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// Directory tuning files are persisted under (`uploads/{streamId}.json`).
    #[serde(default = "default_uploads_dir")]
    pub uploads_dir: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            environment: RuntimeEnvironment::default(),
            server: ServerConfig::default(),
            decoder: DecoderConfig::default(),
            transcriber: TranscriberConfig::default(),
            session: SessionDefaults::default(),
            translation: TranslationConfig::default(),
            observability: ObservabilityConfig::default(),
            uploads_dir: default_uploads_dir(),
        }
    }
}

fn default_uploads_dir() -> String {
    "uploads".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_host")]
    pub host: String,
}

fn default_port() -> u16 {
    8080
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
        }
    }
}

/// Decoder subprocess (ffmpeg-equivalent) configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecoderConfig {
    #[serde(default = "default_decoder_bin")]
    pub binary: String,
    #[serde(default = "default_decoder_args")]
    pub args: Vec<String>,
    #[serde(default = "default_teardown_timeout_ms")]
    pub teardown_timeout_ms: u64,
}

fn default_decoder_bin() -> String {
    "ffmpeg".to_string()
}

fn default_decoder_args() -> Vec<String> {
    vec![
        "-f", "webm", "-i", "pipe:0", "-f", "s16le", "-ar", "16000", "-ac", "1", "pipe:1",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_teardown_timeout_ms() -> u64 {
    2000
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            binary: default_decoder_bin(),
            args: default_decoder_args(),
            teardown_timeout_ms: default_teardown_timeout_ms(),
        }
    }
}

/// ASR HTTP back-end configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriberConfig {
    #[serde(default = "default_asr_url")]
    pub url: String,
    #[serde(default = "default_asr_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_beam_size")]
    pub beam_size: u32,
}

fn default_asr_url() -> String {
    "http://127.0.0.1:8090".to_string()
}

fn default_asr_timeout_ms() -> u64 {
    30_000
}

fn default_beam_size() -> u32 {
    5
}

impl Default for TranscriberConfig {
    fn default() -> Self {
        Self {
            url: default_asr_url(),
            timeout_ms: default_asr_timeout_ms(),
            beam_size: default_beam_size(),
        }
    }
}

/// Per-session defaults, overridable via the `config` control message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionDefaults {
    #[serde(default = "default_silence_threshold")]
    pub silence_threshold_s: f32,
    #[serde(default = "default_engine")]
    pub engine: String,
    /// Whether the aggregation buffer survives a mid-stream `stream_start`.
    /// Open question resolved in SPEC_FULL.md §9: defaults to `false`,
    /// matching the original's unchanged (buffer-preserving, actually — see
    /// note) behavior made explicit here.
    #[serde(default)]
    pub clear_buffer_on_restart: bool,
}

fn default_silence_threshold() -> f32 {
    crate::constants::audio::SILENCE_THRESHOLD_S
}

fn default_engine() -> String {
    "deepl".to_string()
}

impl Default for SessionDefaults {
    fn default() -> Self {
        Self {
            silence_threshold_s: default_silence_threshold(),
            engine: default_engine(),
            clear_buffer_on_restart: false,
        }
    }
}

/// Translation back-end credential configuration; absence of the
/// corresponding fields disables that back-end at startup (warning only).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TranslationConfig {
    #[serde(default)]
    pub deepl_api_key: Option<String>,
    #[serde(default)]
    pub naver_client_id: Option<String>,
    #[serde(default)]
    pub naver_client_secret: Option<String>,
    #[serde(default)]
    pub google_application_credentials: Option<String>,
}

impl TranslationConfig {
    /// Load credentials from the process environment, matching the
    /// original's `os.getenv` lookups.
    pub fn from_env() -> Self {
        Self {
            deepl_api_key: std::env::var("DEEPL_API_KEY").ok(),
            naver_client_id: std::env::var("NAVER_CLIENT_ID").ok(),
            naver_client_secret: std::env::var("NAVER_CLIENT_SECRET").ok(),
            google_application_credentials: std::env::var("GOOGLE_APPLICATION_CREDENTIALS").ok(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub log_json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_json: false,
        }
    }
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Load settings from `config/default.{yaml,toml}`, an optional
/// `config/{env}.{yaml,toml}` overlay, then `LIVEASR__*` environment
/// variables, in that priority order (env wins).
pub fn load_settings(env: Option<&str>) -> Result<Settings, ConfigError> {
    let mut builder = Config::builder();

    builder = builder.add_source(File::with_name("config/default").required(false));

    if let Some(env_name) = env {
        builder =
            builder.add_source(File::with_name(&format!("config/{}", env_name)).required(false));
    }

    builder = builder.add_source(
        Environment::with_prefix("LIVEASR")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;
    let mut settings: Settings = config.try_deserialize()?;
    settings.translation = TranslationConfig::from_env();
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_match_spec_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.server.port, 8080);
        assert_eq!(settings.session.engine, "deepl");
        assert!((settings.session.silence_threshold_s - 0.8).abs() < f32::EPSILON);
        assert!(!settings.session.clear_buffer_on_restart);
    }

    #[test]
    fn decoder_args_request_expected_pcm_format() {
        let decoder = DecoderConfig::default();
        assert!(decoder.args.windows(2).any(|w| w == ["-ar", "16000"]));
        assert!(decoder.args.windows(2).any(|w| w == ["-ac", "1"]));
    }

    #[test]
    fn load_settings_falls_back_without_config_files() {
        let settings = load_settings(None).expect("defaults load even without config files");
        assert_eq!(settings.server.port, 8080);
    }
}
