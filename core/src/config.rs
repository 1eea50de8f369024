//! Panel connection settings.
//!
//! # Design
//! `PanelConfig` is loaded once by the host (TOML file, or the JSON dict a
//! plugin host hands over) and then passed by reference into every call.
//! Loading validates eagerly and reports every problem at once. The client
//! re-checks the required fields before each call, so a config built in
//! code with an empty key still fails cleanly instead of reaching the wire.

use std::fmt;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::auth::TokenMode;

pub const DEFAULT_TIMEOUT_SECONDS: u64 = 10;

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECONDS
}

fn default_verify_tls() -> bool {
    true
}

/// Settings needed to reach one BT Panel instance.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PanelConfig {
    #[serde(default)]
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
    #[serde(default = "default_verify_tls")]
    pub verify_tls: bool,
    #[serde(default)]
    pub token_mode: TokenMode,
}

impl PanelConfig {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            api_key: api_key.to_string(),
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            verify_tls: true,
            token_mode: TokenMode::default(),
        }
    }

    pub fn with_timeout_seconds(mut self, seconds: u64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    pub fn with_verify_tls(mut self, verify: bool) -> Self {
        self.verify_tls = verify;
        self
    }

    pub fn with_token_mode(mut self, mode: TokenMode) -> Self {
        self.token_mode = mode;
        self
    }

    /// `base_url` without trailing slashes.
    pub fn normalized_base_url(&self) -> &str {
        self.base_url.trim().trim_end_matches('/')
    }

    /// Semantic checks serde cannot express. Returns every failure found.
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        let base = self.normalized_base_url();
        if base.is_empty() {
            errors.push(ValidationError::MissingField("base_url"));
        } else if !(base.starts_with("http://") || base.starts_with("https://")) {
            errors.push(ValidationError::UnsupportedScheme(base.to_string()));
        }

        if self.api_key.trim().is_empty() {
            errors.push(ValidationError::MissingField("api_key"));
        }

        if self.timeout_seconds == 0 {
            errors.push(ValidationError::ZeroTimeout);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

impl fmt::Debug for PanelConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PanelConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"***")
            .field("timeout_seconds", &self.timeout_seconds)
            .field("verify_tls", &self.verify_tls)
            .field("token_mode", &self.token_mode)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{0} must not be empty")]
    MissingField(&'static str),
    #[error("base_url must start with http:// or https:// (got {0})")]
    UnsupportedScheme(String),
    #[error("timeout_seconds must be greater than zero")]
    ZeroTimeout,
}

/// Joins validation failures into one line.
pub fn describe(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse TOML config: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("failed to parse JSON config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid config: {}", describe(.0))]
    Validation(Vec<ValidationError>),
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<PanelConfig, ConfigError> {
    let config = read_config(path)?;
    config.validate().map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Parse a TOML file without validating it, for callers that layer
/// overrides on top before checking.
pub fn read_config(path: &Path) -> Result<PanelConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

pub fn from_toml_str(content: &str) -> Result<PanelConfig, ConfigError> {
    let config: PanelConfig = toml::from_str(content)?;
    config.validate().map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Parse the JSON object a plugin host passes as plugin configuration.
pub fn from_json_str(content: &str) -> Result<PanelConfig, ConfigError> {
    let config: PanelConfig = serde_json::from_str(content)?;
    config.validate().map_err(ConfigError::Validation)?;
    Ok(config)
}
