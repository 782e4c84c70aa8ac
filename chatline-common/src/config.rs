//! Configuration management for Chatline.
//!
//! The service reads an optional JSON file at `~/.chatline/config.json` and
//! then applies environment variable overrides.
//!
//! # Configuration Priority
//!
//! 1. Environment variables
//! 2. Explicit config file values
//! 3. Default values
//!
//! # Environment Variable Mapping
//!
//! ## Credentials
//! - `TWILIO_ACCOUNT_SID` → twilio.account_sid
//! - `TWILIO_AUTH_TOKEN` → twilio.auth_token
//! - `GROQ_API_KEY` → completion.api_key
//!
//! ## Endpoints
//! - `TWILIO_API_BASE` → twilio.api_base
//! - `GROQ_BASE_URL` → completion.base_url
//!
//! ## Server
//! - `CHATLINE_PORT` → server.port
//! - `CHATLINE_BIND_ADDRESS` → server.host
//!
//! ## Logging
//! - `CHATLINE_LOG_LEVEL` → observability.log_level
//! - `CHATLINE_LOG_FORMAT` → observability.log_format

use crate::validation::{ValidationError, ValidationResult};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Get the configuration directory path.
pub fn config_dir() -> PathBuf {
    directories::UserDirs::new().map_or_else(
        || PathBuf::from(".chatline"),
        |dirs| dirs.home_dir().join(".chatline"),
    )
}

/// Get the configuration file path.
pub fn config_path() -> PathBuf {
    config_dir().join("config.json")
}

// ============================================================================
// Root
// ============================================================================

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP listener
    #[serde(default)]
    pub server: ServerConfig,

    /// Twilio (messaging provider) credentials
    #[serde(default)]
    pub twilio: TwilioConfig,

    /// Completion provider settings
    #[serde(default)]
    pub completion: CompletionConfig,

    /// Logging
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

// ============================================================================
// Sections
// ============================================================================

/// HTTP listener configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Twilio REST API credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TwilioConfig {
    #[serde(default)]
    pub account_sid: Option<String>,

    #[serde(default)]
    pub auth_token: Option<String>,

    /// Base URL of the Twilio REST API
    #[serde(default = "default_twilio_api_base")]
    pub api_base: String,

    /// Request timeout for outbound sends
    #[serde(default = "default_twilio_timeout")]
    pub timeout_secs: u64,
}

impl Default for TwilioConfig {
    fn default() -> Self {
        Self {
            account_sid: None,
            auth_token: None,
            api_base: default_twilio_api_base(),
            timeout_secs: default_twilio_timeout(),
        }
    }
}

impl TwilioConfig {
    /// Whether both credentials are present and non-empty.
    pub fn has_credentials(&self) -> bool {
        self.account_sid.as_deref().is_some_and(|s| !s.is_empty())
            && self.auth_token.as_deref().is_some_and(|s| !s.is_empty())
    }
}

/// Completion provider (Groq, OpenAI-compatible) settings.
///
/// Sampling parameters are fixed in code; only the model, endpoint and
/// timeout can be changed here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionConfig {
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_groq_base_url")]
    pub base_url: String,

    #[serde(default = "default_model")]
    pub model: String,

    /// Whole-request timeout. Twilio waits 15 seconds for a webhook reply.
    #[serde(default = "default_completion_timeout")]
    pub timeout_secs: u64,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_groq_base_url(),
            model: default_model(),
            timeout_secs: default_completion_timeout(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// "json" or "pretty"
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

// ============================================================================
// Loading
// ============================================================================

impl Config {
    /// Load configuration from the default path.
    pub fn load() -> Result<Self> {
        let path = config_path();
        if !path.exists() {
            return Ok(Self::default());
        }

        Self::load_from(&path)
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))
    }

    /// Load configuration with environment variable overrides applied.
    pub fn load_with_env() -> Result<Self> {
        let mut config = Self::load()?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Apply environment variable overrides to the configuration.
    pub fn apply_env_overrides(&mut self) -> ValidationResult<()> {
        self.apply_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable source.
    ///
    /// Split out from [`Config::apply_env_overrides`] so tests do not have to
    /// mutate the process environment.
    ///
    /// A `CHATLINE_PORT` that is not a port number is an error rather than
    /// being ignored.
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> ValidationResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(sid) = lookup("TWILIO_ACCOUNT_SID") {
            self.twilio.account_sid = Some(sid);
        }
        if let Some(token) = lookup("TWILIO_AUTH_TOKEN") {
            self.twilio.auth_token = Some(token);
        }
        if let Some(base) = lookup("TWILIO_API_BASE") {
            self.twilio.api_base = base;
        }

        if let Some(key) = lookup("GROQ_API_KEY") {
            self.completion.api_key = Some(key);
        }
        if let Some(url) = lookup("GROQ_BASE_URL") {
            self.completion.base_url = url;
        }

        if let Some(port) = lookup("CHATLINE_PORT") {
            self.server.port = port.trim().parse().map_err(|e| ValidationError::InvalidValue {
                field: "CHATLINE_PORT".into(),
                reason: format!("'{port}' is not a port number: {e}"),
            })?;
        }
        if let Some(bind) = lookup("CHATLINE_BIND_ADDRESS") {
            self.server.host = bind;
        }

        if let Some(level) = lookup("CHATLINE_LOG_LEVEL") {
            self.observability.log_level = level;
        }
        if let Some(format) = lookup("CHATLINE_LOG_FORMAT") {
            self.observability.log_format = format;
        }

        Ok(())
    }

    /// Get the bind address as `host:port`.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

// ============================================================================
// Defaults
// ============================================================================

fn default_host() -> String {
    "0.0.0.0".into()
}

fn default_port() -> u16 {
    5000
}

fn default_twilio_api_base() -> String {
    "https://api.twilio.com".into()
}

fn default_twilio_timeout() -> u64 {
    30
}

fn default_groq_base_url() -> String {
    "https://api.groq.com/openai".into()
}

fn default_model() -> String {
    "mixtral-8x7b-32768".into()
}

fn default_completion_timeout() -> u64 {
    12
}

fn default_log_level() -> String {
    "info".into()
}

fn default_log_format() -> String {
    "pretty".into()
}
