//! Configuration validation for Chatline.
//!
//! Checks values that would otherwise only fail at request time.
//! Missing provider credentials are not errors: the bridge still answers
//! with fallback replies, so they are reported by [`Config::missing_credentials`]
//! and logged as warnings instead.

use thiserror::Error;

use crate::config::{CompletionConfig, Config, ObservabilityConfig, ServerConfig, TwilioConfig};

/// Configuration validation error.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Invalid port {port} for {field}")]
    InvalidPort { port: u16, field: String },

    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Multiple validation errors: {0:?}")]
    Multiple(Vec<ValidationError>),
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Trait for validatable configuration sections.
pub trait Validate {
    /// Validate this configuration section.
    fn validate(&self) -> ValidationResult<()>;
}

impl Config {
    /// Validate the entire configuration.
    pub fn validate(&self) -> ValidationResult<()> {
        let sections: [&dyn Validate; 4] = [
            &self.server,
            &self.twilio,
            &self.completion,
            &self.observability,
        ];

        let mut errors: Vec<ValidationError> = sections
            .iter()
            .filter_map(|section| section.validate().err())
            .collect();

        if errors.is_empty() {
            Ok(())
        } else if errors.len() == 1 {
            Err(errors.remove(0))
        } else {
            Err(ValidationError::Multiple(errors))
        }
    }

    /// Names of credential variables that are not set.
    pub fn missing_credentials(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.twilio.account_sid.as_deref().map_or(true, str::is_empty) {
            missing.push("TWILIO_ACCOUNT_SID");
        }
        if self.twilio.auth_token.as_deref().map_or(true, str::is_empty) {
            missing.push("TWILIO_AUTH_TOKEN");
        }
        if self.completion.api_key.as_deref().map_or(true, str::is_empty) {
            missing.push("GROQ_API_KEY");
        }
        missing
    }
}

impl Validate for ServerConfig {
    fn validate(&self) -> ValidationResult<()> {
        if self.port == 0 {
            return Err(ValidationError::InvalidPort {
                port: self.port,
                field: "server.port".into(),
            });
        }
        if self.host.parse::<std::net::IpAddr>().is_err() {
            return Err(ValidationError::InvalidValue {
                field: "server.host".into(),
                reason: format!("'{}' is not an IP address", self.host),
            });
        }
        Ok(())
    }
}

impl Validate for TwilioConfig {
    fn validate(&self) -> ValidationResult<()> {
        validate_url("twilio.api_base", &self.api_base)?;
        if self.timeout_secs == 0 {
            return Err(ValidationError::InvalidValue {
                field: "twilio.timeout_secs".into(),
                reason: "must be greater than zero".into(),
            });
        }
        Ok(())
    }
}

impl Validate for CompletionConfig {
    fn validate(&self) -> ValidationResult<()> {
        validate_url("completion.base_url", &self.base_url)?;
        if self.model.trim().is_empty() {
            return Err(ValidationError::MissingField {
                field: "completion.model".into(),
            });
        }
        if self.timeout_secs == 0 {
            return Err(ValidationError::InvalidValue {
                field: "completion.timeout_secs".into(),
                reason: "must be greater than zero".into(),
            });
        }
        Ok(())
    }
}

impl Validate for ObservabilityConfig {
    fn validate(&self) -> ValidationResult<()> {
        const LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];
        if !LEVELS.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(ValidationError::InvalidValue {
                field: "observability.log_level".into(),
                reason: format!("expected one of {}", LEVELS.join(", ")),
            });
        }
        if self.log_format != "json" && self.log_format != "pretty" {
            return Err(ValidationError::InvalidValue {
                field: "observability.log_format".into(),
                reason: "expected 'json' or 'pretty'".into(),
            });
        }
        Ok(())
    }
}

fn validate_url(field: &str, value: &str) -> ValidationResult<()> {
    if value.trim().is_empty() {
        return Err(ValidationError::MissingField {
            field: field.into(),
        });
    }
    if !value.starts_with("http://") && !value.starts_with("https://") {
        return Err(ValidationError::InvalidValue {
            field: field.into(),
            reason: "must start with http:// or https://".into(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_zero_port_rejected() {
        let mut config = Config::default();
        config.server.port = 0;
        assert!(matches!(
            config.validate(),
            Err(ValidationError::InvalidPort { port: 0, .. })
        ));
    }

    #[test]
    fn test_bad_log_format_rejected() {
        let mut config = Config::default();
        config.observability.log_format = "xml".into();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("observability.log_format"));
    }

    #[test]
    fn test_multiple_errors_collected() {
        let mut config = Config::default();
        config.server.host = "localhost:80".into();
        config.completion.base_url = "api.groq.com".into();
        config.twilio.timeout_secs = 0;
        match config.validate() {
            Err(ValidationError::Multiple(errors)) => assert_eq!(errors.len(), 3),
            other => panic!("expected multiple errors, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_credentials() {
        let mut config = Config::default();
        assert_eq!(
            config.missing_credentials(),
            vec!["TWILIO_ACCOUNT_SID", "TWILIO_AUTH_TOKEN", "GROQ_API_KEY"]
        );

        config.twilio.account_sid = Some("AC1".into());
        config.twilio.auth_token = Some(String::new());
        config.completion.api_key = Some("gsk".into());
        assert_eq!(config.missing_credentials(), vec!["TWILIO_AUTH_TOKEN"]);
    }
}
