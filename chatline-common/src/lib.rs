//! Chatline Common - Shared configuration, errors, and logging for Chatline.
//!
//! This crate provides:
//! - Configuration types and loading
//! - Configuration validation
//! - Error types
//! - Logging setup
//! - Small string helpers used in log output

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod config;
pub mod error;
pub mod logging;
pub mod util;
pub mod validation;

pub use config::{CompletionConfig, Config, ObservabilityConfig, ServerConfig, TwilioConfig};
pub use error::{Error, Result};
pub use validation::{Validate, ValidationError, ValidationResult};
