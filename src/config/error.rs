//! Configuration error types

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    #[error("Failed to read configuration file {path}: {message}")]
    FileRead { path: String, message: String },

    #[error("Configuration file not found, searched: {searched:?}")]
    FileNotFound { searched: Vec<PathBuf> },

    #[error("Failed to parse configuration: {message}")]
    Parse { message: String },

    #[error("Missing required field {field} in {context}")]
    MissingField { field: String, context: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

impl ConfigurationError {
    pub fn file_read_error(path: impl Into<String>, error: impl std::fmt::Display) -> Self {
        Self::FileRead {
            path: path.into(),
            message: error.to_string(),
        }
    }

    pub fn config_file_not_found(searched: Vec<PathBuf>) -> Self {
        Self::FileNotFound { searched }
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    pub fn missing_required_field(field: impl Into<String>, context: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
            context: context.into(),
        }
    }

    pub fn invalid_value(
        field: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            field: field.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }
}

impl From<config::ConfigError> for ConfigurationError {
    fn from(err: config::ConfigError) -> Self {
        match err {
            config::ConfigError::NotFound(field) => {
                Self::missing_required_field(field, "configuration sources")
            }
            other => Self::parse(other.to_string()),
        }
    }
}

pub type ConfigResult<T> = Result<T, ConfigurationError>;
