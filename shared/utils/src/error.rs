use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum BomError {
    #[error("Database error: {message}")]
    Database { message: String },

    #[error("Validation error: {field} - {message}")]
    Validation { field: String, message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Not found: {resource}")]
    NotFound { resource: String },

    #[error("Internal server error: {message}")]
    Internal { message: String },
}

impl BomError {
    pub fn database(message: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
        }
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Database { .. } => "DATABASE_ERROR",
            Self::Validation { .. } => "VALIDATION_ERROR",
            Self::Configuration { .. } => "CONFIGURATION_ERROR",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Internal { .. } => "INTERNAL_SERVER_ERROR",
        }
    }

    pub fn http_status_code(&self) -> u16 {
        match self {
            Self::Database { .. } => 500,
            Self::Validation { .. } => 400,
            Self::Configuration { .. } => 500,
            Self::NotFound { .. } => 404,
            Self::Internal { .. } => 500,
        }
    }

    /// Recovers a `BomError` from an `anyhow` chain, wrapping anything else
    /// as an internal error.
    pub fn from_anyhow(error: &anyhow::Error) -> Self {
        error
            .chain()
            .find_map(|cause| cause.downcast_ref::<BomError>().cloned())
            .unwrap_or_else(|| Self::internal(format!("{:#}", error)))
    }
}

pub type BomResult<T> = Result<T, BomError>;

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl From<BomError> for ErrorResponse {
    fn from(error: BomError) -> Self {
        let message = match &error {
            BomError::Database { message }
            | BomError::Configuration { message }
            | BomError::Internal { message } => message.clone(),
            BomError::Validation { message, .. } => message.clone(),
            BomError::NotFound { resource } => resource.clone(),
        };
        Self {
            error: error.to_string(),
            code: error.error_code().to_string(),
            message,
            details: None,
        }
    }
}

// Conversion from common error types
impl From<sqlx::Error> for BomError {
    fn from(error: sqlx::Error) -> Self {
        match error {
            sqlx::Error::RowNotFound => Self::not_found("row"),
            other => Self::database(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for BomError {
    fn from(error: serde_json::Error) -> Self {
        Self::validation("JSON", error.to_string())
    }
}

impl From<config::ConfigError> for BomError {
    fn from(error: config::ConfigError) -> Self {
        Self::configuration(error.to_string())
    }
}
