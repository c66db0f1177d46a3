//! Error types for Typecast

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, TypecastError>;

#[derive(Error, Debug)]
pub enum TypecastError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(
        "Account '{account}' not found. Available: {}. Check that the API key is set in your .env file",
        format_available(.available)
    )]
    AccountNotFound {
        account: String,
        available: Vec<String>,
    },

    #[error("Validation failed: {}", format_validation(.message, .field))]
    Validation {
        message: String,
        field: Option<String>,
        /// Present when the remote service rejected the request
        detail: Option<ApiErrorDetail>,
    },

    #[error("Authentication failed: {0}. Check your API key and regenerate it if needed")]
    Authentication(ApiErrorDetail),

    #[error("Permission denied: {0}. The API key doesn't have permission for this operation")]
    Permission(ApiErrorDetail),

    #[error("Not found: {0}")]
    NotFound(ApiErrorDetail),

    #[error("Rate limit exceeded: {0}. Wait before trying again")]
    RateLimit(ApiErrorDetail),

    #[error("Service unavailable: {0}")]
    TransientService(ApiErrorDetail),

    #[error("Unexpected API response: {0}")]
    UnexpectedStatus(ApiErrorDetail),

    #[error("Operation cancelled for account '{account}'")]
    Cancelled { account: String },
}

fn format_available(available: &[String]) -> String {
    if available.is_empty() {
        "(none)".to_string()
    } else {
        available.join(", ")
    }
}

fn format_validation(message: &str, field: &Option<String>) -> String {
    match field {
        Some(field) => format!("{} (field: {})", message, field),
        None => message.to_string(),
    }
}

impl TypecastError {
    /// Shorthand for a locally detected validation failure
    pub fn validation(message: impl Into<String>) -> Self {
        TypecastError::Validation {
            message: message.into(),
            field: None,
            detail: None,
        }
    }

    /// Validation failure attributed to a specific request field
    pub fn validation_field(message: impl Into<String>, field: impl Into<String>) -> Self {
        TypecastError::Validation {
            message: message.into(),
            field: Some(field.into()),
            detail: None,
        }
    }

    /// Validation failure reported by the remote service (400/422)
    pub fn remote_validation(detail: ApiErrorDetail) -> Self {
        TypecastError::Validation {
            message: detail.message.clone(),
            field: detail.field.clone(),
            detail: Some(detail),
        }
    }

    /// Returns the appropriate exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            TypecastError::Validation { .. } | TypecastError::AccountNotFound { .. } => 3,
            TypecastError::Authentication(_) | TypecastError::Permission(_) => 2,
            TypecastError::Config(_) => 4,
            TypecastError::NotFound(_)
            | TypecastError::RateLimit(_)
            | TypecastError::TransientService(_)
            | TypecastError::UnexpectedStatus(_)
            | TypecastError::Cancelled { .. } => 1,
        }
    }

    /// Stable machine-readable tag for this error
    pub fn kind(&self) -> &'static str {
        match self {
            TypecastError::Config(_) => "configuration_error",
            TypecastError::AccountNotFound { .. } => "account_not_found_error",
            TypecastError::Validation { .. } => "validation_error",
            TypecastError::Authentication(_) => "authentication_error",
            TypecastError::Permission(_) => "permission_error",
            TypecastError::NotFound(_) => "not_found_error",
            TypecastError::RateLimit(_) => "rate_limit_error",
            TypecastError::TransientService(_) => "transient_service_error",
            TypecastError::UnexpectedStatus(_) => "unexpected_status_error",
            TypecastError::Cancelled { .. } => "cancelled",
        }
    }

    /// Whether a caller may safely retry the operation with backoff
    ///
    /// Nothing in this crate retries automatically.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TypecastError::RateLimit(_) | TypecastError::TransientService(_)
        )
    }

    /// Structured remote detail, when the error came from the API
    pub fn detail(&self) -> Option<&ApiErrorDetail> {
        match self {
            TypecastError::Authentication(d)
            | TypecastError::Permission(d)
            | TypecastError::NotFound(d)
            | TypecastError::RateLimit(d)
            | TypecastError::TransientService(d)
            | TypecastError::UnexpectedStatus(d) => Some(d),
            TypecastError::Validation { detail, .. } => detail.as_ref(),
            _ => None,
        }
    }

    /// Build a serializable record of this error
    pub fn to_record(&self) -> ErrorRecord {
        let detail = self.detail();
        let field = match self {
            TypecastError::Validation { field, .. } => field.clone(),
            _ => detail.and_then(|d| d.field.clone()),
        };

        ErrorRecord {
            kind: self.kind().to_string(),
            message: self.to_string(),
            status: detail.and_then(|d| d.status),
            field,
            code: detail.and_then(|d| d.code.clone()),
            retryable: self.is_retryable(),
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Failed to parse JSON config: {0}")]
    JsonParseError(#[from] serde_json::Error),

    #[error("Malformed credentials file {path}: {message}")]
    EnvFile { path: String, message: String },

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("Missing required field: {0}")]
    MissingField(String),
}

/// Structured information about a failed API call
///
/// Mirrors the remote error body `{error, message, details{field, code}}` and
/// adds the HTTP status and any `Retry-After` hint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    pub status: Option<u16>,
    pub error: Option<String>,
    pub message: String,
    pub field: Option<String>,
    pub code: Option<String>,
    pub retry_after: Option<u64>,
}

impl ApiErrorDetail {
    pub fn new(status: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            ..Default::default()
        }
    }
}

impl std::fmt::Display for ApiErrorDetail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(status) = self.status {
            write!(f, "HTTP {}: ", status)?;
        }
        write!(f, "{}", self.message)?;
        if let Some(field) = &self.field {
            write!(f, " (field: {})", field)?;
        }
        Ok(())
    }
}

/// Serializable, attributable record of a failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub kind: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    pub retryable: bool,
}
