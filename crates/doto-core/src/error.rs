//! Error types for DigitalOcean operations.
//!
//! The API reports most failures inside a `200 OK` JSON body, so the taxonomy separates
//! transport failures from failures the API itself reports, and both from responses that
//! arrive intact but lack the expected shape.

use thiserror::Error;

/// Main error type for doto operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Credentials file missing, unreadable or incomplete
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    HttpError(String),

    /// Remote host could not be reached
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Transport timed out
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// The JSON body reported a failure
    #[error("API error ({status}): {message}")]
    ApiError {
        /// Value of the body's `status` field
        status: String,
        /// Message supplied by the API
        message: String,
    },

    /// Expected key absent from an otherwise successful response
    #[error("Missing field in response: {0}")]
    MissingField(String),

    /// Body could not be decoded into the expected shape
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// Resource not found (non-JSON 404)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Request rejected by the transport layer (non-JSON 401/403)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Validation error
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Invalid endpoint
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),
}

/// Specialized result type for doto operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Returns the error code for this error type.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::ConfigError(_) => "CONFIG_ERROR",
            Self::HttpError(_) => "HTTP_ERROR",
            Self::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
            Self::Timeout(_) => "TIMEOUT",
            Self::ApiError { .. } => "API_ERROR",
            Self::MissingField(_) => "MISSING_FIELD",
            Self::ParseError(_) => "PARSE_ERROR",
            Self::NotFound(_) => "NOT_FOUND",
            Self::InvalidRequest(_) => "INVALID_REQUEST",
            Self::ValidationError(_) => "VALIDATION_ERROR",
            Self::InvalidEndpoint(_) => "INVALID_ENDPOINT",
        }
    }

    /// Returns true if the failure happened below the API, on the wire.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::HttpError(_) | Self::ServiceUnavailable(_) | Self::Timeout(_)
        )
    }

    /// Returns true if this error should be logged as a serious error.
    ///
    /// Structural failures mean the upstream API broke its own contract.
    #[must_use]
    pub const fn should_log(&self) -> bool {
        matches!(
            self,
            Self::ConfigError(_) | Self::MissingField(_) | Self::ParseError(_)
        )
    }
}

// Conversions from external error types
impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if err.is_connect() {
            Self::ServiceUnavailable(err.to_string())
        } else {
            Self::HttpError(err.to_string())
        }
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Self::InvalidEndpoint(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::ParseError(err.to_string())
    }
}

impl From<validator::ValidationErrors> for Error {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::ValidationError(err.to_string())
    }
}
