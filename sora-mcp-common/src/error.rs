//! Error types for the common library.
//!
//! This module provides the error hierarchy shared by the Sora MCP crates,
//! built with `thiserror`.
//!
//! # Error Categories
//!
//! - `ConfigError`: Missing or invalid configuration
//! - `Error::Api`: Upstream API errors (includes endpoint and status)
//! - `Error::Validation`: Input validation failures
//! - `Error::Io`: File system operations

use serde::Deserialize;
use thiserror::Error;

/// Unified error type for the common library.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration errors (missing env vars, invalid values)
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// API errors with endpoint and HTTP status context
    ///
    /// A `status_code` of 0 means the request never produced a response
    /// (connection failure, timeout, body decode failure).
    #[error("API error for {endpoint} (HTTP {status_code}): {message}")]
    Api {
        /// The API endpoint that was called
        endpoint: String,
        /// HTTP status code returned by the API
        status_code: u16,
        /// Error message from the API or describing the failure
        message: String,
        /// Pretty-printed JSON body returned by the API, when it was JSON
        details: Option<String>,
    },

    /// Input validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// File system I/O errors
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Error envelope returned by the OpenAI API: `{"error": {"message": ...}}`.
#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: Option<ApiErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: Option<String>,
}

impl Error {
    /// Create a new API error with endpoint, status code, and message.
    ///
    /// # Example
    ///
    /// ```
    /// use sora_mcp_common::error::Error;
    ///
    /// let err = Error::api(
    ///     "https://api.openai.com/v1/videos",
    ///     500,
    ///     "Internal server error"
    /// );
    /// assert!(err.to_string().contains("api.openai.com"));
    /// assert!(err.to_string().contains("500"));
    /// ```
    pub fn api(endpoint: impl Into<String>, status_code: u16, message: impl Into<String>) -> Self {
        Error::Api {
            endpoint: endpoint.into(),
            status_code,
            message: message.into(),
            details: None,
        }
    }

    /// Build an API error from a non-success response body.
    ///
    /// The message is taken from `error.message` when the body is the
    /// standard JSON error envelope, otherwise the raw body is used. An
    /// empty body falls back to `fallback` (usually the HTTP reason phrase).
    ///
    /// # Example
    ///
    /// ```
    /// use sora_mcp_common::error::Error;
    ///
    /// let err = Error::from_response_body(
    ///     "https://api.openai.com/v1/videos",
    ///     400,
    ///     r#"{"error": {"message": "Invalid size"}}"#,
    ///     "Bad Request",
    /// );
    /// assert_eq!(err.user_message(), "Invalid size");
    /// ```
    pub fn from_response_body(
        endpoint: impl Into<String>,
        status_code: u16,
        body: &str,
        fallback: &str,
    ) -> Self {
        let json = serde_json::from_str::<serde_json::Value>(body).ok();

        let message = json
            .as_ref()
            .and_then(|value| serde_json::from_value::<ApiErrorEnvelope>(value.clone()).ok())
            .and_then(|envelope| envelope.error)
            .and_then(|error| error.message)
            .or_else(|| {
                let trimmed = body.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            })
            .unwrap_or_else(|| fallback.to_string());

        let details = json.and_then(|value| serde_json::to_string_pretty(&value).ok());

        Error::Api {
            endpoint: endpoint.into(),
            status_code,
            message,
            details,
        }
    }

    /// Create a new validation error.
    ///
    /// # Example
    ///
    /// ```
    /// use sora_mcp_common::error::Error;
    ///
    /// let err = Error::validation("prompt cannot be empty");
    /// assert!(err.to_string().contains("prompt cannot be empty"));
    /// ```
    pub fn validation(message: impl Into<String>) -> Self {
        Error::Validation(message.into())
    }

    /// The message shown to MCP clients.
    ///
    /// API errors surface only the upstream message; everything else uses
    /// the `Display` form.
    pub fn user_message(&self) -> String {
        match self {
            Error::Api { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    /// Pretty-printed upstream JSON body, if any.
    pub fn details(&self) -> Option<&str> {
        match self {
            Error::Api { details, .. } => details.as_deref(),
            _ => None,
        }
    }
}

/// Configuration errors.
///
/// These errors occur when loading or validating configuration from
/// environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required environment variable is not set
    #[error("Required environment variable {0} is not set")]
    MissingEnvVar(String),

    /// An environment variable has an invalid value
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl ConfigError {
    /// Create a new missing environment variable error.
    pub fn missing_env_var(name: impl Into<String>) -> Self {
        ConfigError::MissingEnvVar(name.into())
    }

    /// Create a new invalid value error.
    pub fn invalid_value(name: impl Into<String>, reason: impl Into<String>) -> Self {
        ConfigError::InvalidValue(name.into(), reason.into())
    }
}

/// Result type alias using the unified Error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_includes_endpoint_and_status() {
        let err = Error::api("https://api.openai.com/v1/videos", 500, "Internal error");
        let msg = err.to_string();
        assert!(msg.contains("api.openai.com"), "Should contain endpoint");
        assert!(msg.contains("500"), "Should contain status code");
        assert!(msg.contains("Internal error"), "Should contain message");
    }

    #[test]
    fn test_from_response_body_extracts_error_message() {
        let body = r#"{"error": {"message": "Billing hard limit reached", "type": "invalid_request_error"}}"#;
        let err = Error::from_response_body("https://api.openai.com/v1/videos", 400, body, "Bad Request");

        assert_eq!(err.user_message(), "Billing hard limit reached");
        let details = err.details().expect("JSON body should produce details");
        assert!(details.contains("invalid_request_error"));
        assert!(details.contains('\n'), "Details should be pretty-printed");
    }

    #[test]
    fn test_from_response_body_uses_raw_text() {
        let err = Error::from_response_body("https://api.openai.com/v1/videos", 502, "upstream gateway down", "Bad Gateway");
        assert_eq!(err.user_message(), "upstream gateway down");
        assert!(err.details().is_none());
    }

    #[test]
    fn test_from_response_body_json_without_message() {
        let err = Error::from_response_body("https://api.openai.com/v1/videos", 500, r#"{"status": "broken"}"#, "Internal Server Error");
        assert_eq!(err.user_message(), r#"{"status": "broken"}"#);
        assert!(err.details().is_some());
    }

    #[test]
    fn test_from_response_body_empty_uses_fallback() {
        let err = Error::from_response_body("https://api.openai.com/v1/videos/abc", 404, "  ", "Not Found");
        assert_eq!(err.user_message(), "Not Found");
        assert!(matches!(err, Error::Api { status_code: 404, .. }));
    }

    #[test]
    fn test_config_error_includes_var_name() {
        let err = ConfigError::missing_env_var("OPENAI_API_KEY");
        let msg = err.to_string();
        assert!(msg.contains("OPENAI_API_KEY"), "Should contain variable name");
    }

    #[test]
    fn test_error_from_config_error() {
        let config_err = ConfigError::missing_env_var("TEST_VAR");
        let err: Error = config_err.into();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_error_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
        assert_eq!(err.user_message(), "file not found");
    }

    #[test]
    fn test_validation_error() {
        let err = Error::validation("prompt too long");
        let msg = err.to_string();
        assert!(msg.contains("Validation"), "Should mention validation");
        assert!(msg.contains("prompt too long"), "Should contain message");
        assert_eq!(err.user_message(), msg);
    }
}
