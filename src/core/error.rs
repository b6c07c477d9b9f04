//! Unified error handling for pinglegacy
//!
//! Every failure a legacy call can surface is one variant of
//! [`OrchestrationError`]; the HTTP surface maps variants to status codes.

use std::fmt;

use http::StatusCode;

/// Error types for the orchestration core
#[derive(Debug)]
pub enum OrchestrationError {
    /// No mapping is configured for the requested legacy path
    MappingNotFound(String),

    /// A dependent target names an upstream url absent from its mapping
    UnresolvedDependency { target: String, depends_on: String },

    /// The item collection is empty or the field is absent
    FieldNotFound { field: String, detail: String },

    /// The field exists but cannot be rendered as text
    TypeMismatch { field: String, found: &'static str },

    /// Transport failure or non-success status from a backend
    Network { url: String, message: String },

    /// The backend body could not be decoded into the expected shape
    Decode { url: String, message: String },

    /// Configuration rejected at load time
    Configuration(String),

    /// A worker task failed to run to completion
    Internal(String),
}

impl OrchestrationError {
    /// Stable machine-readable name of the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            OrchestrationError::MappingNotFound(_) => "MappingNotFound",
            OrchestrationError::UnresolvedDependency { .. } => "UnresolvedDependency",
            OrchestrationError::FieldNotFound { .. } => "FieldNotFound",
            OrchestrationError::TypeMismatch { .. } => "TypeMismatch",
            OrchestrationError::Network { .. } => "NetworkError",
            OrchestrationError::Decode { .. } => "DecodeError",
            OrchestrationError::Configuration(_) => "ConfigurationError",
            OrchestrationError::Internal(_) => "InternalError",
        }
    }

    /// HTTP status returned to the legacy caller
    pub fn status_code(&self) -> StatusCode {
        match self {
            OrchestrationError::MappingNotFound(_) => StatusCode::NOT_FOUND,
            OrchestrationError::FieldNotFound { .. }
            | OrchestrationError::TypeMismatch { .. }
            | OrchestrationError::Network { .. }
            | OrchestrationError::Decode { .. } => StatusCode::BAD_GATEWAY,
            OrchestrationError::UnresolvedDependency { .. }
            | OrchestrationError::Configuration(_)
            | OrchestrationError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl fmt::Display for OrchestrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrchestrationError::MappingNotFound(legacy) => {
                write!(f, "No mapping found for legacy API: {legacy}")
            }
            OrchestrationError::UnresolvedDependency { target, depends_on } => {
                write!(f, "Target {target} depends on unknown target {depends_on}")
            }
            OrchestrationError::FieldNotFound { field, detail } => {
                write!(f, "Field '{field}' not found: {detail}")
            }
            OrchestrationError::TypeMismatch { field, found } => {
                write!(f, "Field '{field}' is a {found}, expected a scalar value")
            }
            OrchestrationError::Network { url, message } => {
                write!(f, "Network error calling {url}: {message}")
            }
            OrchestrationError::Decode { url, message } => {
                write!(f, "Unable to decode response from {url}: {message}")
            }
            OrchestrationError::Configuration(msg) => write!(f, "Configuration error: {msg}"),
            OrchestrationError::Internal(msg) => write!(f, "Internal error: {msg}"),
        }
    }
}

impl std::error::Error for OrchestrationError {}

impl From<tokio::task::JoinError> for OrchestrationError {
    fn from(err: tokio::task::JoinError) -> Self {
        OrchestrationError::Internal(format!("worker task failed: {err}"))
    }
}

/// Result type alias for orchestration operations
pub type OrchestrationResult<T> = std::result::Result<T, OrchestrationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names() {
        let err = OrchestrationError::MappingNotFound("/legacy/x".to_string());
        assert_eq!(err.kind(), "MappingNotFound");
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);

        let err = OrchestrationError::Network {
            url: "http://a".to_string(),
            message: "connection refused".to_string(),
        };
        assert_eq!(err.kind(), "NetworkError");
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_display() {
        let err = OrchestrationError::TypeMismatch {
            field: "items.0".to_string(),
            found: "record",
        };
        assert_eq!(
            err.to_string(),
            "Field 'items.0' is a record, expected a scalar value"
        );
    }
}
