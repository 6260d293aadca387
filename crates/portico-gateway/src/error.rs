//! Gateway pipeline error types.

use http::StatusCode;
use portico_store::StoreError;
use thiserror::Error;

/// Failures the pipeline reports.
///
/// An unresolved redirect is deliberately not represented here: the redirect
/// follower returns the last-seen response, headers intact, and the caller
/// decides what a still-redirecting response means.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Unresolvable transform identifier or invalid dispatch target.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Syntax error, missing entry function, or malformed transform payload.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The transform raised while executing.
    #[error("Execution error: {0}")]
    Execution(String),

    /// The internal target executor failed.
    #[error("Dispatch error: {0}")]
    Dispatch(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl GatewayError {
    pub const fn error_type(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "configuration_error",
            Self::Validation(_) => "validation_error",
            Self::Execution(_) => "execution_error",
            Self::Dispatch(_) => "dispatch_error",
            Self::Store(_) => "store_error",
        }
    }

    /// Error kind for diagnostic summaries.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "ConfigurationError",
            Self::Validation(_) => "ValidationError",
            Self::Execution(_) => "ExecutionError",
            Self::Dispatch(_) => "DispatchError",
            Self::Store(_) => "StoreError",
        }
    }

    /// Message without the kind prefix.
    pub fn message(&self) -> String {
        match self {
            Self::Configuration(message)
            | Self::Validation(message)
            | Self::Execution(message)
            | Self::Dispatch(message) => message.clone(),
            Self::Store(error) => error.to_string(),
        }
    }

    /// Status for the error response. Nothing here maps to 2xx.
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Dispatch(_) => StatusCode::BAD_GATEWAY,
            Self::Configuration(_) | Self::Validation(_) | Self::Execution(_) | Self::Store(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_status_codes() {
        assert_eq!(
            GatewayError::Dispatch("unreachable".into()).status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            GatewayError::Validation("bad payload".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert!(!GatewayError::Execution("boom".into())
            .status_code()
            .is_success());
    }

    #[test]
    fn error_types() {
        assert_eq!(
            GatewayError::Configuration("x".into()).error_type(),
            "configuration_error"
        );
        assert_eq!(GatewayError::Execution("x".into()).kind(), "ExecutionError");
    }
}
