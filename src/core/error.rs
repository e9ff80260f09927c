//! Unified error handling for the plugin
//!
//! Every failure the bridge can report is one of these variants. The variant decides
//! how the failure surfaces to the orchestration engine: request errors become an
//! HTTP 400 with no node result, everything else becomes a terminal `Error` node.

use std::fmt;

/// Unified error types for the plugin
#[derive(Debug)]
pub enum BridgeError {
    /// Malformed HTTP request: wrong method, content type or body
    Request(String),

    /// Well-formed request whose plugin input is missing or unsupported
    Validation(String),

    /// An external service call (describe, start, poll, invoke) failed
    Collaborator(String),

    /// The remote execution finished unsuccessfully
    Execution(String),

    /// Configuration-related errors
    Configuration(String),

    /// Internal system errors
    Internal(String),

    /// JSON encoding or decoding errors
    Json(serde_json::Error),
}

impl BridgeError {
    /// Request errors are never turned into a node result.
    pub fn is_request_error(&self) -> bool {
        matches!(self, BridgeError::Request(_) | BridgeError::Json(_))
    }
}

impl fmt::Display for BridgeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BridgeError::Request(msg) => write!(f, "malformed request: {msg}"),
            BridgeError::Validation(msg) => write!(f, "malformed plugin input: {msg}"),
            BridgeError::Collaborator(msg) => write!(f, "service call failed: {msg}"),
            BridgeError::Execution(msg) => write!(f, "failed execution: {msg}"),
            BridgeError::Configuration(msg) => write!(f, "configuration error: {msg}"),
            BridgeError::Internal(msg) => write!(f, "internal error: {msg}"),
            BridgeError::Json(err) => write!(f, "failed to parse request body: {err}"),
        }
    }
}

impl std::error::Error for BridgeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BridgeError::Json(err) => Some(err),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for BridgeError {
    fn from(err: serde_json::Error) -> Self {
        BridgeError::Json(err)
    }
}

impl From<validator::ValidationErrors> for BridgeError {
    fn from(errs: validator::ValidationErrors) -> Self {
        BridgeError::Validation(errs.to_string())
    }
}

/// Result type alias for plugin operations
pub type BridgeResult<T> = std::result::Result<T, BridgeError>;

/// Helper trait for adding context to errors
pub trait ErrorContext<T> {
    fn with_context(self, context: &str) -> BridgeResult<T>;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: fmt::Display,
{
    fn with_context(self, context: &str) -> BridgeResult<T> {
        self.map_err(|e| BridgeError::Internal(format!("{context}: {e}")))
    }
}

#[macro_export]
macro_rules! validation_error {
    ($msg:expr) => {
        $crate::core::BridgeError::Validation($msg.to_string())
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::core::BridgeError::Validation(format!($fmt, $($arg)*))
    };
}

#[macro_export]
macro_rules! collaborator_error {
    ($msg:expr) => {
        $crate::core::BridgeError::Collaborator($msg.to_string())
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::core::BridgeError::Collaborator(format!($fmt, $($arg)*))
    };
}
