//! Unified error handling for fnexec
//!
//! Every collaborator error is mapped into [`ExecutorError`] so callers
//! only ever match on one taxonomy.

use std::fmt;

/// Unified error types for the executor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutorError {
    /// Function, environment, or service absent upstream
    NotFound(String),

    /// Backend cannot presently produce a service
    Unavailable(String),

    /// Joined an in-flight creation that failed, or found no
    /// registry entry after the creation signalled completion
    WaitFailed(String),

    /// Unexpected collaborator failure
    Internal(String),

    /// Configuration-related errors
    Configuration(String),

    /// Validation errors
    Validation(String),

    /// File and I/O errors
    Io(String),
}

impl fmt::Display for ExecutorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutorError::NotFound(msg) => write!(f, "Resource not found: {msg}"),
            ExecutorError::Unavailable(msg) => write!(f, "Backend unavailable: {msg}"),
            ExecutorError::WaitFailed(msg) => write!(f, "Wait for in-flight creation failed: {msg}"),
            ExecutorError::Internal(msg) => write!(f, "Internal error: {msg}"),
            ExecutorError::Configuration(msg) => write!(f, "Configuration error: {msg}"),
            ExecutorError::Validation(msg) => write!(f, "Validation error: {msg}"),
            ExecutorError::Io(msg) => write!(f, "I/O error: {msg}"),
        }
    }
}

impl std::error::Error for ExecutorError {}

impl ExecutorError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ExecutorError::NotFound(_))
    }
}

// Error conversions
impl From<std::io::Error> for ExecutorError {
    fn from(err: std::io::Error) -> Self {
        ExecutorError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for ExecutorError {
    fn from(err: serde_json::Error) -> Self {
        ExecutorError::Internal(format!("malformed JSON document: {err}"))
    }
}

impl From<serde_yaml::Error> for ExecutorError {
    fn from(err: serde_yaml::Error) -> Self {
        ExecutorError::Configuration(err.to_string())
    }
}

impl From<validator::ValidationErrors> for ExecutorError {
    fn from(err: validator::ValidationErrors) -> Self {
        ExecutorError::Validation(err.to_string())
    }
}

impl From<etcd_client::Error> for ExecutorError {
    fn from(err: etcd_client::Error) -> Self {
        ExecutorError::Internal(format!("etcd: {err}"))
    }
}

/// Result type alias for executor operations
pub type ExecutorResult<T> = std::result::Result<T, ExecutorError>;

/// Helper trait for adding context to errors
pub trait ErrorContext<T> {
    fn with_context(self, context: &str) -> ExecutorResult<T>;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: fmt::Display,
{
    fn with_context(self, context: &str) -> ExecutorResult<T> {
        self.map_err(|e| ExecutorError::Internal(format!("{context}: {e}")))
    }
}

/// Convenience macros for error creation
#[macro_export]
macro_rules! not_found_error {
    ($msg:expr) => {
        $crate::core::error::ExecutorError::NotFound($msg.to_string())
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::core::error::ExecutorError::NotFound(format!($fmt, $($arg)*))
    };
}

#[macro_export]
macro_rules! internal_error {
    ($msg:expr) => {
        $crate::core::error::ExecutorError::Internal($msg.to_string())
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::core::error::ExecutorError::Internal(format!($fmt, $($arg)*))
    };
}
