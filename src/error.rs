//! Error types for the RestPose client.
//!
//! All fallible operations in this crate return [`Result`], whose error type is
//! [`RestPoseError`]. Local configuration mistakes (bad slices, inconsistent
//! query targets, non-positive scale factors) are reported synchronously and
//! never touch the network. Transport and server errors are passed through
//! unchanged; this crate never retries.
//!
//! # Examples
//!
//! ```
//! use restpose::error::{RestPoseError, Result};
//!
//! fn example_operation() -> Result<()> {
//!     Err(RestPoseError::invalid_argument("Invalid input"))
//! }
//!
//! match example_operation() {
//!     Ok(_) => println!("Success"),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

use std::io;

use thiserror::Error;

/// The main error type for RestPose client operations.
#[derive(Error, Debug)]
pub enum RestPoseError {
    /// Queries bound to different targets were combined.
    #[error("Queries have inconsistent targets")]
    InconsistentTarget,

    /// An argument was outside its permitted domain.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// An operation was not permitted in the current configuration.
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// A slice used an unsupported step.
    #[error("Invalid slice: {0}")]
    InvalidSlice(String),

    /// An index or rank was outside the available range.
    #[error("Index out of range: {0}")]
    OutOfRange(String),

    /// A search was forced on a query with no target.
    #[error("Target of search not set")]
    MissingTarget,

    /// An object associated with a result could not be produced.
    #[error("Realisation error: {0}")]
    Realisation(String),

    /// The checkpoint is no longer known to the server.
    #[error("Checkpoint {0} expired")]
    CheckPointExpired(String),

    /// A wait did not complete before its deadline.
    #[error("Timeout: {0}")]
    Timeout(String),

    /// A wait was cancelled by the caller.
    #[error("Operation cancelled: {0}")]
    Cancelled(String),

    /// The server reported that a resource does not exist.
    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    /// The server returned a status other than the expected ones.
    #[error("Request failed with status {status}: {message}")]
    RequestFailed { status: u16, message: String },

    /// The server returned a body that was not JSON.
    #[error("Unexpected return content type: {0}")]
    UnexpectedContentType(String),

    /// Configuration errors.
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP transport errors.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// I/O errors (configuration files, output, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Errors carrying context, such as the file being read.
    #[error("{0:#}")]
    Anyhow(#[from] anyhow::Error),
}

/// Result type alias for operations that may fail with RestPoseError.
pub type Result<T> = std::result::Result<T, RestPoseError>;

impl RestPoseError {
    /// Create a new invalid argument error.
    pub fn invalid_argument<S: Into<String>>(msg: S) -> Self {
        RestPoseError::InvalidArgument(msg.into())
    }

    /// Create a new invalid operation error.
    pub fn invalid_operation<S: Into<String>>(msg: S) -> Self {
        RestPoseError::InvalidOperation(msg.into())
    }

    /// Create a new invalid slice error.
    pub fn invalid_slice<S: Into<String>>(msg: S) -> Self {
        RestPoseError::InvalidSlice(msg.into())
    }

    /// Create a new out of range error.
    pub fn out_of_range<S: Into<String>>(msg: S) -> Self {
        RestPoseError::OutOfRange(msg.into())
    }

    /// Create a new realisation error.
    pub fn realisation<S: Into<String>>(msg: S) -> Self {
        RestPoseError::Realisation(msg.into())
    }

    /// Create a new checkpoint expired error.
    pub fn checkpoint_expired<S: Into<String>>(check_id: S) -> Self {
        RestPoseError::CheckPointExpired(check_id.into())
    }

    /// Create a new timeout error.
    pub fn timeout<S: Into<String>>(msg: S) -> Self {
        RestPoseError::Timeout(msg.into())
    }

    /// Create a new cancelled error.
    pub fn cancelled<S: Into<String>>(msg: S) -> Self {
        RestPoseError::Cancelled(msg.into())
    }

    /// Create a new invalid config error.
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        RestPoseError::Config(msg.into())
    }

    /// Create a new request failed error.
    pub fn request_failed<S: Into<String>>(status: u16, msg: S) -> Self {
        RestPoseError::RequestFailed {
            status,
            message: msg.into(),
        }
    }

    /// True if this error reports an index or rank outside the result range.
    pub fn is_out_of_range(&self) -> bool {
        matches!(self, RestPoseError::OutOfRange(_))
    }
}
