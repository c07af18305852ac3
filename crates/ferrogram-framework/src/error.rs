//! Error types for the Ferrogram framework.

use ferrogram_core::StorageError;
use thiserror::Error;

/// The error type carried through handlers, middleware and error handlers.
pub use tower::BoxError;

/// Result of a handler, a middleware chain or an error handler.
pub type HandlerResult = Result<(), BoxError>;

/// Errors that can occur during handler parameter extraction.
#[derive(Debug, Clone, Error)]
pub enum ExtractError {
    /// The update has no sender, so no per-user state exists.
    #[error("update has no user to resolve per-user state for")]
    NoUser,

    /// No callback payload of the requested type was published for this
    /// dispatch.
    #[error("callback payload '{0}' is not available in this dispatch")]
    CallbackMissing(&'static str),

    /// Reading per-user state failed.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Custom extraction error.
    #[error("{0}")]
    Custom(String),
}

impl ExtractError {
    /// Creates a custom extraction error.
    pub fn custom(msg: impl Into<String>) -> Self {
        Self::Custom(msg.into())
    }
}

/// Result type for extraction operations.
pub type ExtractResult<T> = Result<T, ExtractError>;
