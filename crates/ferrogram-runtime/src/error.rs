//! Runtime error types.

use thiserror::Error;

use crate::config::ConfigError;
use ferrogram_core::ApiError;

/// Errors that can occur while starting or running the bot.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Configuration could not be loaded or failed validation.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A Bot API call made by the runtime itself failed.
    #[error("Bot API error: {0}")]
    Api(#[from] ApiError),

    /// The HTTP client could not be constructed.
    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),

    /// No bot token was configured.
    #[error("Bot token is not configured (set bot.token or FERROGRAM_BOT__TOKEN)")]
    MissingToken,

    /// Installing an OS signal handler failed.
    #[error("Failed to listen for shutdown signal: {0}")]
    Signal(#[from] std::io::Error),
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
