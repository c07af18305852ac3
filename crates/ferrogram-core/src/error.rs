//! Error types shared across the Ferrogram crates.
//!
//! Framework-level errors (such as `ExtractError`) live in `ferrogram-framework`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

// =============================================================================
// Callback Data Errors
// =============================================================================

/// Errors raised by the callback payload codec.
///
/// Every variant signals misuse of the codec by the caller; none of them are
/// retryable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CallbackDataError {
    /// The configured separator is the empty string.
    #[error("callback data separator cannot be empty")]
    SeparatorEmpty,

    /// The prefix contains the separator and could never be parsed back.
    #[error("callback data prefix '{prefix}' contains separator '{separator}'")]
    PrefixInvalid {
        /// The offending prefix.
        prefix: String,
        /// The configured separator.
        separator: String,
    },

    /// The number of values differs from the number of declared fields.
    #[error("callback data key count mismatch: expected {expected}, got {got}")]
    KeyCountMismatch {
        /// Number of declared fields.
        expected: usize,
        /// Number of values supplied.
        got: usize,
    },

    /// A value contains the separator, or touches it closely enough that
    /// the packed string would split in the wrong place.
    #[error("callback data value '{value}' collides with separator '{separator}'")]
    ValueContainsSeparator {
        /// The offending value.
        value: String,
        /// The configured separator.
        separator: String,
    },

    /// A declared field could not be resolved on the record.
    #[error("callback data field not found: {0}")]
    FieldNotFound(String),

    /// The record shape does not opt in to callback derivation.
    #[error("callback data marker missing on type '{0}'")]
    MarkerMissing(&'static str),
}

/// Result type for callback codec operations.
pub type CallbackResult<T> = Result<T, CallbackDataError>;

// =============================================================================
// Storage Errors
// =============================================================================

/// Errors reported by a [`StateStorage`](crate::state::StateStorage) backend.
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    /// A stored value could not be converted to or from the requested type.
    #[error("state data conversion failed for key '{key}': {reason}")]
    Conversion {
        /// The data key being converted.
        key: String,
        /// Reason for failure.
        reason: String,
    },

    /// Backend-specific failure (I/O, connection, ...).
    #[error("state storage backend error: {0}")]
    Backend(String),
}

impl StorageError {
    /// Creates a backend error.
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }

    /// Creates a conversion error.
    pub fn conversion(key: impl Into<String>, reason: impl ToString) -> Self {
        Self::Conversion {
            key: key.into(),
            reason: reason.to_string(),
        }
    }
}

/// Result type for state storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

// =============================================================================
// API Errors
// =============================================================================

/// Well-known error codes returned by the Bot API.
pub mod codes {
    pub const BAD_REQUEST: i32 = 400;
    pub const UNAUTHORIZED: i32 = 401;
    pub const FORBIDDEN: i32 = 403;
    pub const NOT_FOUND: i32 = 404;
    pub const CONFLICT: i32 = 409;
    pub const TOO_MANY_REQUESTS: i32 = 429;
    pub const INTERNAL_SERVER_ERROR: i32 = 500;
}

/// Extra information attached to some API failures.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseParameters {
    /// The group has been migrated to a supergroup with this identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub migrate_to_chat_id: Option<i64>,
    /// Seconds left to wait before the request can be repeated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<i64>,
}

/// An error returned by the remote Bot API, or by the call leading to it.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// The server answered with `ok: false`.
    #[error("{}", format_remote(.code, .description, .parameters))]
    Remote {
        /// Numeric error code (mirrors HTTP status).
        code: i32,
        /// Human-readable description.
        description: String,
        /// Optional migration / rate-limit hints.
        parameters: Option<ResponseParameters>,
    },

    /// The request never produced a response.
    #[error("transport error: {0}")]
    Transport(String),

    /// The response could not be decoded.
    #[error("failed to decode API response: {0}")]
    Decode(String),
}

fn format_remote(
    code: &i32,
    description: &str,
    parameters: &Option<ResponseParameters>,
) -> String {
    let mut out = format!("Telegram API error [{code}]: {description}");
    if let Some(params) = parameters {
        if let Some(chat_id) = params.migrate_to_chat_id.filter(|id| *id != 0) {
            out.push_str(&format!(" (migrate to chat ID: {chat_id})"));
        }
        if let Some(secs) = params.retry_after.filter(|s| *s > 0) {
            out.push_str(&format!(" (retry after {secs} seconds)"));
        }
    }
    out
}

impl ApiError {
    /// Creates a remote error without parameters.
    pub fn remote(code: i32, description: impl Into<String>) -> Self {
        Self::Remote {
            code,
            description: description.into(),
            parameters: None,
        }
    }

    /// Creates a transport error.
    pub fn transport(msg: impl ToString) -> Self {
        Self::Transport(msg.to_string())
    }

    /// Creates a decode error.
    pub fn decode(msg: impl ToString) -> Self {
        Self::Decode(msg.to_string())
    }

    /// Attaches response parameters to a remote error.
    pub fn with_parameters(self, params: ResponseParameters) -> Self {
        match self {
            Self::Remote {
                code, description, ..
            } => Self::Remote {
                code,
                description,
                parameters: Some(params),
            },
            other => other,
        }
    }

    /// Returns the remote error code, if any.
    pub fn code(&self) -> Option<i32> {
        match self {
            Self::Remote { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Returns the remote description, if any.
    pub fn description(&self) -> Option<&str> {
        match self {
            Self::Remote { description, .. } => Some(description),
            _ => None,
        }
    }

    /// Returns the response parameters, if any.
    pub fn parameters(&self) -> Option<&ResponseParameters> {
        match self {
            Self::Remote { parameters, .. } => parameters.as_ref(),
            _ => None,
        }
    }

    /// Seconds to wait before retrying, when the server asked for it.
    pub fn retry_after(&self) -> Option<i64> {
        self.parameters().and_then(|p| p.retry_after)
    }

    fn has_code(&self, expected: i32) -> bool {
        self.code() == Some(expected)
    }

    fn description_contains(&self, needles: &[&str]) -> bool {
        let Some(description) = self.description() else {
            return false;
        };
        let lower = description.to_lowercase();
        needles.iter().any(|n| lower.contains(&n.to_lowercase()))
    }

    // ─── Status-code predicates ──────────────────────────────────────────────

    pub fn is_bad_request(&self) -> bool {
        self.has_code(codes::BAD_REQUEST)
    }

    pub fn is_unauthorized(&self) -> bool {
        self.has_code(codes::UNAUTHORIZED)
    }

    pub fn is_forbidden(&self) -> bool {
        self.has_code(codes::FORBIDDEN)
    }

    pub fn is_not_found(&self) -> bool {
        self.has_code(codes::NOT_FOUND)
    }

    pub fn is_conflict(&self) -> bool {
        self.has_code(codes::CONFLICT)
    }

    pub fn is_rate_limited(&self) -> bool {
        self.has_code(codes::TOO_MANY_REQUESTS)
    }

    /// Any 5xx code.
    pub fn is_server_error(&self) -> bool {
        self.code().is_some_and(|c| (500..600).contains(&c))
    }

    // ─── Description predicates (case-insensitive) ──────────────────────────

    pub fn is_message_text_empty(&self) -> bool {
        self.description_contains(&["message text is empty"])
    }

    pub fn is_message_too_long(&self) -> bool {
        self.description_contains(&["message is too long"])
    }

    pub fn is_chat_not_found(&self) -> bool {
        self.description_contains(&["chat not found"])
    }

    pub fn is_message_not_found(&self) -> bool {
        self.description_contains(&[
            "message to delete not found",
            "message to edit not found",
            "message not found",
        ])
    }

    pub fn is_message_cant_be_edited(&self) -> bool {
        self.description_contains(&["message can't be edited", "message to be edited was not found"])
    }

    pub fn is_message_cant_be_deleted(&self) -> bool {
        self.description_contains(&["message can't be deleted", "message to delete not found"])
    }

    /// The user blocked the bot or deactivated their account.
    pub fn is_bot_blocked(&self) -> bool {
        self.description_contains(&["bot was blocked by the user", "user is deactivated"])
            || (self.is_forbidden() && self.description_contains(&["blocked"]))
    }

    pub fn is_bot_kicked(&self) -> bool {
        self.description_contains(&["bot was kicked", "bot is not a member"])
    }

    pub fn is_invalid_file_id(&self) -> bool {
        self.description_contains(&["wrong file identifier", "file_id"])
    }

    pub fn is_button_data_invalid(&self) -> bool {
        self.description_contains(&["BUTTON_DATA_INVALID", "data is too long"])
    }
}

/// Result type for API calls.
pub type ApiResult<T> = Result<T, ApiError>;
