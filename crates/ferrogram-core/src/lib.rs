//! Ferrogram Core - update model, callback codec and per-user state.
//!
//! This crate holds everything the dispatch framework builds on that does
//! not depend on how handlers are registered:
//!
//! - [`types`]: the Bot API update model consumed by routing
//! - [`bot`]: the [`BotApi`] collaborator handlers use to call the remote API
//! - [`callback`]: packing and parsing of inline button payloads
//! - [`state`]: per-user state labels, data bags and their storage
//! - [`error`]: error types shared by all Ferrogram crates

pub mod bot;
pub mod callback;
pub mod error;
pub mod state;
pub mod types;

pub use bot::{ApiResponse, BotApi, BotApiExt, BoxedBot, GetUpdates, parse_response};
pub use callback::{
    CallbackDefinition, CallbackMarker, CallbackPayload, CallbackValue, FieldShape,
    ParsedCallback, RecordShape, callback_button, must_callback_button, pack_callback,
    parse_callback,
};
pub use error::{
    ApiError, ApiResult, CallbackDataError, CallbackResult, ResponseParameters, StorageError,
    StorageResult,
};
pub use state::{
    DataMap, MemoryStorage, State, StateFilter, StateGroup, StateManager, StateStorage, UserContext,
    UserKey, UserStateManager,
};
pub use types::{
    CallbackQuery, Chat, ChatType, ChosenInlineResult, InlineKeyboardButton, InlineQuery, Message,
    Update, UpdateKind, User,
};
