//! Callback payload codec.
//!
//! Inline keyboard buttons carry a short string that is echoed back in the
//! callback query when the button is pressed. This module packs structured
//! values into that string and parses them back:
//!
//! - [`CallbackDefinition`] works on plain ordered string values.
//! - [`CallbackPayload`] records (usually `#[derive(CallbackData)]`) are
//!   packed and parsed field by field through [`CallbackValue`].
//!
//! ```rust,ignore
//! #[derive(Debug, Clone, Default, PartialEq, CallbackData)]
//! #[callback(prefix = "order")]
//! pub struct OrderCallback {
//!     pub action: String,
//!     pub id: i64,
//! }
//!
//! let data = pack_callback(&OrderCallback { action: "view".into(), id: 42 })?;
//! assert_eq!(data, "order:view:42");
//!
//! let back: OrderCallback = parse_callback(&data).unwrap();
//! assert_eq!(back.id, 42);
//! ```

mod definition;
mod shape;
mod value;

pub use definition::{CallbackDefinition, DEFAULT_SEPARATOR, ParsedCallback};
pub use shape::{CallbackMarker, CallbackPayload, FieldShape, RecordShape, default_prefix};
pub use value::CallbackValue;

use crate::error::CallbackResult;
use crate::types::InlineKeyboardButton;

/// Packs a payload record using its derived definition.
pub fn pack_callback<T: CallbackPayload>(payload: &T) -> CallbackResult<String> {
    CallbackDefinition::of::<T>()?.pack_record(payload)
}

/// Parses a payload record using its derived definition.
///
/// Returns `None` if the type did not opt in or the data does not match.
pub fn parse_callback<T: CallbackPayload>(data: &str) -> Option<T> {
    CallbackDefinition::of::<T>().ok()?.parse_record(data)
}

/// Builds an inline keyboard button carrying the packed payload.
pub fn callback_button<T: CallbackPayload>(
    text: impl Into<String>,
    payload: &T,
) -> CallbackResult<InlineKeyboardButton> {
    Ok(InlineKeyboardButton {
        text: text.into(),
        callback_data: Some(pack_callback(payload)?),
        url: None,
    })
}

/// Like [`callback_button`], for payloads known to be valid.
///
/// # Panics
///
/// Panics if the payload cannot be packed. This is a programming error
/// (a value containing the separator, or a type without a marker).
pub fn must_callback_button<T: CallbackPayload>(
    text: impl Into<String>,
    payload: &T,
) -> InlineKeyboardButton {
    match callback_button(text, payload) {
        Ok(button) => button,
        Err(e) => panic!("invalid callback payload for {}: {e}", T::SHAPE.type_name),
    }
}
