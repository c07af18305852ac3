//! Procedural macros for the Ferrogram bot framework.
//!
//! This crate provides:
//!
//! - `#[derive(CallbackData)]` - Emits the callback payload schema and the
//!   per-field text conversions of a struct
//!
//! # CallbackData Derive Macro
//!
//! ```rust,ignore
//! use ferrogram::prelude::*;
//!
//! #[derive(Debug, Clone, Default, PartialEq, CallbackData)]
//! #[callback(prefix = "order")]
//! pub struct OrderCallback {
//!     pub action: String,
//!     pub id: i64,
//! }
//!
//! let data = pack_callback(&OrderCallback { action: "view".into(), id: 42 })?;
//! assert_eq!(data, "order:view:42");
//! ```

mod callback;

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

/// Derives `CallbackPayload` for a struct with named fields.
///
/// Deriving is the opt-in: every derived type carries a callback marker.
///
/// # Struct attributes
///
/// - `#[callback(prefix = "...")]` - Wire prefix (default: the lower-cased
///   type name without a trailing `callback` / `cb`)
/// - `#[callback(separator = "...")]` - Field separator (default: `":"`)
/// - `#[callback(crate = "...")]` - Path of the core crate (default:
///   `::ferrogram_core`)
///
/// # Field attributes
///
/// - `#[callback(skip)]` - Not packed or parsed
/// - `#[callback(skip_match)]` - Ignored by pattern matching
///
/// Only `pub` fields take part. Packed field types must implement
/// `CallbackValue`; matched field types must implement `Default` and
/// `PartialEq`.
#[proc_macro_derive(CallbackData, attributes(callback))]
pub fn derive_callback_data(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match callback::derive_callback_data(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}
