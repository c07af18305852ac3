//! Text conversion for callback payload fields.

/// A field type that can be carried inside a callback payload.
///
/// Conversion to text must be canonical so that packing then parsing yields
/// the same value. Parsing is strict: `"1"` is not a valid `bool`.
///
/// Custom types can opt in by implementing this trait directly, or through
/// [`impl_callback_value_via_str!`](crate::impl_callback_value_via_str) when
/// they already implement `Display` and `FromStr`.
pub trait CallbackValue: Sized {
    /// Canonical text form of the value.
    fn to_callback_text(&self) -> String;

    /// Parses the canonical text form, returning `None` on any error.
    fn from_callback_text(raw: &str) -> Option<Self>;
}

impl CallbackValue for String {
    fn to_callback_text(&self) -> String {
        self.clone()
    }

    fn from_callback_text(raw: &str) -> Option<Self> {
        Some(raw.to_string())
    }
}

impl CallbackValue for bool {
    fn to_callback_text(&self) -> String {
        self.to_string()
    }

    fn from_callback_text(raw: &str) -> Option<Self> {
        match raw {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        }
    }
}

/// `None` is carried as the empty string.
impl<T: CallbackValue> CallbackValue for Option<T> {
    fn to_callback_text(&self) -> String {
        self.as_ref()
            .map(CallbackValue::to_callback_text)
            .unwrap_or_default()
    }

    fn from_callback_text(raw: &str) -> Option<Self> {
        if raw.is_empty() {
            Some(None)
        } else {
            T::from_callback_text(raw).map(Some)
        }
    }
}

/// Implements [`CallbackValue`] for types with matching `Display` and
/// `FromStr` implementations.
#[macro_export]
macro_rules! impl_callback_value_via_str {
    ($($ty:ty),* $(,)?) => {
        $(
            impl $crate::callback::CallbackValue for $ty {
                fn to_callback_text(&self) -> ::std::string::String {
                    ::std::string::ToString::to_string(self)
                }

                fn from_callback_text(raw: &str) -> ::std::option::Option<Self> {
                    raw.parse().ok()
                }
            }
        )*
    };
}

impl_callback_value_via_str!(
    i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64, char
);
