//! Build-time schema of callback payload records.
//!
//! A [`RecordShape`] is normally emitted by `#[derive(CallbackData)]`; it can
//! also be written by hand for types that cannot use the derive.

/// Opt-in marker of a record, with its optional annotations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallbackMarker {
    /// Overrides the default prefix derived from the type name.
    pub prefix: Option<&'static str>,
    /// Overrides the default `":"` separator.
    pub separator: Option<&'static str>,
}

/// One declared field of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldShape {
    pub name: &'static str,
    /// Whether the field is externally visible (`pub`).
    pub visible: bool,
    /// Excluded from packing and parsing.
    pub skip: bool,
    /// Excluded from pattern matching only.
    pub skip_match: bool,
}

impl FieldShape {
    /// A visible field with no exclusions.
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            visible: true,
            skip: false,
            skip_match: false,
        }
    }

    /// Whether this field takes part in the wire format.
    pub fn is_packed(&self) -> bool {
        self.visible && !self.skip
    }

    /// Whether this field takes part in pattern matching.
    pub fn is_matched(&self) -> bool {
        self.visible && !self.skip_match
    }
}

/// Declared shape of a record type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordShape {
    pub type_name: &'static str,
    /// `None` means the record did not opt in.
    pub marker: Option<CallbackMarker>,
    /// Fields in declaration order.
    pub fields: &'static [FieldShape],
}

/// A record that can be carried as a callback payload.
///
/// Implement with `#[derive(CallbackData)]`:
///
/// ```rust,ignore
/// #[derive(Debug, Clone, Default, PartialEq, CallbackData)]
/// #[callback(prefix = "order")]
/// pub struct OrderCallback {
///     pub action: String,
///     pub id: i64,
///     #[callback(skip)]
///     pub cached: bool,
/// }
/// ```
pub trait CallbackPayload: Default + Send + Sync + 'static {
    /// Declared shape of the record.
    const SHAPE: RecordShape;

    /// Canonical text of the named packed field, or `None` if there is no
    /// such field.
    fn field_text(&self, name: &str) -> Option<String>;

    /// Assigns the named packed field from text. Returns `false` if the
    /// field is unknown or the text does not convert.
    fn set_field_text(&mut self, name: &str, raw: &str) -> bool;

    /// Whether `self` matches `pattern`.
    ///
    /// Pattern fields holding their type's default value are ignored, as are
    /// fields excluded from matching. Every other field must be equal.
    fn matches_pattern(&self, pattern: &Self) -> bool;
}

/// Prefix used when a record does not annotate one.
///
/// The lower-cased type name with a trailing `callback` and then `cb`
/// removed, or `"callback"` when nothing is left.
pub fn default_prefix(type_name: &str) -> String {
    let name = type_name.trim().to_lowercase();
    let name = name.strip_suffix("callback").unwrap_or(&name);
    let name = name.strip_suffix("cb").unwrap_or(name);
    if name.is_empty() {
        "callback".to_string()
    } else {
        name.to_string()
    }
}
