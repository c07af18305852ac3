use super::shape::{CallbackPayload, RecordShape, default_prefix};
use crate::error::{CallbackDataError, CallbackResult};

/// Separator used when none is configured.
pub const DEFAULT_SEPARATOR: &str = ":";

/// Describes how a callback payload is laid out on the wire.
///
/// Wire format: `prefix` when there are no fields, otherwise
/// `prefix SEP value1 SEP ... SEP valueN`.
///
/// ```rust
/// use ferrogram_core::callback::CallbackDefinition;
///
/// let def = CallbackDefinition::new("order", ["action", "id"]);
/// assert_eq!(def.pack(["view", "42"]).unwrap(), "order:view:42");
///
/// let parsed = def.parse("order:view:42").unwrap();
/// assert_eq!(parsed.get("id"), Some("42"));
/// assert!(def.parse("order:view").is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackDefinition {
    prefix: String,
    separator: String,
    fields: Vec<String>,
}

impl CallbackDefinition {
    /// Creates a definition using the default `":"` separator.
    pub fn new<I, S>(prefix: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            prefix: prefix.into(),
            separator: DEFAULT_SEPARATOR.to_string(),
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    /// Creates a definition from raw parts without any validation.
    ///
    /// Invalid combinations surface as errors from [`pack`](Self::pack).
    pub fn from_parts(
        prefix: impl Into<String>,
        separator: impl Into<String>,
        fields: Vec<String>,
    ) -> Self {
        Self {
            prefix: prefix.into(),
            separator: separator.into(),
            fields,
        }
    }

    /// Replaces the separator. An empty separator is ignored.
    ///
    /// With a multi-character separator, `pack` also rejects values that
    /// start with a proper suffix or end with a proper prefix of it.
    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        let separator = separator.into();
        if !separator.is_empty() {
            self.separator = separator;
        }
        self
    }

    /// Derives a definition from a record shape.
    pub fn from_shape(shape: &RecordShape) -> CallbackResult<Self> {
        let Some(marker) = &shape.marker else {
            return Err(CallbackDataError::MarkerMissing(shape.type_name));
        };

        let prefix = match marker.prefix {
            Some(p) if !p.is_empty() => p.to_string(),
            _ => default_prefix(shape.type_name),
        };
        let separator = match marker.separator {
            Some(s) if !s.is_empty() => s.to_string(),
            _ => DEFAULT_SEPARATOR.to_string(),
        };
        let fields = shape
            .fields
            .iter()
            .filter(|f| f.is_packed())
            .map(|f| f.name.to_string())
            .collect();

        Ok(Self {
            prefix,
            separator,
            fields,
        })
    }

    /// Derives the definition of a payload type.
    pub fn of<T: CallbackPayload>() -> CallbackResult<Self> {
        Self::from_shape(&T::SHAPE)
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn separator(&self) -> &str {
        &self.separator
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    fn validate(&self) -> CallbackResult<()> {
        if self.separator.is_empty() {
            return Err(CallbackDataError::SeparatorEmpty);
        }
        if self.prefix.contains(&self.separator) {
            return Err(CallbackDataError::PrefixInvalid {
                prefix: self.prefix.clone(),
                separator: self.separator.clone(),
            });
        }
        Ok(())
    }

    /// Packs values given in field order.
    pub fn pack<I, S>(&self, values: I) -> CallbackResult<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.validate()?;

        let values: Vec<S> = values.into_iter().collect();
        if values.len() != self.fields.len() {
            return Err(CallbackDataError::KeyCountMismatch {
                expected: self.fields.len(),
                got: values.len(),
            });
        }
        if let Some(bad) = values
            .iter()
            .find(|v| collides(v.as_ref(), &self.separator))
        {
            return Err(CallbackDataError::ValueContainsSeparator {
                value: bad.as_ref().to_string(),
                separator: self.separator.clone(),
            });
        }

        let mut out = self.prefix.clone();
        for value in &values {
            out.push_str(&self.separator);
            out.push_str(value.as_ref());
        }
        Ok(out)
    }

    /// Packs the declared fields of a record, resolved by name.
    pub fn pack_record<T: CallbackPayload>(&self, record: &T) -> CallbackResult<String> {
        let values = self
            .fields
            .iter()
            .map(|name| {
                record
                    .field_text(name)
                    .ok_or_else(|| CallbackDataError::FieldNotFound(name.clone()))
            })
            .collect::<CallbackResult<Vec<_>>>()?;
        self.pack(values)
    }

    /// Parses a candidate string.
    ///
    /// Returns `None` when the prefix or the number of parts does not match.
    pub fn parse(&self, data: &str) -> Option<ParsedCallback> {
        if self.separator.is_empty() {
            return None;
        }
        if self.fields.is_empty() {
            return (data == self.prefix).then(ParsedCallback::default);
        }

        let payload = data
            .strip_prefix(self.prefix.as_str())?
            .strip_prefix(self.separator.as_str())?;
        let parts: Vec<&str> = payload.split(self.separator.as_str()).collect();
        if parts.len() != self.fields.len() {
            return None;
        }

        Some(ParsedCallback {
            entries: self
                .fields
                .iter()
                .cloned()
                .zip(parts.into_iter().map(str::to_string))
                .collect(),
        })
    }

    /// Parses a candidate string into a fresh record.
    ///
    /// Every field must convert; otherwise `None` is returned.
    pub fn parse_record<T: CallbackPayload>(&self, data: &str) -> Option<T> {
        let parsed = self.parse(data)?;
        let mut record = T::default();
        for (name, raw) in parsed.iter() {
            if !record.set_field_text(name, raw) {
                return None;
            }
        }
        Some(record)
    }

    /// Parses into an existing record, which is only overwritten on success.
    pub fn parse_into<T: CallbackPayload>(&self, data: &str, target: &mut T) -> bool {
        match self.parse_record(data) {
            Some(record) => {
                *target = record;
                true
            }
            None => false,
        }
    }
}

/// Whether `value` would be split differently once joined with `separator`.
fn collides(value: &str, separator: &str) -> bool {
    if value.contains(separator) {
        return true;
    }
    separator
        .char_indices()
        .skip(1)
        .any(|(i, _)| value.starts_with(&separator[i..]) || value.ends_with(&separator[..i]))
}

/// Field values decoded from a callback payload, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedCallback {
    entries: Vec<(String, String)>,
}

impl ParsedCallback {
    /// Looks up a field value by name.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, value)| value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Converts into an unordered map.
    pub fn into_map(self) -> std::collections::HashMap<String, String> {
        self.entries.into_iter().collect()
    }
}
