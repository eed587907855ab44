/// Line codec: one entity <-> one line of comma-delimited text
///
/// Field order per entity is the on-disk contract and must not change.
/// Free-text fields are escaped (see [`text`]) so that a record always
/// occupies exactly one line. Project task states are written as a single
/// bracketed sub-field: `[id1,Name1;id2,Name2]`, with `[]` for an empty list.
///
/// # Lenient bracket decoding
///
/// A missing, empty, or malformed bracket sub-field decodes to an empty state
/// list instead of failing the whole line. This keeps the rest of the record
/// readable but can hide corruption, so every lenient decode is logged at
/// `warn` level.
///
/// # Example
///
/// ```
/// use tasktrack_shared::codec::LineCodec;
/// use tasktrack_shared::models::{Role, User};
///
/// let user = User::new("alice", "secret", Role::Admin);
/// let line = user.to_line();
/// assert_eq!(User::from_line(&line).unwrap(), user);
/// ```

pub mod records;
pub mod text;

use chrono::NaiveDateTime;
use thiserror::Error;
use uuid::Uuid;

use crate::models::EntityKind;

pub use records::{encode_state, encode_states};

/// Field delimiter
pub const FIELD_SEPARATOR: char = ',';

/// Separator between elements of a bracketed list
pub const ELEMENT_SEPARATOR: char = ';';

/// Timestamp format: ISO-8601 local date-time without offset
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Codec error for a single line
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Line has the wrong number of fields
    #[error("{entity} line has {found} fields, expected {expected}")]
    FieldCount {
        entity: EntityKind,
        expected: &'static str,
        found: usize,
    },

    /// A field could not be decoded
    #[error("{entity} field '{field}' has invalid value '{value}': {reason}")]
    InvalidField {
        entity: EntityKind,
        field: &'static str,
        value: String,
        reason: String,
    },
}

/// Serialization contract between an entity and its stored line
pub trait LineCodec: Sized {
    /// Encodes the entity as a single line (without the trailing newline)
    fn to_line(&self) -> String;

    /// Decodes an entity from a single line
    ///
    /// # Errors
    ///
    /// Returns `ParseError` if the line is malformed
    fn from_line(line: &str) -> Result<Self, ParseError>;
}

/// Formats a timestamp for storage
pub fn format_time(time: &NaiveDateTime) -> String {
    time.format(TIMESTAMP_FORMAT).to_string()
}

/// Extracts the record id from the first field of a line, if it is one
///
/// Used to tell a corrupt record apart from a missing one.
pub fn leading_id(line: &str) -> Option<Uuid> {
    text::split_fields_n(line, FIELD_SEPARATOR, 2)
        .first()
        .and_then(|raw| Uuid::parse_str(raw).ok())
}

pub(crate) fn parse_uuid(
    entity: EntityKind,
    field: &'static str,
    raw: &str,
) -> Result<Uuid, ParseError> {
    Uuid::parse_str(raw).map_err(|e| ParseError::InvalidField {
        entity,
        field,
        value: raw.to_string(),
        reason: e.to_string(),
    })
}

pub(crate) fn parse_time(
    entity: EntityKind,
    field: &'static str,
    raw: &str,
) -> Result<NaiveDateTime, ParseError> {
    NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT).map_err(|e| ParseError::InvalidField {
        entity,
        field,
        value: raw.to_string(),
        reason: e.to_string(),
    })
}

/// Decodes an optional text field: empty means absent
pub(crate) fn optional_text(raw: &str) -> Option<String> {
    if raw.is_empty() {
        None
    } else {
        Some(text::unescape(raw))
    }
}

/// Encodes an optional text field: absent becomes an empty field
pub(crate) fn encode_optional(value: Option<&str>) -> String {
    value.map(text::escape).unwrap_or_default()
}
