//! Todo lists, todos and their identifiers.
//!
//! Records are immutable snapshots of local rows. Every write goes through
//! [`crate::domain::TodoService`], which produces new snapshots rather than
//! mutating these in place.

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Maximum length, in characters, for list names and todo descriptions.
pub const TEXT_MAX_CHARS: usize = 200;

/// Maximum length of a record identifier.
const RECORD_ID_MAX_CHARS: usize = 64;

/// Validation errors for records and their identifiers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordValidationError {
    /// The identifier was empty once trimmed.
    #[error("record id must not be empty")]
    EmptyId,
    /// The identifier contained whitespace or exceeded the length cap.
    #[error("record id `{value}` is malformed")]
    MalformedId {
        /// Offending identifier.
        value: String,
    },
    /// A text field was empty once trimmed.
    #[error("{field} must not be empty")]
    EmptyText {
        /// Field name.
        field: &'static str,
    },
    /// A text field exceeded [`TEXT_MAX_CHARS`].
    #[error("{field} must be at most {max} characters")]
    TextTooLong {
        /// Field name.
        field: &'static str,
        /// Permitted maximum.
        max: usize,
    },
}

/// Globally unique, opaque record identifier shared with the remote store.
///
/// # Examples
/// ```
/// use client::domain::RecordId;
///
/// let id = RecordId::new("6f1c2b1e-8a0e-4d0f-9d43-0d6c8b1b9a11").expect("valid id");
/// assert_eq!(id.as_str(), "6f1c2b1e-8a0e-4d0f-9d43-0d6c8b1b9a11");
/// assert!(RecordId::new("  ").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RecordId(String);

impl RecordId {
    /// Validate and wrap an identifier.
    pub fn new(value: impl Into<String>) -> Result<Self, RecordValidationError> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(RecordValidationError::EmptyId);
        }
        if value.chars().any(char::is_whitespace) || value.chars().count() > RECORD_ID_MAX_CHARS
        {
            return Err(RecordValidationError::MalformedId { value });
        }
        Ok(Self(value))
    }

    /// Generate a fresh UUID v4 identifier.
    pub fn random() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Borrow the identifier text.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for RecordId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl TryFrom<String> for RecordId {
    type Error = RecordValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<RecordId> for String {
    fn from(value: RecordId) -> Self {
        value.0
    }
}

impl From<Uuid> for RecordId {
    fn from(value: Uuid) -> Self {
        Self(value.to_string())
    }
}

/// A todo list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TodoList {
    /// List identifier.
    pub id: RecordId,
    /// Display name, trimmed and non-empty.
    pub name: String,
    /// Creation instant.
    pub created_at: DateTime<Utc>,
    /// Last modification instant.
    pub updated_at: DateTime<Utc>,
}

/// A todo item owned by a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Todo {
    /// Todo identifier.
    pub id: RecordId,
    /// Owning list.
    pub list_id: RecordId,
    /// Description, trimmed and non-empty.
    pub description: String,
    /// Whether the todo is done.
    pub completed: bool,
    /// Creation instant.
    pub created_at: DateTime<Utc>,
    /// Last modification instant.
    pub updated_at: DateTime<Utc>,
}

/// Trim `value` and check it against the shared text rules.
///
/// # Examples
/// ```
/// use client::domain::validate_text;
///
/// assert_eq!(validate_text("name", "  Groceries ").as_deref(), Ok("Groceries"));
/// assert!(validate_text("name", "   ").is_err());
/// ```
pub fn validate_text(field: &'static str, value: &str) -> Result<String, RecordValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(RecordValidationError::EmptyText { field });
    }
    if trimmed.chars().count() > TEXT_MAX_CHARS {
        return Err(RecordValidationError::TextTooLong {
            field,
            max: TEXT_MAX_CHARS,
        });
    }
    Ok(trimmed.to_owned())
}

/// Render an instant the way both stores persist timestamps.
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use client::domain::format_timestamp;
///
/// let at = Utc.with_ymd_and_hms(2026, 3, 1, 9, 30, 0).single().expect("valid time");
/// assert_eq!(format_timestamp(at), "2026-03-01T09:30:00.000Z");
/// ```
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse a stored ISO-8601 timestamp back into UTC.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(raw).map(|at| at.with_timezone(&Utc))
}
