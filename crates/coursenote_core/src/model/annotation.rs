//! Annotation domain model.
//!
//! # Responsibility
//! - Define the record filed under a course subject by one owner.
//! - Describe the reminder policy attached to `AnnotationKind::Reminder`.
//!
//! # Invariants
//! - `subject_name` and `body` are non-empty after trimming.
//! - `Recurrence::DailyAt` is only legal on reminders.
//! - For `DailyAt`, `canonical_timestamp` records the authoring moment only;
//!   the fire schedule is always regenerated from the rule.

use chrono::{DateTime, Utc};
use serde::de::{self, Deserializer, Unexpected};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier assigned when an annotation is created.
pub type AnnotationId = Uuid;

/// Caller-supplied identifier of the user owning an annotation.
pub type OwnerId = i64;

/// What an annotation is about.
///
/// Serialized lowercase; deserialization goes through [`AnnotationKind::parse`]
/// so bodies and query strings accept the same spellings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnotationKind {
    /// Plain dated note, no reminder.
    #[default]
    Note,
    /// Note that asks the notifier for a fire.
    Reminder,
}

impl AnnotationKind {
    /// Stable lowercase label used in storage and query strings.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Note => "note",
            Self::Reminder => "reminder",
        }
    }

    /// Parses a storage/query label; case-insensitive, surrounding
    /// whitespace ignored.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "note" => Some(Self::Note),
            "reminder" => Some(Self::Reminder),
            _ => None,
        }
    }
}

impl<'de> Deserialize<'de> for AnnotationKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw)
            .ok_or_else(|| de::Error::invalid_value(Unexpected::Str(&raw), &"note|reminder"))
    }
}

impl Display for AnnotationKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reminder repetition policy.
///
/// Serialized as `"none"` or `{"dailyAt":{"hour":9,"minute":0}}`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Recurrence {
    /// Fires once at `canonical_timestamp`.
    #[default]
    None,
    /// Fires every day at `hour:minute` UTC wall-clock.
    DailyAt { hour: u32, minute: u32 },
}

impl Recurrence {
    /// Returns `(hour, minute)` for daily rules.
    pub fn daily_time(self) -> Option<(u32, u32)> {
        match self {
            Self::None => None,
            Self::DailyAt { hour, minute } => Some((hour, minute)),
        }
    }
}

/// Canonical annotation record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Annotation {
    /// Store-assigned stable ID.
    pub id: AnnotationId,
    /// Owner of the record. Filtering by owner is a query-time concern.
    pub owner_id: OwnerId,
    /// Course subject the annotation is filed under, trimmed.
    pub subject_name: String,
    /// Free-text content, trimmed.
    pub body: String,
    /// Absolute UTC instant the annotation is about.
    pub canonical_timestamp: DateTime<Utc>,
    pub kind: AnnotationKind,
    pub recurrence: Recurrence,
}

impl Annotation {
    /// Creates a record with a freshly generated ID.
    ///
    /// Text fields are trimmed; call [`Annotation::validate`] before persisting.
    pub fn new(
        owner_id: OwnerId,
        subject_name: impl AsRef<str>,
        body: impl AsRef<str>,
        canonical_timestamp: DateTime<Utc>,
        kind: AnnotationKind,
        recurrence: Recurrence,
    ) -> Self {
        Self::with_id(
            Uuid::new_v4(),
            owner_id,
            subject_name,
            body,
            canonical_timestamp,
            kind,
            recurrence,
        )
    }

    /// Creates a record reusing an existing ID (full-replace updates).
    pub fn with_id(
        id: AnnotationId,
        owner_id: OwnerId,
        subject_name: impl AsRef<str>,
        body: impl AsRef<str>,
        canonical_timestamp: DateTime<Utc>,
        kind: AnnotationKind,
        recurrence: Recurrence,
    ) -> Self {
        Self {
            id,
            owner_id,
            subject_name: subject_name.as_ref().trim().to_string(),
            body: body.as_ref().trim().to_string(),
            canonical_timestamp,
            kind,
            recurrence,
        }
    }

    /// Checks field-level invariants.
    ///
    /// # Errors
    /// - `EmptySubjectName` / `EmptyBody` for blank text.
    /// - `RecurrenceRequiresReminder` when a note carries a daily rule.
    /// - `RecurrenceOutOfRange` when the daily rule is not a valid wall time.
    pub fn validate(&self) -> Result<(), AnnotationValidationError> {
        if self.subject_name.trim().is_empty() {
            return Err(AnnotationValidationError::EmptySubjectName);
        }
        if self.body.trim().is_empty() {
            return Err(AnnotationValidationError::EmptyBody);
        }
        if let Recurrence::DailyAt { hour, minute } = self.recurrence {
            if self.kind != AnnotationKind::Reminder {
                return Err(AnnotationValidationError::RecurrenceRequiresReminder);
            }
            if hour > 23 || minute > 59 {
                return Err(AnnotationValidationError::RecurrenceOutOfRange { hour, minute });
            }
        }
        Ok(())
    }

    /// Lowercased subject used for case-insensitive matching.
    pub fn subject_key(&self) -> String {
        subject_key(&self.subject_name)
    }
}

/// Normalizes a subject name into its comparison key.
pub fn subject_key(subject_name: &str) -> String {
    subject_name.trim().to_lowercase()
}

/// Field-level validation failure. Each variant names the offending field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnnotationValidationError {
    EmptySubjectName,
    EmptyBody,
    RecurrenceRequiresReminder,
    RecurrenceOutOfRange { hour: u32, minute: u32 },
}

impl Display for AnnotationValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptySubjectName => write!(f, "subjectName must not be empty"),
            Self::EmptyBody => write!(f, "body must not be empty"),
            Self::RecurrenceRequiresReminder => write!(
                f,
                "recurrence dailyAt is only allowed when kind is `reminder`"
            ),
            Self::RecurrenceOutOfRange { hour, minute } => write!(
                f,
                "recurrence dailyAt {hour:02}:{minute:02} is not a valid wall-clock time"
            ),
        }
    }
}

impl Error for AnnotationValidationError {}
