//! Record and request types for session summaries.

use serde::{Deserialize, Serialize};

/// A stored clinical session summary.
///
/// Optional fields are kept as `null` in storage and in responses so every
/// record carries the same seven keys.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    /// Identifier, assigned by the store on first insert.
    #[serde(default)]
    pub id: Option<String>,
    /// Free-text reference to the clinician the record belongs to.
    pub user: String,
    /// Summary text.
    pub summary: String,
    /// Session duration.
    #[serde(default)]
    pub duration: Option<i64>,
    /// Session type tag.
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    /// Free-text reference to the patient.
    pub patient: String,
    /// Session date, stored as given.
    #[serde(default)]
    pub date: Option<String>,
}

impl SessionSummary {
    /// Create a record with the required fields set and every optional field empty.
    #[must_use]
    pub fn new(
        user: impl Into<String>,
        summary: impl Into<String>,
        patient: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            user: user.into(),
            summary: summary.into(),
            duration: None,
            kind: None,
            patient: patient.into(),
            date: None,
        }
    }

    /// Set the identifier.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Set the duration.
    #[must_use]
    pub const fn with_duration(mut self, duration: i64) -> Self {
        self.duration = Some(duration);
        self
    }

    /// Set the type tag.
    #[must_use]
    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    /// Set the date.
    #[must_use]
    pub fn with_date(mut self, date: impl Into<String>) -> Self {
        self.date = Some(date.into());
        self
    }
}

/// Request to generate a summary from raw session notes. Never persisted.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct GenerateSessionSummary {
    /// Raw, unstructured notes.
    pub notes: String,
}
