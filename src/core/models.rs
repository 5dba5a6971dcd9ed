//! Data structures shared between the store, the oracle adapters and the worker.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Marker appended to a number the oracle reported as registered.
pub const FOUND_MARKER: &str = "✅";
/// Marker appended to a number the oracle reported as unregistered.
pub const NOT_FOUND_MARKER: &str = "❌";

/// Store-owned identifier of a lead. PostgREST tables may key rows by
/// integer or by uuid/text, so both shapes are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LeadId {
    Int(i64),
    Text(String),
}

impl fmt::Display for LeadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LeadId::Int(n) => write!(f, "{}", n),
            LeadId::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for LeadId {
    fn from(value: i64) -> Self {
        LeadId::Int(value)
    }
}

impl From<&str> for LeadId {
    fn from(value: &str) -> Self {
        LeadId::Text(value.to_string())
    }
}

/// A lead row as read from the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lead {
    pub id: LeadId,
    /// Raw comma-separated phone field, `None` when the column is null.
    pub phone: Option<String>,
    /// Only present when the table has a marker column.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checked: Option<bool>,
}

impl Lead {
    /// True when the phone field is null or blank.
    pub fn has_no_phone(&self) -> bool {
        self.phone.as_deref().map_or(true, |p| p.trim().is_empty())
    }
}

/// Write payload for a single lead. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LeadUpdate {
    pub phone: Option<String>,
    pub mark_checked: bool,
}

/// The oracle's classified answer for one candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Found,
    NotFound,
    /// Timeout, challenge never cleared, UI fault or unrecognized text.
    Indeterminate,
}

impl Verdict {
    /// Marker glyph persisted for this verdict. Indeterminate numbers are left
    /// bare so they are picked up again.
    pub fn marker(self) -> Option<&'static str> {
        match self {
            Verdict::Found => Some(FOUND_MARKER),
            Verdict::NotFound => Some(NOT_FOUND_MARKER),
            Verdict::Indeterminate => None,
        }
    }

    /// Reverse of [`Verdict::marker`].
    pub fn from_marker(marker: &str) -> Option<Self> {
        match marker {
            FOUND_MARKER => Some(Verdict::Found),
            NOT_FOUND_MARKER => Some(Verdict::NotFound),
            _ => None,
        }
    }

    /// Classifies free text read from the oracle's result surface.
    ///
    /// The negative phrase wins over the positive one, since "not found"
    /// contains "found". Returns `None` while the text is still unrecognized
    /// (empty, "checking...", etc.) so callers can keep polling.
    pub fn classify(text: &str) -> Option<Self> {
        let lowered = text.to_lowercase();
        if lowered.contains("not found") {
            Some(Verdict::NotFound)
        } else if lowered.contains("found") && !lowered.contains("not") {
            Some(Verdict::Found)
        } else {
            None
        }
    }

    pub fn is_resolved(self) -> bool {
        self != Verdict::Indeterminate
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Found => write!(f, "FOUND"),
            Verdict::NotFound => write!(f, "NOT_FOUND"),
            Verdict::Indeterminate => write!(f, "INDETERMINATE"),
        }
    }
}
