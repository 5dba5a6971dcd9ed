//! Lead store abstraction and its implementations.
//!
//! The worker only needs filtered reads and update-by-id. Filters are plain
//! values so the remote store can encode them as PostgREST query parameters
//! and the in-memory store can evaluate them directly.

pub mod dry_run;
pub mod memory;
pub mod postgrest;
pub mod selection;

use crate::core::config::Config;
use crate::core::error::{AppError, Result};
use crate::core::models::{Lead, LeadId, LeadUpdate};

use async_trait::async_trait;
use serde_json::{Map, Value};

pub use dry_run::DryRunStore;
pub use memory::MemoryStore;
pub use postgrest::PostgrestStore;
pub use selection::{Selection, SelectionPolicy};

/// Row predicate understood by every store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// Boolean column equals the value.
    Equals { column: String, value: bool },
    /// Column is not null.
    NotNull { column: String },
    /// Text column is not the empty string.
    NotEmpty { column: String },
    /// Text column starts with the prefix.
    StartsWith { column: String, prefix: String },
    /// Text column does not contain the substring anywhere.
    NotContains { column: String, needle: String },
}

impl Filter {
    pub fn column(&self) -> &str {
        match self {
            Filter::Equals { column, .. }
            | Filter::NotNull { column }
            | Filter::NotEmpty { column }
            | Filter::StartsWith { column, .. }
            | Filter::NotContains { column, .. } => column,
        }
    }

    /// Evaluates the predicate against a JSON row. Missing columns read as
    /// null, which fails every predicate except `NotContains`.
    pub fn matches(&self, row: &Map<String, Value>) -> bool {
        let value = row.get(self.column()).unwrap_or(&Value::Null);
        match self {
            Filter::Equals { value: expected, .. } => value.as_bool() == Some(*expected),
            Filter::NotNull { .. } => !value.is_null(),
            Filter::NotEmpty { .. } => value.as_str().map_or(true, |s| !s.is_empty()),
            Filter::StartsWith { prefix, .. } => {
                value.as_str().is_some_and(|s| s.starts_with(prefix.as_str()))
            }
            Filter::NotContains { needle, .. } => {
                value.as_str().map_or(true, |s| !s.contains(needle.as_str()))
            }
        }
    }
}

/// Filtered read and update-by-id against a table of leads.
#[async_trait]
pub trait LeadStore: Send + Sync {
    /// Returns at most `limit` rows matching every filter.
    async fn select(&self, filters: &[Filter], limit: usize) -> Result<Vec<Lead>>;

    /// Applies the update to the row with the given id.
    async fn update(&self, id: &LeadId, update: &LeadUpdate) -> Result<()>;
}

/// Column names of the lead table, and the mapping between JSON rows and
/// [`Lead`] values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeadColumns {
    pub id: String,
    pub phone: String,
    pub checked: Option<String>,
}

impl LeadColumns {
    pub fn from_config(config: &Config) -> Self {
        Self {
            id: config.id_column.clone(),
            phone: config.phone_column.clone(),
            checked: config
                .checked_column
                .clone()
                .filter(|_| config.uses_marker_column()),
        }
    }

    /// Columns for reading back processed leads: the checked column is kept
    /// whatever the selection mode.
    pub fn for_inspection(config: &Config) -> Self {
        Self {
            checked: config.checked_column.clone(),
            ..Self::from_config(config)
        }
    }

    /// Comma-separated column list for a PostgREST `select`.
    pub fn select_list(&self) -> String {
        let mut columns = vec![self.id.as_str(), self.phone.as_str()];
        if let Some(ref checked) = self.checked {
            columns.push(checked);
        }
        columns.join(",")
    }

    pub fn decode(&self, row: &Map<String, Value>) -> Result<Lead> {
        let id_value = row.get(&self.id).cloned().ok_or_else(|| {
            AppError::StoreRead(format!("Row is missing id column '{}'", self.id))
        })?;
        let id: LeadId = serde_json::from_value(id_value)?;

        let phone = match row.get(&self.phone) {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(other) => Some(other.to_string()),
        };

        let checked = self
            .checked
            .as_ref()
            .and_then(|column| row.get(column))
            .and_then(Value::as_bool);

        Ok(Lead { id, phone, checked })
    }

    /// JSON body for a PATCH carrying only the fields the update sets.
    pub fn encode_update(&self, update: &LeadUpdate) -> Map<String, Value> {
        let mut body = Map::new();
        if let Some(ref phone) = update.phone {
            body.insert(self.phone.clone(), Value::String(phone.clone()));
        }
        if update.mark_checked {
            if let Some(ref checked) = self.checked {
                body.insert(checked.clone(), Value::Bool(true));
            }
        }
        body
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn columns() -> LeadColumns {
        LeadColumns {
            id: "id".to_string(),
            phone: "telefone".to_string(),
            checked: Some("wpp_checked".to_string()),
        }
    }

    fn row(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_filter_matches() {
        let r = row(json!({"id": 1, "telefone": "5541991526358", "wpp_checked": false}));
        assert!(Filter::Equals { column: "wpp_checked".into(), value: false }.matches(&r));
        assert!(!Filter::Equals { column: "wpp_checked".into(), value: true }.matches(&r));
        assert!(Filter::NotNull { column: "telefone".into() }.matches(&r));
        assert!(Filter::NotEmpty { column: "telefone".into() }.matches(&r));
        assert!(Filter::StartsWith { column: "telefone".into(), prefix: "55".into() }.matches(&r));
        assert!(Filter::NotContains { column: "telefone".into(), needle: "✅".into() }.matches(&r));

        let empty = row(json!({"id": 2, "telefone": "", "wpp_checked": null}));
        assert!(!Filter::NotEmpty { column: "telefone".into() }.matches(&empty));
        assert!(!Filter::Equals { column: "wpp_checked".into(), value: false }.matches(&empty));
        assert!(!Filter::NotNull { column: "missing".into() }.matches(&empty));
    }

    #[test]
    fn test_decode_row() {
        let lead = columns()
            .decode(&row(json!({"id": "abc", "telefone": null, "wpp_checked": true})))
            .unwrap();
        assert_eq!(lead.id, LeadId::Text("abc".into()));
        assert_eq!(lead.phone, None);
        assert_eq!(lead.checked, Some(true));

        let missing_id = columns().decode(&row(json!({"telefone": "1"})));
        assert!(matches!(missing_id, Err(AppError::StoreRead(_))));
    }

    #[test]
    fn test_encode_update() {
        let body = columns().encode_update(&LeadUpdate {
            phone: Some("41991526358 ✅".into()),
            mark_checked: true,
        });
        assert_eq!(Value::Object(body), json!({"telefone": "41991526358 ✅", "wpp_checked": true}));

        let pattern_columns = LeadColumns { checked: None, ..columns() };
        let body = pattern_columns.encode_update(&LeadUpdate {
            phone: Some("1".into()),
            mark_checked: true,
        });
        assert_eq!(Value::Object(body), json!({"telefone": "1"}));
    }
}
