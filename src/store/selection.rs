//! Decides which leads are eligible for validation.

use super::{Filter, LeadStore};
use crate::core::config::{Config, SelectionMode};
use crate::core::error::AppError;
use crate::core::models::{Lead, FOUND_MARKER, NOT_FOUND_MARKER};

/// Outcome of one selection read.
#[derive(Debug)]
pub enum Selection {
    /// At least one eligible lead.
    Leads(Vec<Lead>),
    /// The read succeeded but nothing is eligible right now.
    Drained,
    /// The store could not be read; the caller backs off and retries.
    ReadFailed(AppError),
}

/// Builds the eligibility filter for the configured mode and reads a batch.
#[derive(Debug, Clone)]
pub struct SelectionPolicy {
    mode: SelectionMode,
    phone_column: String,
    checked_column: Option<String>,
    country_code: String,
    batch_size: usize,
}

impl SelectionPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            mode: config.selection_mode,
            phone_column: config.phone_column.clone(),
            checked_column: config.checked_column.clone(),
            country_code: config.country_code.clone(),
            batch_size: config.batch_size,
        }
    }

    pub fn mode(&self) -> SelectionMode {
        self.mode
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Read filter expressing eligibility.
    ///
    /// Pattern mode cannot tell "never checked" apart from "checked, but no
    /// number resolved", so leads whose numbers all came back indeterminate
    /// are selected again on the next poll.
    pub fn filters(&self) -> Vec<Filter> {
        let phone = self.phone_column.clone();
        match self.mode {
            SelectionMode::MarkerColumn => {
                let mut filters = Vec::with_capacity(3);
                if let Some(ref checked) = self.checked_column {
                    filters.push(Filter::Equals {
                        column: checked.clone(),
                        value: false,
                    });
                }
                filters.push(Filter::NotNull {
                    column: phone.clone(),
                });
                filters.push(Filter::NotEmpty { column: phone });
                filters
            }
            SelectionMode::Pattern => vec![
                Filter::StartsWith {
                    column: phone.clone(),
                    prefix: self.country_code.clone(),
                },
                Filter::NotContains {
                    column: phone.clone(),
                    needle: FOUND_MARKER.to_string(),
                },
                Filter::NotContains {
                    column: phone,
                    needle: NOT_FOUND_MARKER.to_string(),
                },
            ],
        }
    }

    /// Reads the next batch. Never fails: read errors become
    /// [`Selection::ReadFailed`].
    pub async fn next_batch(&self, store: &dyn LeadStore) -> Selection {
        match store.select(&self.filters(), self.batch_size).await {
            Ok(leads) if leads.is_empty() => Selection::Drained,
            Ok(leads) => Selection::Leads(leads),
            Err(e) => {
                tracing::warn!(target: "store", "Failed to read eligible leads: {}", e);
                Selection::ReadFailed(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::test_config;
    use crate::core::models::{LeadId, LeadUpdate};
    use crate::store::{LeadStore, MemoryStore};
    use serde_json::json;

    #[test]
    fn test_marker_column_filters() {
        let policy = SelectionPolicy::from_config(&test_config());
        assert_eq!(
            policy.filters(),
            vec![
                Filter::Equals { column: "wpp_checked".into(), value: false },
                Filter::NotNull { column: "telefone".into() },
                Filter::NotEmpty { column: "telefone".into() },
            ]
        );
    }

    #[tokio::test]
    async fn test_pattern_mode_skips_annotated_fields() {
        let mut config = test_config();
        config.selection_mode = SelectionMode::Pattern;
        let store = MemoryStore::for_config(
            &config,
            vec![
                json!({"id": 1, "telefone": "5541991526358"}),
                json!({"id": 2, "telefone": "5541991526358 ✅"}),
                json!({"id": 3, "telefone": "5511987654321, 5511987654322 ❌"}),
                json!({"id": 4, "telefone": "41991526358"}),
                json!({"id": 5, "telefone": null}),
            ],
        );
        let Selection::Leads(leads) = SelectionPolicy::from_config(&config).next_batch(&store).await else {
            panic!("expected leads");
        };
        let ids: Vec<_> = leads.into_iter().map(|l| l.id).collect();
        assert_eq!(ids, vec![LeadId::Int(1)]);
    }

    #[tokio::test]
    async fn test_checked_lead_is_never_reselected() {
        let config = test_config();
        let store = MemoryStore::for_config(
            &config,
            vec![json!({"id": 7, "telefone": "41991526358", "wpp_checked": false})],
        );
        let policy = SelectionPolicy::from_config(&config);

        assert!(matches!(policy.next_batch(&store).await, Selection::Leads(ref l) if l.len() == 1));

        store
            .update(&LeadId::Int(7), &LeadUpdate { phone: None, mark_checked: true })
            .await
            .unwrap();

        for _ in 0..3 {
            assert!(matches!(policy.next_batch(&store).await, Selection::Drained));
        }
    }

    #[tokio::test]
    async fn test_read_failure_is_reported() {
        let config = test_config();
        let store = MemoryStore::for_config(&config, Vec::new());
        store.fail_reads(true);
        let policy = SelectionPolicy::from_config(&config);
        assert!(matches!(
            policy.next_batch(&store).await,
            Selection::ReadFailed(AppError::StoreRead(_))
        ));
    }

    #[tokio::test]
    async fn test_batch_is_bounded() {
        let config = test_config();
        let rows = (0..25)
            .map(|i| json!({"id": i, "telefone": "41991526358", "wpp_checked": false}))
            .collect();
        let store = MemoryStore::for_config(&config, rows);
        let policy = SelectionPolicy::from_config(&config);
        let Selection::Leads(leads) = policy.next_batch(&store).await else {
            panic!("expected leads");
        };
        assert_eq!(leads.len(), policy.batch_size());
        assert_eq!(leads.len(), 10);
    }
}
