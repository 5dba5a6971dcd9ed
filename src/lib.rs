//! # Phone Sentinel Core Library
//!
//! This crate validates lead phone numbers against a messaging-platform
//! lookup page and writes the verdicts back into the lead table as inline
//! markers (`✅` registered, `❌` not registered).
//!
//! It is designed to be used either directly as a library or via the
//! `phone-sentinel` command-line tool (which uses this library).

mod core;
mod store;
mod utils;
mod verification;

pub use crate::core::config::{
    Config, ConfigBuilder, ConfigFile, OracleKind, ScreenPoint, SelectionMode,
};
pub use crate::core::error::{AppError, Result};
pub use crate::core::models::{Lead, LeadId, LeadUpdate, Verdict, FOUND_MARKER, NOT_FOUND_MARKER};
pub use crate::core::worker::{LeadOutcome, TickOutcome, Worker, WorkerState, WorkerStats};
pub use crate::store::{
    DryRunStore, Filter, LeadColumns, LeadStore, MemoryStore, PostgrestStore, Selection,
    SelectionPolicy,
};
pub use crate::utils::annotation::{PhoneEntry, PhoneField};
pub use crate::utils::phone::{normalize, Candidate};
pub use crate::verification::{
    check_with_fallback, connect_oracle, CheckNumberOracle, FallbackOutcome, LookupPage, Oracle,
    PositionalOracle, PositionalPage, SelectorPage,
};

use std::sync::Arc;

/// Builds the store the worker talks to: the PostgREST table, wrapped in a
/// [`DryRunStore`] when writes should only be logged.
pub fn initialize_store(config: &Config, dry_run: bool) -> Result<Arc<dyn LeadStore>> {
    let remote = PostgrestStore::new(config)?;
    if dry_run {
        tracing::warn!(target: "store", "Dry run: updates will be logged, not written.");
        Ok(Arc::new(DryRunStore::new(remote)))
    } else {
        Ok(Arc::new(remote))
    }
}

/// PostgREST store for reading processed leads back, checked column
/// included in every selection mode.
pub fn initialize_inspection_store(config: &Config) -> Result<PostgrestStore> {
    PostgrestStore::with_columns(config, LeadColumns::for_inspection(config))
}

/// Connects the oracle and assembles a [`Worker`] around `store`.
pub async fn initialize_worker(config: Arc<Config>, store: Arc<dyn LeadStore>) -> Result<Worker> {
    let oracle = connect_oracle(&config).await?;
    Ok(Worker::new(config, store, oracle))
}

/// Checks one free-form phone string, fallback included.
///
/// Returns `None` when the input has no digits. The oracle session is left
/// open; the caller owns its shutdown.
pub async fn check_single_number(
    config: &Config,
    oracle: &mut dyn Oracle,
    raw: &str,
) -> Option<(Candidate, FallbackOutcome)> {
    let Some(candidate) = normalize(raw, &config.country_code) else {
        tracing::warn!(target: "check_single_number", "'{}' contains no digits.", raw);
        return None;
    };
    tracing::info!(target: "check_single_number", "Checking {}...", candidate);
    let outcome = check_with_fallback(oracle, &candidate).await;
    Some((candidate, outcome))
}

/// Reads up to `limit` leads already marked as checked.
pub async fn inspect_checked_leads(
    config: &Config,
    store: &dyn LeadStore,
    limit: usize,
) -> Result<Vec<Lead>> {
    let column = config.checked_column.as_deref().ok_or_else(|| {
        AppError::Config("Inspecting checked leads needs a checked column".to_string())
    })?;
    let filters = [Filter::Equals {
        column: column.to_string(),
        value: true,
    }];
    let leads = store.select(&filters, limit).await?;
    tracing::info!(target: "inspect", "Found {} checked lead(s).", leads.len());
    Ok(leads)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::test_config;
    use crate::verification::testing::ScriptedOracle;
    use serde_json::json;

    #[tokio::test]
    async fn test_check_single_number_applies_fallback() {
        let config = test_config();
        let mut oracle = ScriptedOracle::new(&[
            ("5511987654321", Verdict::NotFound),
            ("551187654321", Verdict::Found),
        ]);
        let (candidate, outcome) = check_single_number(&config, &mut oracle, "(11) 98765-4321")
            .await
            .unwrap();
        assert_eq!(candidate.digits(), "5511987654321");
        assert_eq!(outcome.verdict, Verdict::Found);
        assert_eq!(outcome.alternative.unwrap().digits(), "551187654321");
    }

    #[tokio::test]
    async fn test_check_single_number_without_digits() {
        let config = test_config();
        let mut oracle = ScriptedOracle::new(&[]);
        assert!(check_single_number(&config, &mut oracle, "n/a").await.is_none());
        assert!(oracle.calls.lock().is_empty());
    }

    #[tokio::test]
    async fn test_inspect_returns_only_checked_leads() {
        let config = test_config();
        let store = MemoryStore::for_config(
            &config,
            vec![
                json!({"id": 1, "telefone": "41991526358 ✅", "wpp_checked": true}),
                json!({"id": 2, "telefone": "4133334444", "wpp_checked": false}),
                json!({"id": 3, "telefone": "", "wpp_checked": true}),
            ],
        );
        let leads = inspect_checked_leads(&config, &store, 5).await.unwrap();
        let ids: Vec<_> = leads.iter().map(|l| l.id.clone()).collect();
        assert_eq!(ids, vec![LeadId::Int(1), LeadId::Int(3)]);

        let limited = inspect_checked_leads(&config, &store, 1).await.unwrap();
        assert_eq!(limited.len(), 1);
    }

    #[tokio::test]
    async fn test_inspect_keeps_checked_column_in_pattern_mode() {
        let mut config = test_config();
        config.selection_mode = SelectionMode::Pattern;
        let store = MemoryStore::new(
            LeadColumns::for_inspection(&config),
            vec![
                json!({"id": 1, "telefone": "5541991526358 ✅", "wpp_checked": true}),
                json!({"id": 2, "telefone": "5541991526359", "wpp_checked": false}),
            ],
        );
        let leads = inspect_checked_leads(&config, &store, 5).await.unwrap();
        assert_eq!(leads.len(), 1);
        assert_eq!(leads[0].checked, Some(true));
        assert_eq!(
            serde_json::to_value(&leads[0]).unwrap()["checked"],
            json!(true)
        );
    }
}
