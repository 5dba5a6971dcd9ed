//! Handles loading configuration from files and applying it to the Config struct.

use super::{Config, ConfigFile};
use anyhow::Context;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Loads configuration settings from a TOML file.
/// Returns the parsed `ConfigFile` content.
pub(crate) fn load_config_file(file_path: &str) -> anyhow::Result<ConfigFile> {
    let path = Path::new(file_path);
    if !path.is_file() {
        return Err(anyhow::anyhow!(
            "File not found or is not a file: {}",
            file_path
        ));
    }
    tracing::debug!(target: "config", "Attempting to read config file: {}", file_path);
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read configuration file: {}", file_path))?;

    let config_file_content: ConfigFile = toml::from_str(&content)
        .with_context(|| format!("Failed to parse TOML configuration from {}", file_path))?;

    tracing::debug!(target: "config", "Successfully parsed configuration file: {}", file_path);
    Ok(config_file_content)
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Applies settings from a parsed `ConfigFile` onto a mutable `Config` instance.
/// Used for both the file layer and the builder overrides.
pub(crate) fn apply_file_config(config: &mut Config, file_config: &ConfigFile) {
    // Store
    let store = &file_config.store;
    if let Some(url) = store.url.as_deref().and_then(non_empty) {
        config.store_url = url.trim_end_matches('/').to_string();
    }
    if let Some(key) = store.api_key.as_deref().and_then(non_empty) {
        config.store_api_key = key;
    }
    if let Some(table) = store.table.as_deref().and_then(non_empty) {
        config.table = table;
    }
    if let Some(column) = store.id_column.as_deref().and_then(non_empty) {
        config.id_column = column;
    }
    if let Some(column) = store.phone_column.as_deref().and_then(non_empty) {
        config.phone_column = column;
    }
    if let Some(ref column) = store.checked_column {
        config.checked_column = non_empty(column);
    }
    if let Some(timeout) = store.request_timeout {
        config.request_timeout = Duration::from_secs(timeout);
    }

    // Selection
    let selection = &file_config.selection;
    if let Some(mode) = selection.mode {
        config.selection_mode = mode;
    }
    if let Some(size) = selection.batch_size {
        config.batch_size = size;
    }
    if let Some(code) = selection.country_code.as_deref().and_then(non_empty) {
        config.country_code = code;
    }

    // Oracle
    let oracle = &file_config.oracle;
    if let Some(kind) = oracle.kind {
        config.oracle_kind = kind;
    }
    if let Some(url) = oracle.webdriver_url.as_deref().and_then(non_empty) {
        config.webdriver_url = url;
    }
    if let Some(url) = oracle.target_url.as_deref().and_then(non_empty) {
        config.target_url = url;
    }
    if let Some(headless) = oracle.headless {
        config.headless = headless;
    }
    if let Some(timeout) = oracle.challenge_timeout {
        config.challenge_timeout = Duration::from_secs(timeout);
    }
    if let Some(timeout) = oracle.result_timeout {
        config.result_timeout = Duration::from_secs(timeout);
    }
    if let Some(interval) = oracle.poll_interval_ms {
        config.poll_interval = Duration::from_millis(interval);
    }

    // Positional oracle
    let positional = &file_config.positional;
    if let Some(settle) = positional.page_settle {
        config.page_settle = Duration::from_secs(settle);
    }
    if let Some(attempts) = positional.attempts {
        config.oracle_attempts = attempts;
    }
    if let Some(point) = positional.input {
        config.input_position = point;
    }
    if let Some(point) = positional.button {
        config.button_position = point;
    }
    if let Some(point) = positional.result {
        config.result_position = point;
    }

    // Worker
    let worker = &file_config.worker;
    if let Some(pause) = worker.number_pause_ms {
        config.number_pause = Duration::from_millis(pause);
    }
    if let Some(min) = worker.min_lead_pause {
        config.lead_pause.0 = min;
    }
    if let Some(max) = worker.max_lead_pause {
        config.lead_pause.1 = max;
    }
    if let Some(secs) = worker.idle_sleep {
        config.idle_sleep = Duration::from_secs(secs);
    }
    if let Some(secs) = worker.read_error_sleep {
        config.read_error_sleep = Duration::from_secs(secs);
    }
    if let Some(secs) = worker.crash_pause {
        config.crash_pause = Duration::from_secs(secs);
    }
}
