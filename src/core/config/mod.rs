//! Runtime configuration: resolved [`Config`], the TOML [`ConfigFile`] shape
//! and the [`ConfigBuilder`] that merges them.

mod builder;
mod loading;
mod validation;

pub use builder::ConfigBuilder;

pub(crate) use crate::core::error::Result;

use rand::Rng;
use serde::Deserialize;
use std::time::Duration;

/// How eligible leads are recognized in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SelectionMode {
    /// `checked == false` and a non-empty phone field. The lead is marked
    /// checked after one pass regardless of per-number outcomes.
    MarkerColumn,
    /// Phone field starts with the country code and carries no marker glyph.
    Pattern,
}

/// Which oracle adapter drives the lookup page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OracleKind {
    /// Element lookups by id/xpath.
    CheckNumber,
    /// Screen-coordinate lookups with retry.
    Positional,
}

/// A point on the oracle page, in CSS pixels of the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ScreenPoint {
    pub x: i64,
    pub y: i64,
}

impl ScreenPoint {
    pub const fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }
}

/// Fully resolved configuration used by the store, the oracle adapters and
/// the worker loop.
#[derive(Debug, Clone)]
pub struct Config {
    // Store
    pub store_url: String,
    pub store_api_key: String,
    pub table: String,
    pub id_column: String,
    pub phone_column: String,
    pub checked_column: Option<String>,
    pub request_timeout: Duration,

    // Selection
    pub selection_mode: SelectionMode,
    pub batch_size: usize,
    pub country_code: String,

    // Oracle
    pub oracle_kind: OracleKind,
    pub webdriver_url: String,
    pub target_url: String,
    pub headless: bool,
    pub challenge_timeout: Duration,
    pub result_timeout: Duration,
    pub poll_interval: Duration,

    // Positional oracle
    pub page_settle: Duration,
    pub oracle_attempts: u32,
    pub input_position: ScreenPoint,
    pub button_position: ScreenPoint,
    pub result_position: ScreenPoint,

    // Worker pacing
    pub number_pause: Duration,
    pub lead_pause: (f32, f32),
    pub idle_sleep: Duration,
    pub read_error_sleep: Duration,
    pub crash_pause: Duration,

    pub loaded_config_path: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_url: String::new(),
            store_api_key: String::new(),
            table: "clientes".to_string(),
            id_column: "id".to_string(),
            phone_column: "telefone".to_string(),
            checked_column: Some("wpp_checked".to_string()),
            request_timeout: Duration::from_secs(30),

            selection_mode: SelectionMode::MarkerColumn,
            batch_size: 10,
            country_code: "55".to_string(),

            oracle_kind: OracleKind::CheckNumber,
            webdriver_url: "http://localhost:4444".to_string(),
            target_url: "https://checknumber.ai/en".to_string(),
            headless: false,
            challenge_timeout: Duration::from_secs(20),
            result_timeout: Duration::from_secs(20),
            poll_interval: Duration::from_secs(1),

            page_settle: Duration::from_secs(4),
            oracle_attempts: 2,
            input_position: ScreenPoint::new(1325, 524),
            button_position: ScreenPoint::new(1383, 678),
            result_position: ScreenPoint::new(1383, 880),

            number_pause: Duration::from_secs(1),
            lead_pause: (2.0, 3.0),
            idle_sleep: Duration::from_secs(15),
            read_error_sleep: Duration::from_secs(5),
            crash_pause: Duration::from_secs(5),

            loaded_config_path: None,
        }
    }
}

impl Config {
    /// Whether this configuration writes `checked = true` after each lead.
    pub fn uses_marker_column(&self) -> bool {
        self.selection_mode == SelectionMode::MarkerColumn
    }
}

/// Random pause between leads, drawn from `lead_pause`.
pub fn get_random_sleep_duration(config: &Config) -> Duration {
    let (min, max) = config.lead_pause;
    if max <= 0.0 {
        return Duration::ZERO;
    }
    if max <= min {
        return Duration::from_secs_f32(min);
    }
    let secs = rand::thread_rng().gen_range(min..=max);
    Duration::from_secs_f32(secs)
}

/// Shape of the optional TOML configuration file. Every field is optional;
/// present values override the defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    pub store: StoreSection,
    pub selection: SelectionSection,
    pub oracle: OracleSection,
    pub positional: PositionalSection,
    pub worker: WorkerSection,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StoreSection {
    pub url: Option<String>,
    pub api_key: Option<String>,
    pub table: Option<String>,
    pub id_column: Option<String>,
    pub phone_column: Option<String>,
    /// Empty string disables the marker column.
    pub checked_column: Option<String>,
    pub request_timeout: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SelectionSection {
    pub mode: Option<SelectionMode>,
    pub batch_size: Option<usize>,
    pub country_code: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct OracleSection {
    pub kind: Option<OracleKind>,
    pub webdriver_url: Option<String>,
    pub target_url: Option<String>,
    pub headless: Option<bool>,
    pub challenge_timeout: Option<u64>,
    pub result_timeout: Option<u64>,
    pub poll_interval_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PositionalSection {
    pub page_settle: Option<u64>,
    pub attempts: Option<u32>,
    pub input: Option<ScreenPoint>,
    pub button: Option<ScreenPoint>,
    pub result: Option<ScreenPoint>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WorkerSection {
    pub number_pause_ms: Option<u64>,
    pub min_lead_pause: Option<f32>,
    pub max_lead_pause: Option<f32>,
    pub idle_sleep: Option<u64>,
    pub read_error_sleep: Option<u64>,
    pub crash_pause: Option<u64>,
}

#[cfg(test)]
pub(crate) fn test_config() -> Config {
    ConfigBuilder::new()
        .skip_default_locations()
        .store_url("http://localhost:54321")
        .store_api_key("test-key")
        .no_pauses()
        .build()
        .expect("Failed to build test config")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_sleep_within_range() {
        let mut config = Config::default();
        config.lead_pause = (0.5, 1.0);
        for _ in 0..20 {
            let d = get_random_sleep_duration(&config);
            assert!(d >= Duration::from_secs_f32(0.5) && d <= Duration::from_secs_f32(1.0));
        }
        config.lead_pause = (0.0, 0.0);
        assert_eq!(get_random_sleep_duration(&config), Duration::ZERO);
    }
}
