//! Provides the `ConfigBuilder` for fluent configuration construction.

use super::loading::{apply_file_config, load_config_file};
use super::validation::validate_config;
use super::{Config, ConfigFile, OracleKind, Result, ScreenPoint, SelectionMode};
use crate::AppError;
use std::path::Path;
use std::time::Duration;

const DEFAULT_CONFIG_LOCATIONS: [&str; 2] = ["./phone-sentinel.toml", "./config.toml"];

/// Builder pattern for creating `Config` instances fluently.
///
/// Defaults are applied first, then the configuration file (explicit path or
/// one of the default locations), then overrides set on the builder, and
/// finally validation.
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
    config_file_path: Option<String>,
    skip_default_locations: bool,
    overrides: ConfigFile,
}

impl ConfigBuilder {
    /// Creates a new builder with default configuration values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Specify an optional configuration file path to load.
    pub fn config_file(mut self, path: impl Into<String>) -> Self {
        self.config_file_path = Some(path.into());
        self
    }

    /// Do not look for `./phone-sentinel.toml` and `./config.toml`.
    pub fn skip_default_locations(mut self) -> Self {
        self.skip_default_locations = true;
        self
    }

    pub fn store_url(mut self, value: impl Into<String>) -> Self {
        self.overrides.store.url = Some(value.into());
        self
    }
    pub fn store_api_key(mut self, value: impl Into<String>) -> Self {
        self.overrides.store.api_key = Some(value.into());
        self
    }
    pub fn table(mut self, value: impl Into<String>) -> Self {
        self.overrides.store.table = Some(value.into());
        self
    }
    pub fn phone_column(mut self, value: impl Into<String>) -> Self {
        self.overrides.store.phone_column = Some(value.into());
        self
    }
    pub fn checked_column(mut self, value: impl Into<String>) -> Self {
        self.overrides.store.checked_column = Some(value.into());
        self
    }
    pub fn request_timeout(mut self, duration: Duration) -> Self {
        self.overrides.store.request_timeout = Some(duration.as_secs());
        self
    }
    pub fn selection_mode(mut self, mode: SelectionMode) -> Self {
        self.overrides.selection.mode = Some(mode);
        self
    }
    pub fn batch_size(mut self, value: usize) -> Self {
        self.overrides.selection.batch_size = Some(value);
        self
    }
    pub fn country_code(mut self, value: impl Into<String>) -> Self {
        self.overrides.selection.country_code = Some(value.into());
        self
    }
    pub fn oracle_kind(mut self, kind: OracleKind) -> Self {
        self.overrides.oracle.kind = Some(kind);
        self
    }
    pub fn webdriver_url(mut self, url: impl Into<String>) -> Self {
        self.overrides.oracle.webdriver_url = Some(url.into());
        self
    }
    pub fn target_url(mut self, url: impl Into<String>) -> Self {
        self.overrides.oracle.target_url = Some(url.into());
        self
    }
    pub fn headless(mut self, enable: bool) -> Self {
        self.overrides.oracle.headless = Some(enable);
        self
    }
    pub fn challenge_timeout(mut self, duration: Duration) -> Self {
        self.overrides.oracle.challenge_timeout = Some(duration.as_secs());
        self
    }
    pub fn result_timeout(mut self, duration: Duration) -> Self {
        self.overrides.oracle.result_timeout = Some(duration.as_secs());
        self
    }
    pub fn oracle_attempts(mut self, value: u32) -> Self {
        self.overrides.positional.attempts = Some(value);
        self
    }
    pub fn positions(mut self, input: ScreenPoint, button: ScreenPoint, result: ScreenPoint) -> Self {
        self.overrides.positional.input = Some(input);
        self.overrides.positional.button = Some(button);
        self.overrides.positional.result = Some(result);
        self
    }
    pub fn lead_pause(mut self, min: f32, max: f32) -> Self {
        self.overrides.worker.min_lead_pause = Some(min);
        self.overrides.worker.max_lead_pause = Some(max);
        self
    }
    pub fn idle_sleep(mut self, duration: Duration) -> Self {
        self.overrides.worker.idle_sleep = Some(duration.as_secs());
        self
    }

    /// Zeroes every worker pause and backoff. Used for one-shot runs and tests.
    pub fn no_pauses(mut self) -> Self {
        self.overrides.worker.number_pause_ms = Some(0);
        self.overrides.worker.min_lead_pause = Some(0.0);
        self.overrides.worker.max_lead_pause = Some(0.0);
        self.overrides.worker.idle_sleep = Some(0);
        self.overrides.worker.read_error_sleep = Some(0);
        self.overrides.worker.crash_pause = Some(0);
        self
    }

    /// Builds the final `Config` object, applying defaults, file settings, overrides, and validation.
    pub fn build(mut self) -> Result<Config> {
        let mut loaded_path: Option<String> = None;

        if let Some(ref path) = self.config_file_path {
            match load_config_file(path) {
                Ok(file_config) => {
                    apply_file_config(&mut self.config, &file_config);
                    loaded_path = Some(path.clone());
                    tracing::info!(target: "config", "Loaded base configuration from specified file: {}", path);
                }
                Err(e) => {
                    tracing::error!(target: "config", "Failed to load specified config file '{}': {:#}", path, e);
                    return Err(AppError::Config(format!(
                        "Failed to load specified configuration file '{}': {:#}",
                        path, e
                    )));
                }
            }
        } else if !self.skip_default_locations {
            tracing::debug!(target: "config", "No config file specified, checking default locations.");
            for path_str in DEFAULT_CONFIG_LOCATIONS {
                if !Path::new(path_str).exists() {
                    continue;
                }
                match load_config_file(path_str) {
                    Ok(file_config) => {
                        apply_file_config(&mut self.config, &file_config);
                        loaded_path = Some(path_str.to_string());
                        tracing::info!(target: "config", "Loaded base configuration from default location: {}", path_str);
                        break;
                    }
                    Err(e) => {
                        tracing::warn!(target: "config", "Failed to load or parse default config '{}': {:#}", path_str, e);
                    }
                }
            }
            if loaded_path.is_none() {
                tracing::info!(target: "config", "No configuration file found. Using default values and overrides.");
            }
        }

        apply_file_config(&mut self.config, &self.overrides);
        self.config.loaded_config_path = loaded_path;
        validate_config(&mut self.config)?;

        tracing::debug!(target: "config", "Final configuration built successfully.");
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn temp_config_file(name: &str, contents: &str) -> String {
        let path = std::env::temp_dir().join(format!(
            "phone-sentinel-{}-{}.toml",
            name,
            std::process::id()
        ));
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path.to_string_lossy().into_owned()
    }

    #[test]
    fn test_overrides_win_over_file() {
        let path = temp_config_file(
            "overrides",
            r#"
[store]
url = "https://example.supabase.co"
api_key = "file-key"
table = "leads"

[selection]
mode = "pattern"
batch_size = 5

[positional]
attempts = 3
result = { x = 10, y = 20 }
"#,
        );

        let config = ConfigBuilder::new()
            .config_file(&path)
            .store_api_key("cli-key")
            .batch_size(1)
            .build()
            .unwrap();

        assert_eq!(config.store_url, "https://example.supabase.co");
        assert_eq!(config.store_api_key, "cli-key");
        assert_eq!(config.table, "leads");
        assert_eq!(config.selection_mode, SelectionMode::Pattern);
        assert_eq!(config.batch_size, 1);
        assert_eq!(config.oracle_attempts, 3);
        assert_eq!(config.result_position, ScreenPoint::new(10, 20));
        assert_eq!(config.loaded_config_path.as_deref(), Some(path.as_str()));
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let result = ConfigBuilder::new()
            .config_file("/nonexistent/phone-sentinel.toml")
            .store_url("http://localhost:54321")
            .store_api_key("k")
            .build();
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_no_pauses_zeroes_worker_timing() {
        let config = ConfigBuilder::new()
            .skip_default_locations()
            .store_url("http://localhost:54321")
            .store_api_key("k")
            .no_pauses()
            .build()
            .unwrap();
        assert_eq!(config.number_pause, Duration::ZERO);
        assert_eq!(config.idle_sleep, Duration::ZERO);
        assert_eq!(config.crash_pause, Duration::ZERO);
        assert_eq!(config.lead_pause, (0.0, 0.0));
    }

    #[test]
    fn test_infinite_lead_pause_fails_to_build() {
        let result = ConfigBuilder::new()
            .skip_default_locations()
            .store_url("http://localhost:54321")
            .store_api_key("k")
            .lead_pause(1.0, f32::INFINITY)
            .build();
        assert!(matches!(result, Err(AppError::Config(_))));
    }
}
