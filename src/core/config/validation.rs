//! Contains validation logic for the final Config struct.

use super::{Config, Result, SelectionMode};
use crate::core::error::AppError;
use url::Url;

/// Upper bound on leads fetched per poll.
pub(crate) const MAX_BATCH_SIZE: usize = 10;

/// Upper bound, in seconds, on either end of the between-lead pause.
const MAX_LEAD_PAUSE_SECS: f32 = 3600.0;

/// Validates the configuration settings after loading and potential overrides.
/// Mutates the config to clamp values where a sane fallback exists.
pub(crate) fn validate_config(config: &mut Config) -> Result<()> {
    if config.store_url.is_empty() {
        return Err(AppError::Config(
            "Store URL is required (store.url or --store-url).".to_string(),
        ));
    }
    Url::parse(&config.store_url)
        .map_err(|e| AppError::Config(format!("Invalid store URL '{}': {}", config.store_url, e)))?;
    if config.store_api_key.is_empty() {
        return Err(AppError::Config(
            "Store API key is required (store.api_key or --store-api-key).".to_string(),
        ));
    }
    Url::parse(&config.webdriver_url).map_err(|e| {
        AppError::Config(format!(
            "Invalid WebDriver URL '{}': {}",
            config.webdriver_url, e
        ))
    })?;
    Url::parse(&config.target_url)
        .map_err(|e| AppError::Config(format!("Invalid target URL '{}': {}", config.target_url, e)))?;

    if config.selection_mode == SelectionMode::MarkerColumn && config.checked_column.is_none() {
        return Err(AppError::Config(
            "Marker-column selection requires a checked column.".to_string(),
        ));
    }
    if config.country_code.is_empty() || !config.country_code.chars().all(|c| c.is_ascii_digit()) {
        return Err(AppError::Config(format!(
            "Country code must be digits only: '{}'",
            config.country_code
        )));
    }

    if config.batch_size == 0 {
        tracing::warn!(target: "config", "Batch size was set to 0. Setting to 1.");
        config.batch_size = 1;
    }
    if config.batch_size > MAX_BATCH_SIZE {
        tracing::warn!(target: "config",
            "Batch size ({}) > {}. Clamping to {}.",
            config.batch_size, MAX_BATCH_SIZE, MAX_BATCH_SIZE
        );
        config.batch_size = MAX_BATCH_SIZE;
    }
    if config.oracle_attempts == 0 {
        tracing::warn!(target: "config", "Oracle attempts was set to 0. Setting to 1.");
        config.oracle_attempts = 1;
    }
    if config.poll_interval.is_zero() {
        return Err(AppError::Config(
            "Oracle poll interval must be greater than zero.".to_string(),
        ));
    }

    let (min, max) = config.lead_pause;
    if !min.is_finite() || !max.is_finite() || min > MAX_LEAD_PAUSE_SECS || max > MAX_LEAD_PAUSE_SECS {
        return Err(AppError::Config(format!(
            "Lead pause must be a finite number of seconds up to {} (got {} - {}).",
            MAX_LEAD_PAUSE_SECS, min, max
        )));
    }
    if config.lead_pause.0 < 0.0 || config.lead_pause.1 < 0.0 {
        return Err(AppError::Config(
            "Lead pause durations cannot be negative.".to_string(),
        ));
    }
    if config.lead_pause.0 > config.lead_pause.1 {
        tracing::warn!(target: "config",
            "Min lead pause ({:.2}s) > Max lead pause ({:.2}s). Setting max = min.",
            config.lead_pause.0,
            config.lead_pause.1
        );
        config.lead_pause.1 = config.lead_pause.0;
    }
    if config.selection_mode == SelectionMode::Pattern && config.checked_column.is_some() {
        tracing::info!(target: "config", "Pattern selection ignores the checked column; it will not be written.");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Config {
        Config {
            store_url: "https://example.supabase.co".to_string(),
            store_api_key: "key".to_string(),
            ..Config::default()
        }
    }

    #[test]
    fn test_batch_size_is_clamped() {
        let mut config = base();
        config.batch_size = 50;
        validate_config(&mut config).unwrap();
        assert_eq!(config.batch_size, MAX_BATCH_SIZE);

        config.batch_size = 0;
        validate_config(&mut config).unwrap();
        assert_eq!(config.batch_size, 1);
    }

    #[test]
    fn test_store_credentials_required() {
        let mut config = Config::default();
        assert!(matches!(validate_config(&mut config), Err(AppError::Config(_))));

        let mut config = base();
        config.store_api_key.clear();
        assert!(validate_config(&mut config).is_err());

        let mut config = base();
        config.store_url = "not a url".to_string();
        assert!(validate_config(&mut config).is_err());
    }

    #[test]
    fn test_marker_mode_needs_checked_column() {
        let mut config = base();
        config.checked_column = None;
        assert!(validate_config(&mut config).is_err());

        config.selection_mode = SelectionMode::Pattern;
        assert!(validate_config(&mut config).is_ok());
    }

    #[test]
    fn test_non_finite_lead_pause_is_rejected() {
        for pause in [(1.0, f32::INFINITY), (f32::NAN, 2.0), (0.0, f32::NAN), (1.0, 1.0e9)] {
            let mut config = base();
            config.lead_pause = pause;
            assert!(
                matches!(validate_config(&mut config), Err(AppError::Config(_))),
                "{:?} accepted",
                pause
            );
        }
    }

    #[test]
    fn test_inverted_lead_pause_is_fixed() {
        let mut config = base();
        config.lead_pause = (4.0, 1.0);
        validate_config(&mut config).unwrap();
        assert_eq!(config.lead_pause, (4.0, 4.0));
    }
}
