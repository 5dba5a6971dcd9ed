//! Error type shared by the library.

use thiserror::Error;

/// Errors surfaced by the store, the oracle session and configuration.
///
/// Oracle interaction faults never reach the worker loop as errors: adapters
/// fold them into [`crate::Verdict::Indeterminate`]. The `Oracle` variant only
/// covers session setup and teardown.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Initialization error: {0}")]
    Initialization(String),

    #[error("Store read failed: {0}")]
    StoreRead(String),

    #[error("Store write failed: {0}")]
    StoreWrite(String),

    #[error("Oracle unavailable: {0}")]
    Oracle(String),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("WebDriver session error: {0}")]
    NewSession(#[from] fantoccini::error::NewSessionError),

    #[error("WebDriver command error: {0}")]
    Command(#[from] fantoccini::error::CmdError),
}

/// Library result alias.
pub type Result<T> = std::result::Result<T, AppError>;
