//! Oracle adapters answering "is this number registered?".
//!
//! Every adapter implements [`Oracle`]. Interaction faults are folded into
//! [`Verdict::Indeterminate`] inside the adapter, so callers only ever see a
//! verdict.

pub mod fallback;
pub mod headless;

use crate::core::config::{Config, OracleKind};
use crate::core::error::Result;
use crate::core::models::Verdict;
use crate::utils::phone::Candidate;

use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, Instant};

pub use fallback::{check_with_fallback, FallbackOutcome};
pub use headless::{CheckNumberOracle, LookupPage, PositionalOracle, PositionalPage, SelectorPage};

/// Exclusive handle on an external lookup service. `&mut self` keeps at most
/// one check in flight per session.
#[async_trait]
pub trait Oracle: Send {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Looks up one candidate. Never fails; faults map to `Indeterminate`.
    async fn check(&mut self, candidate: &Candidate) -> Verdict;

    /// Releases the underlying session. Safe to call more than once; only the
    /// first call does anything.
    async fn shutdown(&mut self);
}

/// Opens a WebDriver session and wraps it in the configured adapter.
pub async fn connect_oracle(config: &Config) -> Result<Box<dyn Oracle>> {
    let oracle: Box<dyn Oracle> = match config.oracle_kind {
        OracleKind::CheckNumber => Box::new(CheckNumberOracle::connect(config).await?),
        OracleKind::Positional => Box::new(PositionalOracle::connect(config).await?),
    };
    tracing::info!(target: "oracle", "Oracle '{}' ready at {}", oracle.name(), config.target_url);
    Ok(oracle)
}

/// Calls `poll` every `interval` until it yields a value or `timeout`
/// elapses. `poll` always runs at least once.
pub(crate) async fn poll_for<T, F, Fut>(timeout: Duration, interval: Duration, mut poll: F) -> Option<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Option<T>>,
{
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(value) = poll().await {
            return Some(value);
        }
        if Instant::now() >= deadline {
            return None;
        }
        sleep(interval).await;
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_poll_for_returns_first_value() {
        let calls = AtomicUsize::new(0);
        let result = poll_for(Duration::from_secs(1), Duration::from_millis(1), || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move { (n == 2).then_some("done") }
        })
        .await;
        assert_eq!(result, Some("done"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_poll_for_times_out() {
        let calls = AtomicUsize::new(0);
        let result: Option<()> = poll_for(Duration::from_millis(10), Duration::from_millis(2), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { None }
        })
        .await;
        assert!(result.is_none());
        assert!(calls.load(Ordering::SeqCst) >= 1);
    }

    #[tokio::test]
    async fn test_zero_timeout_polls_once() {
        let calls = AtomicUsize::new(0);
        let _: Option<()> = poll_for(Duration::ZERO, Duration::from_millis(1), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { None }
        })
        .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
