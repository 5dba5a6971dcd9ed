//! Coordinate-addressed oracle for the lookup page.
//!
//! The input, the submit button and the result line are located by viewport
//! position instead of element ids, through DOM queries at those points (see
//! [`PositionalPage`]). Values are set and clicks issued on the element found
//! at each point by injected scripts; no OS-level typing, pointer movement or
//! clipboard paste is involved. This keeps working when the page renames its
//! elements, as long as the layout holds.

use super::page::{LookupPage, PositionalPage};
use crate::core::config::Config;
use crate::core::error::Result;
use crate::core::models::Verdict;
use crate::utils::phone::Candidate;
use crate::verification::{poll_for, Oracle};

use async_trait::async_trait;
use std::time::Duration;
use tokio::time::sleep;

/// Reload, fill and submit, then read the result position. The whole cycle is
/// retried up to `attempts` times when it produces no recognizable result.
pub struct PositionalOracle<P = PositionalPage> {
    page: Option<P>,
    page_settle: Duration,
    result_timeout: Duration,
    poll_interval: Duration,
    attempts: u32,
}

impl PositionalOracle<PositionalPage> {
    pub async fn connect(config: &Config) -> Result<Self> {
        let page = PositionalPage::open(config).await?;
        Ok(Self::with_page(page, config))
    }
}

impl<P: LookupPage> PositionalOracle<P> {
    pub(crate) fn with_page(page: P, config: &Config) -> Self {
        Self {
            page: Some(page),
            page_settle: config.page_settle,
            result_timeout: config.result_timeout,
            poll_interval: config.poll_interval,
            attempts: config.oracle_attempts.max(1),
        }
    }

    /// One reload-fill-submit-read cycle. `Ok(None)` means the result never
    /// became recognizable.
    async fn attempt(&self, page: &P, candidate: &Candidate, label: &str) -> Result<Option<Verdict>> {
        page.reload().await?;
        if !self.page_settle.is_zero() {
            sleep(self.page_settle).await;
        }

        page.submit(&candidate.plus_notation()).await?;
        tracing::debug!(target: "oracle", "{} Submitted, waiting for result...", label);

        Ok(poll_for(self.result_timeout, self.poll_interval, move || async move {
            let text = page.read_result().await.ok()?;
            tracing::trace!(target: "oracle", "{} Text at result position: '{}'", label, text);
            Verdict::classify(&text)
        })
        .await)
    }
}

#[async_trait]
impl<P: LookupPage> Oracle for PositionalOracle<P> {
    fn name(&self) -> &'static str {
        "positional"
    }

    async fn check(&mut self, candidate: &Candidate) -> Verdict {
        let label = format!("[{} {}]", self.name(), candidate);
        let Some(page) = self.page.as_ref() else {
            tracing::warn!(target: "oracle", "{} Session already shut down.", label);
            return Verdict::Indeterminate;
        };

        for attempt in 1..=self.attempts {
            if attempt > 1 {
                tracing::info!(target: "oracle", "{} Attempt {}/{}...", label, attempt, self.attempts);
            }
            match self.attempt(page, candidate, &label).await {
                Ok(Some(verdict)) => {
                    tracing::info!(target: "oracle", "{} Result: {}", label, verdict);
                    return verdict;
                }
                Ok(None) => {
                    tracing::warn!(target: "oracle", "{} Timed out on attempt {}.", label, attempt);
                }
                Err(e) => {
                    tracing::warn!(target: "oracle", "{} Attempt {} failed: {}", label, attempt, e);
                }
            }
        }
        Verdict::Indeterminate
    }

    async fn shutdown(&mut self) {
        if let Some(page) = self.page.take() {
            page.close().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::test_config;
    use crate::utils::phone::normalize;
    use crate::verification::headless::page::testing::{FakePage, FakePageState};
    use std::sync::atomic::Ordering;
    use std::sync::Arc;

    fn oracle_for(state: &Arc<FakePageState>, attempts: u32) -> PositionalOracle<FakePage> {
        let mut config = test_config();
        config.page_settle = Duration::ZERO;
        config.result_timeout = Duration::from_millis(10);
        config.poll_interval = Duration::from_millis(1);
        config.oracle_attempts = attempts;
        PositionalOracle::with_page(FakePage(state.clone()), &config)
    }

    fn candidate() -> Candidate {
        normalize("5511987654321", "55").unwrap()
    }

    #[tokio::test]
    async fn test_first_recognized_answer_wins() {
        let state = FakePageState::with_status("Number not found on WhatsApp");
        let mut oracle = oracle_for(&state, 2);
        assert_eq!(oracle.check(&candidate()).await, Verdict::NotFound);
        assert_eq!(state.reloads.load(Ordering::SeqCst), 1);
        assert_eq!(*state.submitted.lock(), vec!["+5511987654321"]);
    }

    #[tokio::test]
    async fn test_retries_exactly_configured_attempts() {
        let state = FakePageState::with_status("");
        let mut oracle = oracle_for(&state, 2);
        assert_eq!(oracle.check(&candidate()).await, Verdict::Indeterminate);
        assert_eq!(state.reloads.load(Ordering::SeqCst), 2);
        assert_eq!(state.submits(), 2);

        let state = FakePageState::with_status("");
        let mut oracle = oracle_for(&state, 3);
        oracle.check(&candidate()).await;
        assert_eq!(state.submits(), 3);
    }

    #[tokio::test]
    async fn test_failing_submit_is_retried_then_indeterminate() {
        let state = FakePageState::with_status("Found");
        state.fail_submit.store(true, Ordering::SeqCst);
        let mut oracle = oracle_for(&state, 2);
        assert_eq!(oracle.check(&candidate()).await, Verdict::Indeterminate);
        assert_eq!(state.submits(), 2);
        assert_eq!(state.reads.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failing_read_is_indeterminate() {
        let state = FakePageState::with_status("Found");
        state.fail_read.store(true, Ordering::SeqCst);
        let mut oracle = oracle_for(&state, 2);
        assert_eq!(oracle.check(&candidate()).await, Verdict::Indeterminate);
        assert_eq!(state.reloads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_shutdown_closes_once() {
        let state = FakePageState::with_status("Found");
        let mut oracle = oracle_for(&state, 2);
        oracle.shutdown().await;
        oracle.shutdown().await;
        assert_eq!(state.closes.load(Ordering::SeqCst), 1);
    }
}
