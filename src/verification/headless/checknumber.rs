//! Selector-driven oracle for the lookup page.

use super::page::{LookupPage, SelectorPage};
use crate::core::config::Config;
use crate::core::error::Result;
use crate::core::models::Verdict;
use crate::utils::phone::Candidate;
use crate::verification::{poll_for, Oracle};

use async_trait::async_trait;
use std::time::Duration;

/// Drives the lookup page check by check: reload, wait for the challenge,
/// type the number, submit, poll the status element.
///
/// Nothing is submitted until the challenge has cleared, and the status text
/// is only classified once it carries a recognizable answer.
pub struct CheckNumberOracle<P = SelectorPage> {
    page: Option<P>,
    challenge_timeout: Duration,
    result_timeout: Duration,
    poll_interval: Duration,
}

impl CheckNumberOracle<SelectorPage> {
    pub async fn connect(config: &Config) -> Result<Self> {
        let page = SelectorPage::open(config).await?;
        Ok(Self::with_page(page, config))
    }
}

impl<P: LookupPage> CheckNumberOracle<P> {
    pub(crate) fn with_page(page: P, config: &Config) -> Self {
        Self {
            page: Some(page),
            challenge_timeout: config.challenge_timeout,
            result_timeout: config.result_timeout,
            poll_interval: config.poll_interval,
        }
    }

    async fn run_check(&self, page: &P, candidate: &Candidate, label: &str) -> Result<Verdict> {
        page.reload().await?;

        let cleared = poll_for(self.challenge_timeout, self.poll_interval, move || async move {
            page.challenge_cleared().await.ok()?.then_some(())
        })
        .await;
        if cleared.is_none() {
            tracing::warn!(target: "oracle", "{} Challenge did not clear within {:?}.", label, self.challenge_timeout);
            return Ok(Verdict::Indeterminate);
        }
        tracing::debug!(target: "oracle", "{} Challenge cleared.", label);

        page.submit(&candidate.plus_notation()).await?;
        tracing::debug!(target: "oracle", "{} Submitted, waiting for result...", label);

        let verdict = poll_for(self.result_timeout, self.poll_interval, move || async move {
            let text = page.read_result().await.ok()?;
            tracing::trace!(target: "oracle", "{} Status text: '{}'", label, text);
            Verdict::classify(&text)
        })
        .await;

        Ok(verdict.unwrap_or_else(|| {
            tracing::warn!(target: "oracle", "{} No recognizable result within {:?}.", label, self.result_timeout);
            Verdict::Indeterminate
        }))
    }
}

#[async_trait]
impl<P: LookupPage> Oracle for CheckNumberOracle<P> {
    fn name(&self) -> &'static str {
        "checknumber"
    }

    async fn check(&mut self, candidate: &Candidate) -> Verdict {
        let label = format!("[{} {}]", self.name(), candidate);
        let Some(page) = self.page.as_ref() else {
            tracing::warn!(target: "oracle", "{} Session already shut down.", label);
            return Verdict::Indeterminate;
        };

        match self.run_check(page, candidate, &label).await {
            Ok(verdict) => {
                tracing::info!(target: "oracle", "{} Result: {}", label, verdict);
                verdict
            }
            Err(e) => {
                tracing::warn!(target: "oracle", "{} Interaction failed: {}", label, e);
                Verdict::Indeterminate
            }
        }
    }

    async fn shutdown(&mut self) {
        if let Some(page) = self.page.take() {
            page.close().await;
        }
    }
}
