//! Read-through store that logs writes instead of sending them.

use super::{Filter, LeadStore};
use crate::core::error::Result;
use crate::core::models::{Lead, LeadId, LeadUpdate};

use async_trait::async_trait;

/// Wraps another store: reads are delegated, updates are only logged.
///
/// Since nothing is persisted, marker-column mode keeps selecting the same
/// leads; use a batch size of 1 when watching a dry run.
pub struct DryRunStore<S> {
    inner: S,
}

impl<S: LeadStore> DryRunStore<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<S: LeadStore> LeadStore for DryRunStore<S> {
    async fn select(&self, filters: &[Filter], limit: usize) -> Result<Vec<Lead>> {
        self.inner.select(filters, limit).await
    }

    async fn update(&self, id: &LeadId, update: &LeadUpdate) -> Result<()> {
        tracing::info!(target: "store",
            "[dry-run] Would update lead {}: phone={:?}, mark_checked={}",
            id, update.phone, update.mark_checked
        );
        Ok(())
    }
}
