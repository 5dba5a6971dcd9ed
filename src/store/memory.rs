//! In-process lead table, evaluated with the same filters as the remote store.

use super::{Filter, LeadColumns, LeadStore};
use crate::core::config::Config;
use crate::core::error::{AppError, Result};
use crate::core::models::{Lead, LeadId, LeadUpdate};

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// A `Vec` of JSON rows behind a lock. Keeps a log of applied updates and can
/// be told to fail reads or writes, which makes it the store of choice for
/// exercising the worker without a network.
pub struct MemoryStore {
    columns: LeadColumns,
    rows: RwLock<Vec<Map<String, Value>>>,
    applied: RwLock<Vec<(LeadId, LeadUpdate)>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    reads: AtomicUsize,
}

impl MemoryStore {
    /// Builds a store from JSON rows. Non-object values are ignored.
    pub fn new(columns: LeadColumns, rows: Vec<Value>) -> Self {
        let rows = rows
            .into_iter()
            .filter_map(|v| match v {
                Value::Object(map) => Some(map),
                _ => None,
            })
            .collect();
        Self {
            columns,
            rows: RwLock::new(rows),
            applied: RwLock::new(Vec::new()),
            fail_reads: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
            reads: AtomicUsize::new(0),
        }
    }

    pub fn for_config(config: &Config, rows: Vec<Value>) -> Self {
        Self::new(LeadColumns::from_config(config), rows)
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Updates applied so far, in order.
    pub fn applied_updates(&self) -> Vec<(LeadId, LeadUpdate)> {
        self.applied.read().clone()
    }

    /// Number of `select` calls, failed ones included.
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Current state of one lead.
    pub fn lead(&self, id: &LeadId) -> Option<Lead> {
        let rows = self.rows.read();
        rows.iter()
            .filter_map(|row| self.columns.decode(row).ok())
            .find(|lead| &lead.id == id)
    }

    fn row_id(&self, row: &Map<String, Value>) -> Option<LeadId> {
        row.get(&self.columns.id)
            .cloned()
            .and_then(|v| serde_json::from_value(v).ok())
    }
}

#[async_trait]
impl LeadStore for MemoryStore {
    async fn select(&self, filters: &[Filter], limit: usize) -> Result<Vec<Lead>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(AppError::StoreRead("memory store set to fail reads".to_string()));
        }
        let rows = self.rows.read();
        rows.iter()
            .filter(|row| filters.iter().all(|f| f.matches(row)))
            .take(limit)
            .map(|row| self.columns.decode(row))
            .collect()
    }

    async fn update(&self, id: &LeadId, update: &LeadUpdate) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(AppError::StoreWrite(format!(
                "memory store set to fail writes (lead {})",
                id
            )));
        }
        let body = self.columns.encode_update(update);
        let mut rows = self.rows.write();
        let row = rows
            .iter_mut()
            .find(|row| self.row_id(row).as_ref() == Some(id))
            .ok_or_else(|| AppError::StoreWrite(format!("No lead with id {}", id)))?;
        row.extend(body);
        self.applied.write().push((id.clone(), update.clone()));
        Ok(())
    }
}
