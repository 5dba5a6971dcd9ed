use crate::core::config::{get_random_sleep_duration, Config};
use crate::core::models::{Lead, LeadUpdate, Verdict};
use crate::store::{LeadStore, Selection, SelectionPolicy};
use crate::utils::annotation::PhoneField;
use crate::utils::phone::normalize;
use crate::verification::{check_with_fallback, Oracle};

use futures::FutureExt;
use serde::Serialize;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::sleep;

/// Where the loop currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    /// Waiting for eligible leads.
    Polling,
    /// Iterating a fetched batch.
    Processing,
}

/// Result of one poll-and-process iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Drained,
    ReadFailed,
    Processed { leads: usize, write_failures: usize },
}

/// What happened to a single lead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeadOutcome {
    /// Update written.
    Saved(LeadUpdate),
    /// Update composed but the store rejected it.
    WriteFailed(LeadUpdate),
    /// Nothing to do (no phone, pattern mode).
    Skipped,
}

/// Counters accumulated over the worker's lifetime.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WorkerStats {
    pub polls: u64,
    pub drained_polls: u64,
    pub read_failures: u64,
    pub leads_processed: u64,
    pub numbers_checked: u64,
    pub found: u64,
    pub not_found: u64,
    pub indeterminate: u64,
    pub fallbacks_tried: u64,
    pub entries_skipped: u64,
    pub writes: u64,
    pub write_failures: u64,
    pub crashes: u64,
}

impl WorkerStats {
    fn record(&mut self, verdict: Verdict) {
        self.numbers_checked += 1;
        match verdict {
            Verdict::Found => self.found += 1,
            Verdict::NotFound => self.not_found += 1,
            Verdict::Indeterminate => self.indeterminate += 1,
        }
    }
}

/// The long-running validator: select, check, annotate, persist, repeat.
///
/// Owns the oracle session for its whole lifetime. Use [`Worker::run_until`]
/// to get the session released on every exit path.
pub struct Worker {
    config: Arc<Config>,
    store: Arc<dyn LeadStore>,
    oracle: Box<dyn Oracle>,
    policy: SelectionPolicy,
    state: WorkerState,
    stats: WorkerStats,
    started: Instant,
}

impl Worker {
    pub fn new(config: Arc<Config>, store: Arc<dyn LeadStore>, oracle: Box<dyn Oracle>) -> Self {
        let policy = SelectionPolicy::from_config(&config);
        Self {
            config,
            store,
            oracle,
            policy,
            state: WorkerState::Polling,
            stats: WorkerStats::default(),
            started: Instant::now(),
        }
    }

    pub fn state(&self) -> WorkerState {
        self.state
    }

    pub fn stats(&self) -> &WorkerStats {
        &self.stats
    }

    fn transition(&mut self, next: WorkerState) {
        if self.state != next {
            tracing::debug!(target: "worker", "State {:?} -> {:?}", self.state, next);
            self.state = next;
        }
    }

    /// Runs until `signal` resolves, then shuts the oracle down. The session
    /// is released exactly once whichever branch finishes first.
    pub async fn run_until<F>(mut self, signal: F) -> WorkerStats
    where
        F: Future<Output = ()>,
    {
        tokio::select! {
            _ = self.run() => {}
            _ = signal => {
                tracing::info!(target: "worker", "Shutdown requested.");
            }
        }
        self.shutdown().await
    }

    /// Polls forever. Each iteration is isolated: a panic inside it is caught,
    /// logged and followed by `crash_pause` before the next poll.
    pub async fn run(&mut self) {
        tracing::info!(target: "worker",
            "Worker started ({:?} selection, batch size {}).",
            self.policy.mode(), self.policy.batch_size()
        );
        loop {
            let pause = match AssertUnwindSafe(self.tick()).catch_unwind().await {
                Ok(TickOutcome::Drained) => {
                    tracing::info!(target: "worker", "No eligible leads. Waiting {:?}...", self.config.idle_sleep);
                    self.config.idle_sleep
                }
                Ok(TickOutcome::ReadFailed) => {
                    tracing::warn!(target: "worker", "Store read failed. Retrying in {:?}.", self.config.read_error_sleep);
                    self.config.read_error_sleep
                }
                Ok(TickOutcome::Processed { .. }) => Duration::ZERO,
                Err(panic) => {
                    self.stats.crashes += 1;
                    self.transition(WorkerState::Polling);
                    tracing::error!(target: "worker",
                        "Unexpected failure in worker iteration: {}. Resuming in {:?}.",
                        panic_message(panic.as_ref()), self.config.crash_pause
                    );
                    self.config.crash_pause
                }
            };

            if pause.is_zero() {
                tokio::task::yield_now().await;
            } else {
                sleep(pause).await;
            }
        }
    }

    /// One selection read followed by processing of the returned batch.
    pub async fn tick(&mut self) -> TickOutcome {
        self.stats.polls += 1;
        let leads = match self.policy.next_batch(self.store.as_ref()).await {
            Selection::ReadFailed(_) => {
                self.stats.read_failures += 1;
                return TickOutcome::ReadFailed;
            }
            Selection::Drained => {
                self.stats.drained_polls += 1;
                return TickOutcome::Drained;
            }
            Selection::Leads(leads) => leads,
        };

        self.transition(WorkerState::Processing);
        let total = leads.len();
        tracing::info!(target: "worker", "Fetched {} lead(s) to validate.", total);

        let mut write_failures = 0;
        for (index, lead) in leads.iter().enumerate() {
            tracing::debug!(target: "worker", "Lead {}/{}", index + 1, total);
            if let LeadOutcome::WriteFailed(_) = self.process_lead(lead).await {
                write_failures += 1;
            }
            let pause = get_random_sleep_duration(&self.config);
            if !pause.is_zero() {
                tracing::trace!(target: "worker", "Sleeping {:?} before next lead.", pause);
                sleep(pause).await;
            }
        }

        self.transition(WorkerState::Polling);
        TickOutcome::Processed {
            leads: total,
            write_failures,
        }
    }

    /// Checks every number of one lead and writes the annotated field.
    ///
    /// In marker-column mode the lead is marked checked unconditionally, even
    /// when no number resolved or the field is empty. A failed write is logged
    /// and not retried here.
    pub async fn process_lead(&mut self, lead: &Lead) -> LeadOutcome {
        let label = format!("[lead {}]", lead.id);
        let mark_checked = self.config.uses_marker_column();

        let update = if lead.has_no_phone() {
            if !mark_checked {
                tracing::debug!(target: "worker", "{} No phone, skipping.", label);
                return LeadOutcome::Skipped;
            }
            tracing::info!(target: "worker", "{} No phone. Marking as checked.", label);
            LeadUpdate {
                phone: None,
                mark_checked: true,
            }
        } else {
            let field = PhoneField::parse(lead.phone.as_deref().unwrap_or_default());
            tracing::info!(target: "worker", "{} {} number(s) to check.", label, field.len());
            let annotated = self.annotate(&field, &label).await;
            LeadUpdate {
                phone: Some(annotated.render()),
                mark_checked,
            }
        };

        self.stats.leads_processed += 1;
        match self.store.update(&lead.id, &update).await {
            Ok(()) => {
                self.stats.writes += 1;
                tracing::info!(target: "worker", "{} Saved: {}", label,
                    update.phone.as_deref().unwrap_or("(phone unchanged)"));
                LeadOutcome::Saved(update)
            }
            Err(e) => {
                self.stats.write_failures += 1;
                tracing::error!(target: "worker", "{} Failed to save update: {}", label, e);
                LeadOutcome::WriteFailed(update)
            }
        }
    }

    /// Runs the oracle (with fallback) over each entry, in order. Entries
    /// without digits pass through untouched.
    async fn annotate(&mut self, field: &PhoneField, label: &str) -> PhoneField {
        let total = field.len();
        let mut entries = Vec::with_capacity(total);

        for (index, entry) in field.entries().iter().enumerate() {
            let Some(candidate) = normalize(&entry.text, &self.config.country_code) else {
                tracing::debug!(target: "worker", "{} Entry {} has no digits, kept as is.", label, index + 1);
                self.stats.entries_skipped += 1;
                entries.push(entry.clone());
                continue;
            };

            let outcome = check_with_fallback(self.oracle.as_mut(), &candidate).await;
            if outcome.alternative.is_some() {
                self.stats.fallbacks_tried += 1;
            }
            self.stats.record(outcome.verdict);
            tracing::info!(target: "worker", "{} {} -> {}", label, candidate, outcome.verdict);
            entries.push(entry.resolve(outcome.verdict));

            if index + 1 < total && !self.config.number_pause.is_zero() {
                sleep(self.config.number_pause).await;
            }
        }

        PhoneField::from_entries(entries)
    }

    /// Releases the oracle session and logs the run summary.
    pub async fn shutdown(mut self) -> WorkerStats {
        tracing::info!(target: "worker", "Shutting down oracle session '{}'...", self.oracle.name());
        self.oracle.shutdown().await;
        log_summary(&self.stats, self.started.elapsed());
        self.stats
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Logs a summary of the run using `tracing::info`.
fn log_summary(stats: &WorkerStats, duration: Duration) {
    tracing::info!("-------------------- Validation Summary --------------------");
    tracing::info!("Polls (drained / failed)     : {} ({} / {})", stats.polls, stats.drained_polls, stats.read_failures);
    tracing::info!("Leads processed              : {}", stats.leads_processed);
    tracing::info!("Numbers checked              : {}", stats.numbers_checked);
    tracing::info!("  - Found                    : {}", stats.found);
    tracing::info!("  - Not found                : {}", stats.not_found);
    tracing::info!("  - Indeterminate            : {}", stats.indeterminate);
    tracing::info!("  - Fallbacks tried          : {}", stats.fallbacks_tried);
    tracing::info!("Entries without digits       : {}", stats.entries_skipped);
    tracing::info!("Writes (failed)              : {} ({})", stats.writes, stats.write_failures);
    tracing::info!("Recovered iteration failures : {}", stats.crashes);
    tracing::info!("Uptime                       : {:.2?}", duration);
    tracing::info!("------------------------------------------------------------");
}
