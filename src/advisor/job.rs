//! # Periodic Index Selection Job
//!
//! The background driver around [`IndexSelection`]. Each invocation
//! reads the query history past the high-water timestamp and, once
//! enough new entries have accumulated, parses and binds them, drops the
//! currently existing indexes, runs the selection, issues create-index
//! commands for the recommendation, and advances the high-water mark.
//!
//! Collaborators stay behind narrow traits: [`AdvisorStorage`] supplies
//! the read-only transaction plus catalog reads, [`IndexRpc`] carries
//! the fire-and-forget create/drop commands. RPC failures are logged and
//! skipped; the next tick retries naturally because the commands are
//! recomputed from scratch. Catalog and transaction failures abort the
//! whole pass.

use super::error::AdvisorError;
use super::index_object::{IndexObject, Workload};
use super::selection::IndexSelection;
use super::what_if::WhatIfOptimizer;
use crate::config::AdvisorSettings;
use crate::history::QueryRecord;
use crate::schema::{Catalog, IndexId};
use crate::sql::Binder;
use bumpalo::Bump;
use eyre::{eyre, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

/// Storage-side entry point for one advisor pass.
pub trait AdvisorStorage {
    /// Begins the read-only transaction the pass runs under.
    fn begin(&self) -> Result<Box<dyn AdvisorTxn + '_>>;
}

/// The catalog reads an advisor pass performs, all under one
/// transaction.
pub trait AdvisorTxn {
    /// History entries with a timestamp strictly greater than
    /// `timestamp`.
    fn queries_after(&mut self, timestamp: u64) -> Result<Vec<QueryRecord>>;

    /// Ids of the currently existing physical indexes.
    fn existing_indexes(&mut self) -> Result<Vec<IndexId>>;

    fn commit(self: Box<Self>) -> Result<()>;

    fn rollback(self: Box<Self>) -> Result<()>;
}

/// Fire-and-forget index DDL commands.
pub trait IndexRpc {
    fn create_index(&mut self, index: &IndexObject<'_>) -> Result<()>;

    fn drop_index(&mut self, index_id: IndexId) -> Result<()>;
}

/// What one invocation of the job did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    /// `brain_enabled` is off.
    Disabled,
    /// Not enough new history entries yet; the high-water mark is left
    /// untouched.
    BelowThreshold { pending: usize },
    /// The run was cancelled; nothing was recommended.
    Cancelled,
    Tuned {
        recommended: usize,
        created: usize,
        dropped: usize,
    },
}

pub struct IndexSelectionJob {
    settings: AdvisorSettings,
    last_timestamp: u64,
    cancel: Arc<AtomicBool>,
}

impl IndexSelectionJob {
    pub fn new(settings: AdvisorSettings) -> Self {
        Self {
            settings,
            last_timestamp: 0,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn settings(&self) -> &AdvisorSettings {
        &self.settings
    }

    /// High-water timestamp of the last tuned workload.
    pub fn last_timestamp(&self) -> u64 {
        self.last_timestamp
    }

    /// Shared flag that cancels an in-flight pass when set.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// One tick of the periodic driver.
    pub fn run_once(
        &mut self,
        storage: &dyn AdvisorStorage,
        catalog: &Catalog,
        optimizer: &dyn WhatIfOptimizer,
        rpc: &mut dyn IndexRpc,
    ) -> Result<JobOutcome> {
        if !self.settings.brain_enabled {
            return Ok(JobOutcome::Disabled);
        }

        let mut txn = storage
            .begin()
            .map_err(|e| eyre!(AdvisorError::CatalogUnavailable(e.to_string())))?;
        info!("started index suggestion task");

        let history = match txn.queries_after(self.last_timestamp) {
            Ok(history) => history,
            Err(e) => {
                let _ = txn.rollback();
                return Err(eyre!(AdvisorError::CatalogUnavailable(e.to_string())));
            }
        };

        if history.len() <= self.settings.num_queries_threshold as usize {
            info!(pending = history.len(), "tuning - not this time");
            txn.commit()
                .map_err(|e| eyre!(AdvisorError::CatalogUnavailable(e.to_string())))?;
            return Ok(JobOutcome::BelowThreshold {
                pending: history.len(),
            });
        }

        info!(entries = history.len(), "tuning threshold crossed; tuning the database");

        let arena = Bump::new();
        let binder = Binder::new(catalog, &arena);
        let mut workload = Workload::new();
        for record in &history {
            match binder.bind_sql(&record.sql_text) {
                Ok(stmt) => workload.add_query(stmt),
                Err(report) => warn!(
                    sql = %record.sql_text,
                    error = %report,
                    "skipping history entry the advisor cannot use"
                ),
            }
        }

        let existing = match txn.existing_indexes() {
            Ok(existing) => existing,
            Err(e) => {
                let _ = txn.rollback();
                return Err(eyre!(AdvisorError::CatalogUnavailable(e.to_string())));
            }
        };

        let mut dropped = 0;
        for index_id in existing {
            match rpc.drop_index(index_id) {
                Ok(()) => dropped += 1,
                Err(e) => warn!(index_id, error = %e, "drop index rpc failed"),
            }
        }

        let cancel = self.cancel.clone();
        let mut selection = IndexSelection::new(
            &arena,
            workload,
            self.settings.knobs(),
            optimizer,
            catalog.db_name(),
        )
        .with_cancel_flag(&cancel);

        let best = match selection.get_best_indexes() {
            Ok(config) => config,
            Err(report) if AdvisorError::is_cancelled(&report) => {
                let _ = txn.rollback();
                info!("advisor run cancelled; no recommendation");
                return Ok(JobOutcome::Cancelled);
            }
            Err(report) => {
                let _ = txn.rollback();
                return Err(report);
            }
        };

        let recommended = best.index_count();
        let mut created = 0;
        for index in best.indexes().iter().copied() {
            match rpc.create_index(index) {
                Ok(()) => created += 1,
                Err(e) => warn!(index = %index, error = %e, "create index rpc failed"),
            }
        }

        // Advance past every query observed this pass so the next tick
        // only sees fresh history.
        self.last_timestamp = history
            .iter()
            .map(|r| r.timestamp)
            .max()
            .unwrap_or(self.last_timestamp);

        txn.commit()
            .map_err(|e| eyre!(AdvisorError::CatalogUnavailable(e.to_string())))?;

        info!(recommended, created, dropped, "index tuning pass complete");
        Ok(JobOutcome::Tuned {
            recommended,
            created,
            dropped,
        })
    }
}
