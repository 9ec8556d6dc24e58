// src/commands/api.rs
use std::path::{Path, PathBuf};

use anyhow::Context;
use parking_lot::Mutex;
use serde_json::json;

use crate::commands::init::{ensure_initialized, ensure_initialized_once};
use crate::config::{AscendancyStrategy, CoreConfig};
use crate::error::Result;
use crate::model::Person;
use crate::services::ascendancy::{self, CancelFlag};
use crate::services::ingest::{self, IngestReport};
use crate::services::restore;
use crate::store::{GraphStore, SqliteGraphStore, exclusive};
use crate::utils::logbook::Logbook;

/// The boundary the request layer talks to.
///
/// Owns the store behind one lock. Every call, reads included, holds it for its
/// full duration, so nobody observes the graph while an ascendancy has it pruned
/// and mutating calls never interleave. Mutating calls also run as exclusive
/// store units, which extends both guarantees to other services (and other
/// processes) opened on the same store.
pub struct PersonService<S: GraphStore = SqliteGraphStore> {
    store: Mutex<S>,
    snapshot_dir: PathBuf,
    strategy: AscendancyStrategy,
    logbook: Option<Logbook>,
}

impl PersonService<SqliteGraphStore> {
    /// Initialize `root` if needed and open the store its config points at.
    pub fn open(root: &Path) -> anyhow::Result<Self> {
        let report = ensure_initialized(root)?;
        Self::from_config(&report.config)
    }

    /// Same as `open`, on the process-wide default root (`FAMILY_ROOT` or `.family`).
    pub fn open_default() -> anyhow::Result<Self> {
        let report = ensure_initialized_once()?;
        Self::from_config(&report.config)
    }

    pub fn from_config(config: &CoreConfig) -> anyhow::Result<Self> {
        let store = SqliteGraphStore::open(&config.store.path)
            .with_context(|| format!("opening graph store {}", config.store.path.display()))?;
        let logbook = config
            .logbook
            .enabled
            .then(|| Logbook::new(&config.logbook.path));
        tracing::info!(
            store = %config.store.path.display(),
            strategy = config.ascendancy.strategy.as_str(),
            "person service started"
        );
        Ok(Self {
            store: Mutex::new(store),
            snapshot_dir: config.snapshots.dir.clone(),
            strategy: config.ascendancy.strategy,
            logbook,
        })
    }
}

impl<S: GraphStore> PersonService<S> {
    pub fn new(store: S, snapshot_dir: impl Into<PathBuf>, strategy: AscendancyStrategy) -> Self {
        Self {
            store: Mutex::new(store),
            snapshot_dir: snapshot_dir.into(),
            strategy,
            logbook: None,
        }
    }

    pub fn with_logbook(mut self, logbook: Logbook) -> Self {
        self.logbook = Some(logbook);
        self
    }

    pub fn snapshot_dir(&self) -> &Path {
        &self.snapshot_dir
    }

    pub fn strategy(&self) -> AscendancyStrategy {
        self.strategy
    }

    pub fn find(&self, name: &str) -> Result<Option<Person>> {
        tracing::info!("Finding {name}");
        self.store.lock().retrieve(name)
    }

    pub fn find_all(&self) -> Result<Vec<Person>> {
        tracing::info!("Finding all people");
        self.store.lock().retrieve_all()
    }

    pub fn add(&self, batch: &[Person]) -> Result<IngestReport> {
        tracing::info!(records = batch.len(), "Registering batch");
        let store = self.store.lock();
        let report = exclusive(&*store, || ingest::add(&*store, batch))?;
        self.record("add", json!({ "records": batch.len(), "report": report }));
        Ok(report)
    }

    /// Decode a JSON array of people, then `add` it.
    pub fn add_json(&self, payload: &str) -> Result<IngestReport> {
        let batch = ingest::parse_batch(payload)?;
        self.add(&batch)
    }

    pub fn ascendancy(&self, name: &str) -> Result<Vec<Person>> {
        self.ascendancy_with(name, &CancelFlag::new())
    }

    pub fn ascendancy_with(&self, name: &str, cancel: &CancelFlag) -> Result<Vec<Person>> {
        tracing::info!(strategy = self.strategy.as_str(), "Getting {name}'s ascendancy");
        let store = self.store.lock();
        let result = ascendancy::ascendancy(&*store, name, self.strategy, &self.snapshot_dir, cancel);
        self.record(
            "ascendancy",
            json!({
                "name": name,
                "strategy": self.strategy.as_str(),
                "ok": result.is_ok(),
                "ancestors": result.as_ref().map(|a| a.len()).ok(),
            }),
        );
        result
    }

    /// Reload the named snapshot from the snapshot directory.
    pub fn restore(&self, snapshot_name: &str) -> Result<usize> {
        tracing::info!("Restoring from {snapshot_name}");
        let store = self.store.lock();
        let records = exclusive(&*store, || {
            restore::restore(&*store, &self.snapshot_dir, snapshot_name)
        })?;
        self.record("restore", json!({ "snapshot": snapshot_name, "records": records }));
        Ok(records)
    }

    /// Dump the current graph under `snapshot_name` in the snapshot directory.
    pub fn backup(&self, snapshot_name: &str) -> Result<usize> {
        tracing::info!("Backing up to {snapshot_name}");
        let store = self.store.lock();
        let path = crate::store::snapshot::resolve(&self.snapshot_dir, snapshot_name)?;
        let records = store.backup(&path)?;
        self.record("backup", json!({ "snapshot": snapshot_name, "records": records }));
        Ok(records)
    }

    pub fn clear(&self) -> Result<()> {
        tracing::info!("Clearing all people");
        let store = self.store.lock();
        exclusive(&*store, || store.clear())?;
        self.record("clear", json!({}));
        Ok(())
    }

    /// Run `f` with exclusive access to the store.
    ///
    /// The service lock is held while `f` runs and is not reentrant: calling
    /// back into this `PersonService` from `f` deadlocks. Other handles on the
    /// same store file are not held off; use the store's exclusive-unit hooks
    /// for that.
    pub fn with_store<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        let store = self.store.lock();
        f(&*store)
    }

    fn record(&self, event: &str, data: serde_json::Value) {
        if let Some(logbook) = &self.logbook {
            logbook.record(event, data);
        }
    }
}
