// src/services/ascendancy.rs
//! Ascendancy engine: everyone a person descends from.
//!
//! Two strategies, picked by `[ascendancy] strategy`:
//!
//!   traverse          → RetrieveAll once, walk `parents` links in memory.
//!                       The store is never written.
//!   prune_and_restore → snapshot → strip global leaves until the subject has
//!                       no children → Connected(subject) → restore snapshot →
//!                       re-read each connected person. All of it runs as one
//!                       exclusive store unit, rolled back on failure.
//!
//! Callers must hold exclusive access to the store for the whole call; between
//! the prune and the restore the graph is missing people.

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::config::AscendancyStrategy;
use crate::error::{FamilyError, Result, StoreError};
use crate::model::Person;
use crate::services::restore::reload;
use crate::store::{GraphStore, snapshot};

/// Cooperative cancellation, honoured only at step boundaries.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn check(&self, step: &'static str) -> Result<()> {
        if self.is_cancelled() {
            tracing::info!(step, "ascendancy cancelled");
            return Err(FamilyError::Cancelled(step));
        }
        Ok(())
    }
}

/// Ancestors of `name`, sorted by name. Fails with `NotFound` before touching
/// anything when `name` is not stored.
pub fn ascendancy<S: GraphStore + ?Sized>(
    store: &S,
    name: &str,
    strategy: AscendancyStrategy,
    snapshot_dir: &Path,
    cancel: &CancelFlag,
) -> Result<Vec<Person>> {
    if store.retrieve(name)?.is_none() {
        return Err(FamilyError::NotFound(name.to_string()));
    }

    let mut ancestors = match strategy {
        AscendancyStrategy::Traverse => traverse(store, name, cancel)?,
        AscendancyStrategy::PruneAndRestore => prune_and_restore(store, name, snapshot_dir, cancel)?,
    };
    ancestors.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(ancestors)
}

fn traverse<S: GraphStore + ?Sized>(store: &S, name: &str, cancel: &CancelFlag) -> Result<Vec<Person>> {
    cancel.check("materialization")?;
    let mut graph: HashMap<String, Person> = store
        .retrieve_all()?
        .into_iter()
        .map(|p| (p.name.clone(), p))
        .collect();

    let mut seen: HashSet<String> = HashSet::from([name.to_string()]);
    let mut queue: VecDeque<String> = VecDeque::from([name.to_string()]);
    let mut found: Vec<String> = Vec::new();

    while let Some(current) = queue.pop_front() {
        let Some(person) = graph.get(&current) else { continue };
        for parent in &person.parents {
            if seen.insert(parent.clone()) {
                found.push(parent.clone());
                queue.push_back(parent.clone());
            }
        }
    }

    cancel.check("hydration")?;
    Ok(found.into_iter().filter_map(|n| graph.remove(&n)).collect())
}

fn prune_and_restore<S: GraphStore + ?Sized>(
    store: &S,
    name: &str,
    snapshot_dir: &Path,
    cancel: &CancelFlag,
) -> Result<Vec<Person>> {
    cancel.check("snapshot")?;
    store.begin_exclusive()?;
    prune_window(store, name, snapshot_dir, cancel)
        .and_then(|found| store.commit().map(|()| found))
        .map_err(|e| abandon(store, e))
}

fn prune_window<S: GraphStore + ?Sized>(
    store: &S,
    name: &str,
    snapshot_dir: &Path,
    cancel: &CancelFlag,
) -> Result<Vec<Person>> {
    let dump = snapshot::fresh_path(snapshot_dir);
    let records = store.backup(&dump)?;
    tracing::debug!(path = %dump.display(), records, "pre-prune snapshot taken");

    // No cancellation from here until the restore has landed.
    let connected = match ascend(store, name).and_then(|_| store.connected(name)) {
        Ok(names) => names,
        Err(e) => return Err(recover(store, &dump, e)),
    };
    if let Err(e) = reload(store, &dump) {
        return Err(recover(store, &dump, e));
    }
    discard(&dump);

    cancel.check("hydration")?;
    hydrate(store, &connected)
}

/// Strip every childless node, store-wide, until `name` has no children left.
/// Returns the number of passes.
pub fn ascend<S: GraphStore + ?Sized>(store: &S, name: &str) -> Result<usize> {
    let mut passes = 0;
    while !store.children(name)?.is_empty() {
        let removed = store.delete_without_children()?;
        passes += 1;
        tracing::debug!(name, pass = passes, removed, "stripped leaves");
        if removed == 0 {
            return Err(FamilyError::PruneStalled(name.to_string()));
        }
    }
    Ok(passes)
}

/// Re-read full records, keeping the order of `names`.
pub fn hydrate<S: GraphStore + ?Sized>(store: &S, names: &[String]) -> Result<Vec<Person>> {
    let mut out = Vec::with_capacity(names.len());
    for n in names {
        let person = store
            .retrieve(n)?
            .ok_or_else(|| StoreError::Other(format!("{n} missing after restore")))?;
        out.push(person);
    }
    Ok(out)
}

/// One more restore attempt after a failure inside the prune window. Returns the
/// error the caller should see.
fn recover<S: GraphStore + ?Sized>(store: &S, dump: &Path, cause: FamilyError) -> FamilyError {
    tracing::warn!(snapshot = %dump.display(), error = %cause, "ascendancy failed mid-prune, restoring");
    match reload(store, dump) {
        Ok(_) => {
            discard(dump);
            cause
        }
        Err(e) => {
            tracing::error!(
                snapshot = %dump.display(),
                cause = %cause,
                restore_error = %e,
                "graph store left pruned; snapshot kept for manual restore"
            );
            FamilyError::Inconsistent {
                snapshot: dump.to_path_buf(),
                cause: Box::new(cause),
            }
        }
    }
}

/// Roll the exclusive unit back after `err`. A store that really rolled back is
/// whole again, so an `Inconsistent` collapses to its cause.
fn abandon<S: GraphStore + ?Sized>(store: &S, err: FamilyError) -> FamilyError {
    match store.rollback() {
        Ok(true) => match err {
            FamilyError::Inconsistent { snapshot, cause } => {
                tracing::warn!(snapshot = %snapshot.display(), "prune rolled back by the store");
                discard(&snapshot);
                *cause
            }
            other => other,
        },
        Ok(false) => err,
        Err(rb) => {
            tracing::error!(error = %rb, "rollback after failed ascendancy failed");
            err
        }
    }
}

/// The graph is already back; a snapshot that won't go away is only noise.
fn discard(dump: &Path) {
    if let Err(e) = snapshot::remove(dump) {
        tracing::warn!(snapshot = %dump.display(), error = %e, "could not remove snapshot");
    }
}
