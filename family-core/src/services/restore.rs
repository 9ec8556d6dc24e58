// src/services/restore.rs
use std::path::Path;

use crate::error::Result;
use crate::services::ingest;
use crate::store::{GraphStore, snapshot};

/// Restore the snapshot called `name` inside `snapshot_dir`. Returns the
/// number of records reloaded.
pub fn restore<S: GraphStore + ?Sized>(store: &S, snapshot_dir: &Path, name: &str) -> Result<usize> {
    let path = snapshot::resolve(snapshot_dir, name)?;
    restore_from(store, &path)
}

/// Wipe the store, re-ingest the snapshot, delete the file.
///
/// The file is decoded before anything is cleared, and only removed once every
/// record is back.
pub fn restore_from<S: GraphStore + ?Sized>(store: &S, path: &Path) -> Result<usize> {
    let records = reload(store, path)?;
    snapshot::remove(path)?;
    Ok(records)
}

/// `restore_from` without consuming the file. Once this returns `Ok` the store
/// holds exactly the snapshot's graph.
pub fn reload<S: GraphStore + ?Sized>(store: &S, path: &Path) -> Result<usize> {
    let people = snapshot::read(path)?;
    store.clear()?;
    ingest::add(store, &people)?;
    tracing::info!(path = %path.display(), records = people.len(), "graph restored");
    Ok(people.len())
}
