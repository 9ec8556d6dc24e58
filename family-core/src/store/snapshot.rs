// src/store/snapshot.rs
//! Snapshot files: a pretty JSON array of `Person`. They restore the graph
//! around a destructive prune when the store itself cannot roll back.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::error::{FamilyError, Result, SnapshotError};
use crate::model::Person;
use crate::utils::path as pathutil;

/// A fresh, collision-free snapshot path inside `dir`.
pub fn fresh_path(dir: &Path) -> PathBuf {
    dir.join(format!("ascendancy-{}.json", Uuid::new_v4()))
}

/// Resolve a caller-supplied snapshot name inside `dir`, refusing anything that
/// would land outside it.
pub fn resolve(dir: &Path, name: &str) -> Result<PathBuf> {
    let rel = Path::new(name);
    if name.trim().is_empty() {
        return Err(FamilyError::snapshot(
            dir,
            SnapshotError::Path("empty snapshot name".into()),
        ));
    }
    fs::create_dir_all(dir).map_err(|e| FamilyError::snapshot(dir, e))?;
    pathutil::contained_path(dir, rel)
        .map_err(|e| FamilyError::snapshot(rel, SnapshotError::Path(e.to_string())))
}

/// Write atomically: temp file, flush, rename.
pub fn write(path: &Path, people: &[Person]) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(people).map_err(|e| FamilyError::snapshot(path, e))?;
    write_atomic(path, &bytes).map_err(|e| FamilyError::snapshot(path, e))?;
    tracing::debug!(path = %path.display(), records = people.len(), "snapshot written");
    Ok(())
}

pub fn read(path: &Path) -> Result<Vec<Person>> {
    let bytes = fs::read(path).map_err(|e| FamilyError::snapshot(path, e))?;
    serde_json::from_slice(&bytes).map_err(|e| FamilyError::snapshot(path, e))
}

pub fn remove(path: &Path) -> Result<()> {
    fs::remove_file(path).map_err(|e| FamilyError::snapshot(path, e))
}

fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("tmp");
    {
        let mut f = OpenOptions::new()
            .create(true)
            .truncate(true)
            .write(true)
            .open(&tmp)?;
        f.write_all(bytes)?;
        f.flush()?;
    }
    fs::rename(&tmp, path)
}
