// src/store/mod.rs

pub mod snapshot;
pub mod sqlite; // the ONLY store implementation shipped

pub use sqlite::SqliteGraphStore;

use std::path::Path;

use crate::error::Result;
use crate::model::Person;

/// Persistent graph of named people joined by directed parent edges.
///
/// Every call may block on I/O. Implementations need not be thread-safe:
/// `PersonService` owns the store behind a single lock. Stores that can be
/// opened more than once (several processes on one SQLite file) also implement
/// the exclusive-unit hooks so those handles stay isolated from each other.
pub trait GraphStore: Send {
    fn retrieve_all(&self) -> Result<Vec<Person>>;

    /// `Ok(None)` when nobody by that name is stored.
    fn retrieve(&self, name: &str) -> Result<Option<Person>>;

    /// Create a node. Creating an existing name is a store error.
    fn add(&self, name: &str) -> Result<()>;

    /// Create the edge "`parent` is a parent of `child`". Both nodes must exist.
    fn parent(&self, child: &str, parent: &str) -> Result<()>;

    /// Child names of `name`; empty for leaves and unknown names.
    fn children(&self, name: &str) -> Result<Vec<String>>;

    /// Names reachable from `name` along edges in either direction, `name` excluded.
    fn connected(&self, name: &str) -> Result<Vec<String>>;

    /// Remove every node that currently has no children. Returns how many went.
    fn delete_without_children(&self) -> Result<usize>;

    fn clear(&self) -> Result<()>;

    /// Open a unit of work that other handles on the same store neither observe
    /// nor interleave with until `commit` or `rollback`. No-op by default.
    fn begin_exclusive(&self) -> Result<()> {
        Ok(())
    }

    fn commit(&self) -> Result<()> {
        Ok(())
    }

    /// `Ok(true)` only when the store is back at its state as of `begin_exclusive`.
    fn rollback(&self) -> Result<bool> {
        Ok(false)
    }

    /// Dump every stored person to `destination`. Returns the record count.
    fn backup(&self, destination: &Path) -> Result<usize> {
        let people = self.retrieve_all()?;
        snapshot::write(destination, &people)?;
        Ok(people.len())
    }
}

/// Run `f` as one exclusive unit and commit whatever it applied, error or not.
///
/// Used for calls that fail fast but keep their earlier writes (ingestion,
/// restore, clear); only the pruning window rolls back.
pub fn exclusive<S, R>(store: &S, f: impl FnOnce() -> Result<R>) -> Result<R>
where
    S: GraphStore + ?Sized,
{
    store.begin_exclusive()?;
    let outcome = f();
    if let Err(e) = store.commit() {
        tracing::error!(error = %e, "commit failed, rolling back");
        if let Err(rb) = store.rollback() {
            tracing::error!(error = %rb, "rollback failed");
        }
        return Err(outcome.err().unwrap_or(e));
    }
    outcome
}
