//! Family-Core: a family-relationship graph with idempotent ingestion and
//! ancestry queries.
//!
//! Layout:
//! - `model`: the `Person` record.
//! - `store`: the `GraphStore` capability, the SQLite store and snapshot files.
//! - `services`: ingestion, the ascendancy engine and restore.
//! - `commands`: workspace init and the `PersonService` facade.

pub mod commands;
pub mod config;
pub mod error;
pub mod model;
pub mod services;
pub mod store;
pub mod utils;

pub use commands::{
    InitReport, PersonService, default_root, ensure_initialized, ensure_initialized_once,
};
pub use config::{AscendancyStrategy, CoreConfig};
pub use error::{FamilyError, Result, SnapshotError, StoreError};
pub use model::Person;
pub use services::{CancelFlag, IngestReport};
pub use store::{GraphStore, SqliteGraphStore};
