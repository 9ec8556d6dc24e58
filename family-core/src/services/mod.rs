// src/services/mod.rs

pub mod ascendancy; // ancestor queries (in-memory walk or prune-and-restore)
pub mod ingest;     // idempotent batch upsert
pub mod restore;    // snapshot -> store

// Public API
pub use ascendancy::CancelFlag;
pub use ingest::IngestReport;
