// src/utils/logbook.rs
//! Append-only JSONL record of mutating calls (add, ascendancy, restore, clear).

use anyhow::Result;
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use std::{fs, io::Write, path::PathBuf};

#[derive(Serialize)]
struct LogLine<'a> {
    ts: String,
    event: &'a str,
    data: Value,
}

#[derive(Debug, Clone)]
pub struct Logbook {
    path: PathBuf,
}

impl Logbook {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    pub fn append(&self, event: &str, data: Value) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let line = LogLine {
            ts: Utc::now().to_rfc3339(),
            event,
            data,
        };
        let json = serde_json::to_string(&line)?;
        let mut f = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(f, "{}", json)?;
        Ok(())
    }

    /// Best effort: a failing logbook never fails the operation it describes.
    pub fn record(&self, event: &str, data: Value) {
        if let Err(e) = self.append(event, data) {
            tracing::warn!(path = %self.path.display(), error = %e, "logbook append failed");
        }
    }
}
