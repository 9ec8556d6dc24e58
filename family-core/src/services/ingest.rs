// src/services/ingest.rs
//! Relationship ingestion: merge a batch of people and their relations into a
//! `GraphStore`, creating what is missing and skipping what already exists.
//!
//! "Already related" is always re-read from the store right before an edge
//! write, never taken from the payload, so replaying a batch is a no-op.

use serde::Serialize;

use crate::error::{FamilyError, Result, StoreError};
use crate::model::Person;
use crate::store::GraphStore;

/// What one `add` call changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub people_created: usize,
    pub edges_created: usize,
    pub edges_skipped: usize,
}

#[derive(Clone, Copy)]
enum Relation {
    Parent,
    Child,
}

/// Reject the batch before any write if a name is blank.
pub fn validate(batch: &[Person]) -> Result<()> {
    for (i, person) in batch.iter().enumerate() {
        if person.name.trim().is_empty() {
            return Err(FamilyError::Validation(format!("record {i} has an empty name")));
        }
        let blank = person
            .parents
            .iter()
            .chain(person.children.iter())
            .any(|n| n.trim().is_empty());
        if blank {
            return Err(FamilyError::Validation(format!(
                "{} lists a relative with an empty name",
                person.name
            )));
        }
    }
    Ok(())
}

/// Decode a JSON array of people. Anything else is a validation failure.
pub fn parse_batch(payload: &str) -> Result<Vec<Person>> {
    serde_json::from_str::<Vec<Person>>(payload)
        .map_err(|e| FamilyError::Validation(format!("unparseable batch: {e}")))
}

/// Upsert every record in input order. Fails fast; records already applied stay
/// applied.
pub fn add<S: GraphStore + ?Sized>(store: &S, batch: &[Person]) -> Result<IngestReport> {
    validate(batch)?;
    let mut report = IngestReport::default();

    for person in batch {
        tracing::debug!(name = %person.name, "registering");
        if ensure_node(store, &person.name)? {
            report.people_created += 1;
        }

        for parent in &person.parents {
            register(store, &person.name, parent, Relation::Parent, &mut report)?;
        }
        for child in &person.children {
            register(store, &person.name, child, Relation::Child, &mut report)?;
        }
    }

    tracing::debug!(?report, "batch registered");
    Ok(report)
}

fn ensure_node<S: GraphStore + ?Sized>(store: &S, name: &str) -> Result<bool> {
    if store.retrieve(name)?.is_some() {
        return Ok(false);
    }
    store.add(name)?;
    Ok(true)
}

fn register<S: GraphStore + ?Sized>(
    store: &S,
    name: &str,
    related: &str,
    relation: Relation,
    report: &mut IngestReport,
) -> Result<()> {
    let current = store
        .retrieve(name)?
        .ok_or_else(|| StoreError::Other(format!("{name} vanished during ingestion")))?;

    let exists = match relation {
        Relation::Parent => current.has_parent(related),
        Relation::Child => current.has_child(related),
    };
    if exists {
        report.edges_skipped += 1;
        return Ok(());
    }

    if ensure_node(store, related)? {
        report.people_created += 1;
    }
    match relation {
        Relation::Parent => store.parent(name, related)?,
        Relation::Child => store.parent(related, name)?,
    }
    report.edges_created += 1;
    Ok(())
}
