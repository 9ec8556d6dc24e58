// src/store/sqlite.rs
//! SQLite-backed graph store.
//!
//! - One connection, owned here; `PersonService` serializes access to it.
//! - Several connections on one file are isolated through `BEGIN IMMEDIATE`.
//! - `people` holds nodes, `parents` holds directed edges child -> parent.
//! - Deleting a person cascades to every edge touching it.
//! - Raw edges are not deduplicated here; ingestion checks before writing.

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use crate::error::{Result, StoreError};
use crate::model::Person;
use crate::store::GraphStore;

const SCHEMA: &str = r#"
    PRAGMA foreign_keys = ON;

    CREATE TABLE IF NOT EXISTS people (
      name        TEXT PRIMARY KEY,   -- unique person name, also the lookup key
      created_at  TEXT NOT NULL       -- RFC3339 UTC
    );

    CREATE TABLE IF NOT EXISTS parents (
      edge_id     INTEGER PRIMARY KEY AUTOINCREMENT,
      child       TEXT NOT NULL REFERENCES people(name) ON DELETE CASCADE,
      parent      TEXT NOT NULL REFERENCES people(name) ON DELETE CASCADE,
      created_at  TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_parents_child ON parents(child);
    CREATE INDEX IF NOT EXISTS idx_parents_parent ON parents(parent);
"#;

/// How long a writer waits for another connection's exclusive unit.
const BUSY_TIMEOUT: Duration = Duration::from_secs(30);

pub struct SqliteGraphStore {
    pub(crate) db: Connection,
}

impl SqliteGraphStore {
    /// Open/create the database file and ensure schema.
    ///
    /// Creates the parent directory if missing and enables WAL.
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self> {
        let db_path = db_path.as_ref();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(StoreError::from)?;
        }
        let db = Connection::open(db_path)?;
        db.busy_timeout(BUSY_TIMEOUT)?;
        db.execute_batch("PRAGMA journal_mode = WAL;")?;
        db.execute_batch(SCHEMA)?;
        tracing::debug!(path = %db_path.display(), "graph store opened");
        Ok(Self { db })
    }

    /// Private, throwaway store. Used by tests and dry runs.
    pub fn open_in_memory() -> Result<Self> {
        let db = Connection::open_in_memory()?;
        db.execute_batch(SCHEMA)?;
        Ok(Self { db })
    }

    /// Raw edge rows, duplicates included.
    pub fn edge_count(&self) -> Result<u64> {
        let n: i64 = self
            .db
            .query_row("SELECT COUNT(*) FROM parents", [], |r| r.get(0))?;
        Ok(n as u64)
    }

    pub fn person_count(&self) -> Result<u64> {
        let n: i64 = self
            .db
            .query_row("SELECT COUNT(*) FROM people", [], |r| r.get(0))?;
        Ok(n as u64)
    }

    fn names(&self, sql: &str, name: &str) -> Result<Vec<String>> {
        let mut stmt = self.db.prepare(sql)?;
        let rows = stmt.query_map([name], |r| r.get::<_, String>(0))?;
        let mut out = Vec::new();
        for r in rows {
            out.push(r?);
        }
        Ok(out)
    }

    // Leaves are fixed before deleting so one call strips exactly one layer.
    fn strip_leaves(&self) -> Result<usize> {
        let leaves: Vec<String> = {
            let mut stmt = self.db.prepare(
                "SELECT name FROM people WHERE name NOT IN (SELECT parent FROM parents)",
            )?;
            let rows = stmt.query_map([], |r| r.get::<_, String>(0))?;
            rows.collect::<std::result::Result<_, _>>()?
        };
        let mut stmt = self.db.prepare("DELETE FROM people WHERE name=?1")?;
        for name in &leaves {
            stmt.execute([name])?;
        }
        Ok(leaves.len())
    }

    fn parents_of(&self, name: &str) -> Result<Vec<String>> {
        self.names(
            "SELECT parent FROM parents WHERE child=?1 ORDER BY parent, edge_id",
            name,
        )
    }
}

impl GraphStore for SqliteGraphStore {
    fn retrieve_all(&self) -> Result<Vec<Person>> {
        let mut people: BTreeMap<String, Person> = BTreeMap::new();
        {
            let mut stmt = self.db.prepare("SELECT name FROM people ORDER BY name")?;
            let rows = stmt.query_map([], |r| r.get::<_, String>(0))?;
            for r in rows {
                let name = r?;
                people.insert(name.clone(), Person::new(name));
            }
        }

        let mut stmt = self
            .db
            .prepare("SELECT child, parent FROM parents ORDER BY child, parent, edge_id")?;
        let edges = stmt.query_map([], |r| Ok((r.get::<_, String>(0)?, r.get::<_, String>(1)?)))?;
        let mut children: Vec<(String, String)> = Vec::new();
        for e in edges {
            let (child, parent) = e?;
            if let Some(p) = people.get_mut(&child) {
                p.parents.push(parent.clone());
            }
            children.push((parent, child));
        }
        children.sort();
        for (parent, child) in children {
            if let Some(p) = people.get_mut(&parent) {
                p.children.push(child);
            }
        }

        Ok(people.into_values().collect())
    }

    fn retrieve(&self, name: &str) -> Result<Option<Person>> {
        let found: Option<String> = self
            .db
            .query_row("SELECT name FROM people WHERE name=?1", [name], |r| r.get(0))
            .optional()?;
        let Some(name) = found else { return Ok(None) };

        let parents = self.parents_of(&name)?;
        let children = self.children(&name)?;
        Ok(Some(Person {
            name,
            parents,
            children,
        }))
    }

    fn add(&self, name: &str) -> Result<()> {
        self.db.execute(
            "INSERT INTO people(name, created_at) VALUES (?1, ?2)",
            (name, Utc::now().to_rfc3339()),
        )?;
        Ok(())
    }

    fn parent(&self, child: &str, parent: &str) -> Result<()> {
        self.db.execute(
            "INSERT INTO parents(child, parent, created_at) VALUES (?1, ?2, ?3)",
            (child, parent, Utc::now().to_rfc3339()),
        )?;
        Ok(())
    }

    fn children(&self, name: &str) -> Result<Vec<String>> {
        self.names(
            "SELECT child FROM parents WHERE parent=?1 ORDER BY child, edge_id",
            name,
        )
    }

    fn connected(&self, name: &str) -> Result<Vec<String>> {
        // UNION (not UNION ALL) keeps the walk finite on cyclic data.
        self.names(
            r#"
            WITH RECURSIVE reach(name) AS (
              SELECT ?1
              UNION
              SELECT CASE WHEN e.child = reach.name THEN e.parent ELSE e.child END
              FROM parents e
              JOIN reach ON e.child = reach.name OR e.parent = reach.name
            )
            SELECT name FROM reach WHERE name <> ?1 ORDER BY name
            "#,
            name,
        )
    }

    fn delete_without_children(&self) -> Result<usize> {
        // A savepoint nests inside an open exclusive unit, a plain BEGIN would not.
        self.db.execute_batch("SAVEPOINT strip_leaves")?;
        match self.strip_leaves() {
            Ok(n) => {
                self.db.execute_batch("RELEASE strip_leaves")?;
                Ok(n)
            }
            Err(e) => {
                if let Err(rb) = self
                    .db
                    .execute_batch("ROLLBACK TO strip_leaves; RELEASE strip_leaves")
                {
                    tracing::warn!(error = %rb, "could not unwind strip_leaves");
                }
                Err(e)
            }
        }
    }

    fn clear(&self) -> Result<()> {
        self.db.execute_batch(
            r#"
            DELETE FROM parents;
            DELETE FROM people;
            "#,
        )?;
        Ok(())
    }

    // IMMEDIATE takes the write lock up front: other connections keep reading
    // the last committed graph and their writers wait on the busy timeout.
    fn begin_exclusive(&self) -> Result<()> {
        self.db.execute_batch("BEGIN IMMEDIATE")?;
        Ok(())
    }

    fn commit(&self) -> Result<()> {
        self.db.execute_batch("COMMIT")?;
        Ok(())
    }

    fn rollback(&self) -> Result<bool> {
        // SQLite may already have rolled back on its own after some errors.
        if !self.db.is_autocommit() {
            self.db.execute_batch("ROLLBACK")?;
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn family() -> SqliteGraphStore {
        let s = SqliteGraphStore::open_in_memory().unwrap();
        for n in ["Anakin", "Padme", "Leia", "Ben"] {
            s.add(n).unwrap();
        }
        s.parent("Leia", "Anakin").unwrap();
        s.parent("Leia", "Padme").unwrap();
        s.parent("Ben", "Leia").unwrap();
        s
    }

    #[test]
    fn edges_are_mirrored_on_both_ends() {
        let s = family();
        let leia = s.retrieve("Leia").unwrap().unwrap();
        assert_eq!(leia.parents, vec!["Anakin", "Padme"]);
        assert_eq!(leia.children, vec!["Ben"]);
        assert_eq!(s.children("Anakin").unwrap(), vec!["Leia"]);
        assert!(s.retrieve("Vader").unwrap().is_none());
        assert!(s.children("Vader").unwrap().is_empty());
    }

    #[test]
    fn duplicate_name_and_dangling_edge_are_store_errors() {
        let s = family();
        assert!(s.add("Leia").is_err());
        assert!(s.parent("Leia", "Nobody").is_err());
    }

    #[test]
    fn delete_without_children_strips_one_generation() {
        let s = family();
        assert_eq!(s.delete_without_children().unwrap(), 1); // Ben
        assert!(s.retrieve("Ben").unwrap().is_none());
        assert!(s.children("Leia").unwrap().is_empty());
        assert_eq!(s.edge_count().unwrap(), 2);
    }

    #[test]
    fn connected_walks_both_directions() {
        let s = family();
        assert_eq!(s.connected("Ben").unwrap(), vec!["Anakin", "Leia", "Padme"]);
        assert_eq!(s.connected("Anakin").unwrap(), vec!["Ben", "Leia", "Padme"]);
    }

    #[test]
    fn retrieve_all_matches_single_reads() {
        let s = family();
        let all = s.retrieve_all().unwrap();
        let names: Vec<_> = all.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Anakin", "Ben", "Leia", "Padme"]);
        for p in &all {
            assert_eq!(&s.retrieve(&p.name).unwrap().unwrap(), p);
        }
        s.clear().unwrap();
        assert!(s.retrieve_all().unwrap().is_empty());
    }
}
