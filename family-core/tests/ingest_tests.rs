use family_core::services::ingest;
use family_core::{FamilyError, GraphStore, Person, SqliteGraphStore};

fn store() -> SqliteGraphStore {
    SqliteGraphStore::open_in_memory().expect("in-memory store")
}

fn leia_batch() -> Vec<Person> {
    vec![
        Person::new("Leia")
            .with_parents(["Anakin", "Padme"])
            .with_children(["Ben"]),
    ]
}

#[test]
fn referenced_people_are_created_and_mirrored() {
    let s = store();
    let report = ingest::add(&s, &leia_batch()).expect("add");

    assert_eq!(report.people_created, 4);
    assert_eq!(report.edges_created, 3);
    assert_eq!(report.edges_skipped, 0);

    let leia = s.retrieve("Leia").unwrap().expect("Leia stored");
    assert_eq!(leia.parents, vec!["Anakin", "Padme"]);
    assert_eq!(leia.children, vec!["Ben"]);

    // Children are attached in the child -> parent direction.
    let ben = s.retrieve("Ben").unwrap().expect("Ben stored");
    assert_eq!(ben.parents, vec!["Leia"]);
    assert!(ben.children.is_empty());
    assert_eq!(s.retrieve("Anakin").unwrap().unwrap().children, vec!["Leia"]);
}

#[test]
fn replaying_a_batch_changes_nothing() {
    let s = store();
    let batch = vec![
        Person::new("Anakin"),
        Person::new("Luke").with_parents(["Anakin"]),
        Person::new("Leia").with_parents(["Anakin", "Padme"]).with_children(["Ben"]),
    ];
    ingest::add(&s, &batch).unwrap();
    let before = s.retrieve_all().unwrap();
    let edges_before = s.edge_count().unwrap();

    let again = ingest::add(&s, &batch).unwrap();
    assert_eq!(again.people_created, 0);
    assert_eq!(again.edges_created, 0);
    assert_eq!(again.edges_skipped, 4);

    assert_eq!(s.retrieve_all().unwrap(), before);
    assert_eq!(s.edge_count().unwrap(), edges_before);
}

#[test]
fn relation_known_from_the_other_side_is_not_duplicated() {
    let s = store();
    ingest::add(&s, &[Person::new("Anakin").with_children(["Luke"])]).unwrap();

    let report = ingest::add(&s, &[Person::new("Luke").with_parents(["Anakin"])]).unwrap();
    assert_eq!(report.edges_created, 0);
    assert_eq!(report.edges_skipped, 1);

    assert_eq!(s.retrieve("Luke").unwrap().unwrap().parents, vec!["Anakin"]);
    assert_eq!(s.edge_count().unwrap(), 1);
}

#[test]
fn repeated_names_inside_one_record_collapse() {
    let s = store();
    ingest::add(&s, &[Person::new("Luke").with_parents(["Anakin", "Anakin"])]).unwrap();
    assert_eq!(s.edge_count().unwrap(), 1);
}

#[test]
fn blank_names_reject_the_whole_batch_before_writing() {
    let s = store();
    let batch = vec![
        Person::new("Anakin").with_children(["Luke"]),
        Person::new("Leia").with_parents(["  "]),
    ];
    let err = ingest::add(&s, &batch).unwrap_err();
    assert!(matches!(err, FamilyError::Validation(_)));
    assert!(err.is_client_error());
    assert!(s.retrieve_all().unwrap().is_empty());

    let err = ingest::add(&s, &[Person::new("")]).unwrap_err();
    assert!(matches!(err, FamilyError::Validation(_)));
}

#[test]
fn parse_batch_accepts_arrays_with_optional_relations() {
    let batch = ingest::parse_batch(
        r#"[
            { "name": "Anakin" },
            { "name": "Luke", "parents": ["Anakin"] }
        ]"#,
    )
    .expect("valid payload");
    assert_eq!(batch[0], Person::new("Anakin"));
    assert_eq!(batch[1], Person::new("Luke").with_parents(["Anakin"]));
}

#[test]
fn parse_batch_rejects_non_arrays() {
    let err = ingest::parse_batch(r#"{ "invalid": "parse" }"#).unwrap_err();
    assert!(matches!(err, FamilyError::Validation(_)));
    let err = ingest::parse_batch(r#"[{ "parents": ["Anakin"] }]"#).unwrap_err();
    assert!(matches!(err, FamilyError::Validation(_)));
}

/// Fails every edge write after the first `allowed` ones.
struct EdgeBudget {
    inner: SqliteGraphStore,
    allowed: std::sync::atomic::AtomicUsize,
}

impl GraphStore for EdgeBudget {
    fn retrieve_all(&self) -> family_core::Result<Vec<Person>> {
        self.inner.retrieve_all()
    }
    fn retrieve(&self, name: &str) -> family_core::Result<Option<Person>> {
        self.inner.retrieve(name)
    }
    fn add(&self, name: &str) -> family_core::Result<()> {
        self.inner.add(name)
    }
    fn parent(&self, child: &str, parent: &str) -> family_core::Result<()> {
        use std::sync::atomic::Ordering;
        if self.allowed.load(Ordering::SeqCst) == 0 {
            return Err(family_core::StoreError::Other("edge budget exhausted".into()).into());
        }
        self.allowed.fetch_sub(1, Ordering::SeqCst);
        self.inner.parent(child, parent)
    }
    fn children(&self, name: &str) -> family_core::Result<Vec<String>> {
        self.inner.children(name)
    }
    fn connected(&self, name: &str) -> family_core::Result<Vec<String>> {
        self.inner.connected(name)
    }
    fn delete_without_children(&self) -> family_core::Result<usize> {
        self.inner.delete_without_children()
    }
    fn clear(&self) -> family_core::Result<()> {
        self.inner.clear()
    }
}

#[test]
fn store_failure_aborts_but_keeps_earlier_records() {
    let s = EdgeBudget {
        inner: store(),
        allowed: 1.into(),
    };
    let batch = vec![
        Person::new("Luke").with_parents(["Anakin"]),
        Person::new("Leia").with_parents(["Padme"]),
        Person::new("Ben").with_parents(["Leia"]),
    ];
    let err = ingest::add(&s, &batch).unwrap_err();
    assert!(matches!(err, FamilyError::Store(_)));
    assert!(!err.is_client_error());

    assert_eq!(s.retrieve("Luke").unwrap().unwrap().parents, vec!["Anakin"]);
    assert!(s.retrieve("Leia").unwrap().unwrap().parents.is_empty());
    assert!(s.retrieve("Ben").unwrap().is_none());
}
