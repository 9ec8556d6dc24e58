use family_core::services::restore;
use family_core::store::snapshot;
use family_core::{AscendancyStrategy, FamilyError, GraphStore, Person, PersonService, SqliteGraphStore};

fn family() -> Vec<Person> {
    vec![
        Person::new("Leia")
            .with_parents(["Anakin", "Padme"])
            .with_children(["Ben"]),
        Person::new("Luke").with_parents(["Anakin", "Padme"]),
    ]
}

fn service(dir: &std::path::Path) -> PersonService {
    let store = SqliteGraphStore::open_in_memory().unwrap();
    PersonService::new(store, dir.join("snapshots"), AscendancyStrategy::Traverse)
}

#[test]
fn backup_then_restore_brings_back_the_same_graph() {
    let tmp = tempfile::tempdir().unwrap();
    let svc = service(tmp.path());
    svc.add(&family()).unwrap();
    let before = svc.find_all().unwrap();

    assert_eq!(svc.backup("family.json").unwrap(), 5);
    svc.clear().unwrap();

    assert_eq!(svc.restore("family.json").unwrap(), 5);
    assert_eq!(svc.find_all().unwrap(), before);
    assert!(!svc.snapshot_dir().join("family.json").exists(), "consumed on success");
}

#[test]
fn restore_replaces_whatever_was_stored() {
    let tmp = tempfile::tempdir().unwrap();
    let svc = service(tmp.path());
    svc.add(&family()).unwrap();
    svc.backup("family.json").unwrap();
    let before = svc.find_all().unwrap();

    svc.add(&[Person::new("Jar Jar").with_children(["Boss Nass"])]).unwrap();
    svc.restore("family.json").unwrap();

    assert_eq!(svc.find_all().unwrap(), before);
    assert!(svc.find("Jar Jar").unwrap().is_none());
}

#[test]
fn missing_snapshot_leaves_the_store_alone() {
    let tmp = tempfile::tempdir().unwrap();
    let svc = service(tmp.path());
    svc.add(&family()).unwrap();
    let before = svc.find_all().unwrap();

    let err = svc.restore("nope.json").unwrap_err();
    assert!(matches!(err, FamilyError::Snapshot { .. }), "{err:?}");
    assert!(!err.is_client_error());
    assert_eq!(svc.find_all().unwrap(), before);
}

#[test]
fn undecodable_snapshot_is_kept_and_the_store_untouched() {
    let tmp = tempfile::tempdir().unwrap();
    let svc = service(tmp.path());
    svc.add(&family()).unwrap();
    let before = svc.find_all().unwrap();

    std::fs::create_dir_all(svc.snapshot_dir()).unwrap();
    let garbage = svc.snapshot_dir().join("garbage.json");
    std::fs::write(&garbage, b"{ not json").unwrap();

    assert!(matches!(
        svc.restore("garbage.json"),
        Err(FamilyError::Snapshot { .. })
    ));
    assert!(garbage.exists());
    assert_eq!(svc.find_all().unwrap(), before);
}

#[test]
fn snapshot_names_cannot_leave_the_snapshot_dir() {
    let tmp = tempfile::tempdir().unwrap();
    let svc = service(tmp.path());
    svc.add(&family()).unwrap();

    let outside = tmp.path().join("outside.json");
    snapshot::write(&outside, &family()).unwrap();

    for name in ["../outside.json", "/etc/hosts", ""] {
        assert!(
            matches!(svc.restore(name), Err(FamilyError::Snapshot { .. })),
            "{name:?} accepted"
        );
        assert!(svc.backup(name).is_err(), "{name:?} accepted for backup");
    }
    assert!(outside.exists());
    assert_eq!(svc.find_all().unwrap().len(), 5);
}

#[test]
fn restore_from_a_hand_written_snapshot() {
    let tmp = tempfile::tempdir().unwrap();
    let store = SqliteGraphStore::open_in_memory().unwrap();
    let dir = tmp.path().join("snaps");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(
        dir.join("hand.json"),
        r#"[
            { "name": "Anakin", "children": ["Luke"] },
            { "name": "Luke", "parents": ["Anakin"] }
        ]"#,
    )
    .unwrap();

    assert_eq!(restore::restore(&store, &dir, "hand.json").unwrap(), 2);
    assert_eq!(store.edge_count().unwrap(), 1);
    assert_eq!(store.retrieve("Luke").unwrap().unwrap().parents, vec!["Anakin"]);
}
