use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use panel_core::store::{
    DelimitedRegistryWriter, MenuError, MenuPatch, MenuRow, MenuStore, RegistryWriter,
    StoreError, StoreResult, STATUS_COMPLETE, STATUS_IN_PROGRESS,
};
use tempfile::tempdir;

const REGISTRY: &str = "Alice,爱丽丝,------,--------\nSaga,サガ,4821,complete\n";

fn seeded_store(dir: &Path) -> MenuStore {
    let path = dir.join("main_menu.csv");
    fs::write(&path, REGISTRY).unwrap();
    MenuStore::new(path)
}

/// Writes half of the rows, then fails.
struct TornWriter {
    calls: AtomicUsize,
}

impl RegistryWriter for TornWriter {
    fn write(&self, path: &Path, rows: &[MenuRow]) -> StoreResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        DelimitedRegistryWriter.write(path, &rows[..rows.len() / 2])?;
        Err(StoreError::Io {
            path: path.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
        })
    }
}

#[test]
fn duplicate_name_is_reported_with_line() {
    let dir = tempdir().unwrap();
    let store = seeded_store(dir.path());

    let err = store.check_duplicate(&["alice", "爱丽丝"], None).unwrap_err();
    match err {
        MenuError::Duplicate { line, row } => {
            assert_eq!(line, 1);
            assert_eq!(row.primary_name, "Alice");
        }
        other => panic!("unexpected error: {other}"),
    }

    let err = store.check_duplicate(&["Unknown"], Some("4821")).unwrap_err();
    assert!(matches!(err, MenuError::Duplicate { line: 2, .. }));
    store.check_duplicate(&["complete"], Some("------")).unwrap();
}

#[test]
fn insert_refuses_duplicates_without_touching_file() {
    let dir = tempdir().unwrap();
    let store = seeded_store(dir.path());

    let err = store
        .insert(MenuRow::new("Alice", "爱丽丝", None))
        .unwrap_err();

    assert!(matches!(err, MenuError::Duplicate { .. }));
    assert_eq!(fs::read_to_string(store.path()).unwrap(), REGISTRY);
}

#[test]
fn insert_prepends_and_removes_backup() {
    let dir = tempdir().unwrap();
    let store = seeded_store(dir.path());

    store
        .insert(MenuRow::new("Orbit", "轨道", Some("77".into())))
        .unwrap();

    let rows = store.rows().unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0].primary_name, "Orbit");
    assert_eq!(rows[0].status, STATUS_IN_PROGRESS);
    assert_eq!(rows[1].primary_name, "Alice");
    assert!(!store.backup_path().exists());
}

#[test]
fn insert_creates_missing_registry() {
    let dir = tempdir().unwrap();
    let store = MenuStore::new(dir.path().join("menu").join("main_menu.csv"));

    store.insert(MenuRow::new("Orbit", "轨道", None)).unwrap();

    assert_eq!(
        fs::read_to_string(store.path()).unwrap(),
        "Orbit,轨道,------,--------\n"
    );
}

#[test]
fn failed_rewrite_restores_registry_byte_for_byte() {
    let dir = tempdir().unwrap();
    let writer = Arc::new(TornWriter {
        calls: AtomicUsize::new(0),
    });
    let store = seeded_store(dir.path()).with_writer(writer.clone());

    let err = store
        .insert(MenuRow::new("Orbit", "轨道", None))
        .unwrap_err();
    assert!(matches!(err, MenuError::Update { .. }));

    let err = store
        .update_fields("saga", &MenuPatch::status(STATUS_IN_PROGRESS))
        .unwrap_err();
    assert!(matches!(err, MenuError::Update { .. }));

    assert_eq!(writer.calls.load(Ordering::SeqCst), 2);
    assert_eq!(fs::read_to_string(store.path()).unwrap(), REGISTRY);
    assert!(!store.backup_path().exists());
}

#[test]
fn update_fields_touches_only_matching_rows() {
    let dir = tempdir().unwrap();
    let store = seeded_store(dir.path());

    let patch = MenuPatch {
        external_id: Some("9001".into()),
        ..MenuPatch::default()
    };
    assert_eq!(store.update_fields("爱丽丝", &patch).unwrap(), 1);
    assert_eq!(store.update_fields("nobody", &patch).unwrap(), 0);

    let rows = store.rows().unwrap();
    assert_eq!(rows[0].external_id, "9001");
    assert_eq!(rows[0].status, STATUS_IN_PROGRESS);
    assert_eq!(rows[1].external_id, "4821");
}

#[test]
fn toggle_status_flips_between_literals() {
    let dir = tempdir().unwrap();
    let store = seeded_store(dir.path());

    assert_eq!(store.toggle_status("ALICE").unwrap().status, STATUS_COMPLETE);
    assert_eq!(store.find("alice").unwrap().status, STATUS_COMPLETE);
    assert_eq!(store.toggle_status("4821").unwrap().status, STATUS_IN_PROGRESS);
    assert!(matches!(
        store.toggle_status("Orbit"),
        Err(MenuError::NotFound(_))
    ));
}

#[test]
fn list_filters_on_primary_name() {
    let dir = tempdir().unwrap();
    let store = seeded_store(dir.path());

    let listed = store.list("ali").unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].0, 0);
    assert_eq!(listed[0].1.secondary_name, "爱丽丝");
    assert_eq!(store.list("").unwrap().len(), 2);
}

#[test]
fn leftover_backup_is_restored_before_rewrite() {
    let dir = tempdir().unwrap();
    let store = MenuStore::new(dir.path().join("main_menu.csv"));
    fs::write(store.path(), "Orbit,轨道,------,--------\nAli").unwrap();
    fs::write(store.backup_path(), REGISTRY).unwrap();

    store.insert(MenuRow::new("Nova", "新星", None)).unwrap();

    let after = fs::read_to_string(store.path()).unwrap();
    assert_eq!(after, format!("Nova,新星,------,--------\n{REGISTRY}"));
    assert!(!store.backup_path().exists());
}

#[test]
fn reads_recover_leftover_backup() {
    let dir = tempdir().unwrap();
    let store = MenuStore::new(dir.path().join("main_menu.csv"));
    fs::write(store.backup_path(), REGISTRY).unwrap();

    assert_eq!(store.find("saga").unwrap().external_id, "4821");
    assert_eq!(fs::read_to_string(store.path()).unwrap(), REGISTRY);
    assert!(!store.recover_backup().unwrap());
}

#[test]
fn placeholder_id_never_selects_rows() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("main_menu.csv");
    fs::write(
        &path,
        "Alice,爱丽丝,------,--------\nOrbit,轨道,------,--------\n",
    )
    .unwrap();
    let store = MenuStore::new(path);

    let updated = store
        .update_fields("------", &MenuPatch::status(STATUS_COMPLETE))
        .unwrap();

    assert_eq!(updated, 0);
    assert!(matches!(store.find("------"), Err(MenuError::NotFound(_))));
    assert!(matches!(
        store.toggle_status("------"),
        Err(MenuError::NotFound(_))
    ));
    assert!(store
        .rows()
        .unwrap()
        .iter()
        .all(|row| row.status == STATUS_IN_PROGRESS));
}
