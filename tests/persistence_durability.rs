//! Persistence Durability Tests
//!
//! Tests for guarantees:
//! - Every acknowledged change is on disk when the library is reopened
//! - Save then load round-trips the whole state
//! - Exactly `max_backups` backups are retained, the newest ones
//! - A corrupt live file degrades to an empty state instead of failing
//! - Identifiers are never reissued across restarts
//! - Documents with plain-text history load with their history intact

use std::fs;
use std::sync::Arc;

use chrono::NaiveDate;
use circulation::persistence::PersistenceErrorCode;
use circulation::{
    BookId, DataStore, Library, LibraryConfig, LibraryError, LibrarySnapshot, LoanPolicy, MemberId,
    StoreOptions,
};
use tempfile::TempDir;

// =============================================================================
// Test Utilities
// =============================================================================

fn create_temp_data_dir() -> TempDir {
    TempDir::new().expect("Failed to create temp dir")
}

fn open_library(dir: &TempDir) -> (Library, Arc<DataStore>) {
    let store = Arc::new(DataStore::open(StoreOptions::in_dir(dir.path())));
    let library = Library::with_store(store.clone(), LoanPolicy::default())
        .expect("Failed to open library");
    (library, store)
}

fn populated(library: &Library) {
    let today = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
    let dune = library.add_book("Dune", "Herbert", "ISBN1");
    let emma = library.add_book("Emma", "Austen", "ISBN2");
    let ada = library.add_member("Ada", "ada@example.org");
    let bob = library.add_member("Bob", "bob@example.org");
    library.checkout_on(&dune, &ada, today);
    library.reserve(&dune, &bob);
    library.checkout_on(&emma, &bob, today);
    library.return_book(&emma);
}

// =============================================================================
// Round trip
// =============================================================================

#[test]
fn test_state_survives_reopen() {
    let dir = create_temp_data_dir();

    let before = {
        let (library, _) = open_library(&dir);
        populated(&library);
        library.snapshot()
    };

    let (reopened, _) = open_library(&dir);
    assert_eq!(reopened.snapshot(), before);
    assert!(reopened.snapshot().is_consistent());
}

#[test]
fn test_save_then_load_returns_equal_snapshot() {
    let dir = create_temp_data_dir();
    let (library, store) = open_library(&dir);
    populated(&library);

    let snapshot = library.snapshot();
    store.save(&snapshot).expect("save");
    assert_eq!(store.load().expect("load"), snapshot);
}

#[test]
fn test_open_from_config() {
    let dir = create_temp_data_dir();
    let config = LibraryConfig {
        data_dir: dir.path().join("library"),
        loan_days: 21,
        ..LibraryConfig::default()
    };

    let library = Library::open(&config).expect("open");
    let book = library.add_book("Dune", "Herbert", "ISBN1");
    let member = library.add_member("Ada", "");
    let due = library
        .checkout_on(&book, &member, NaiveDate::from_ymd_opt(2026, 10, 1).unwrap())
        .due_date();

    assert_eq!(due, NaiveDate::from_ymd_opt(2026, 10, 22));
    assert!(dir.path().join("library").join("library_data.json").is_file());
}

// =============================================================================
// Backups
// =============================================================================

#[test]
fn test_backup_retention_keeps_newest_five() {
    let dir = create_temp_data_dir();
    let (library, store) = open_library(&dir);

    // the first save has no previous file to back up
    for i in 0..7 {
        library.add_book(&format!("Book {}", i), "Anon", "");
    }
    let backups = store.list_backups().expect("list");
    assert_eq!(backups.len(), 5);

    for i in 7..20 {
        library.add_book(&format!("Book {}", i), "Anon", "");
    }
    let backups = store.list_backups().expect("list");
    assert_eq!(backups.len(), 5);

    // newest backup holds the state just before the last save
    let newest = store.restore_from_backup(&backups[0]).expect("restore");
    assert_eq!(newest.books.len(), 19);
    let oldest_kept = store.restore_from_backup(&backups[4]).expect("restore");
    assert_eq!(oldest_kept.books.len(), 15);
}

#[test]
fn test_restore_newest_backup_into_library() {
    let dir = create_temp_data_dir();
    let (library, store) = open_library(&dir);
    library.add_book("Dune", "Herbert", "ISBN1");
    let emma = library.add_book("Emma", "Austen", "ISBN2");

    let newest = store.list_backups().unwrap().remove(0);
    let snapshot = store.restore_from_backup(&newest).unwrap();
    library.restore_snapshot(snapshot).expect("restore");

    assert!(library.book(&emma).is_none());
    assert_eq!(library.books().len(), 1);

    let (reopened, _) = open_library(&dir);
    assert_eq!(reopened.books().len(), 1);
}

#[test]
fn test_missing_backup_is_an_error() {
    let dir = create_temp_data_dir();
    let (_, store) = open_library(&dir);

    let err = store
        .restore_from_backup("library_data_20000101_000000.json")
        .unwrap_err();
    assert_eq!(err.code(), PersistenceErrorCode::NotFound);
}

// =============================================================================
// Degraded loads
// =============================================================================

#[test]
fn test_corrupt_live_file_starts_empty() {
    let dir = create_temp_data_dir();
    {
        let (library, _) = open_library(&dir);
        populated(&library);
    }

    fs::write(dir.path().join("library_data.json"), "{\"books\": {\"B100\": ").unwrap();

    let (library, _) = open_library(&dir);
    assert!(library.snapshot().is_empty());
}

#[test]
fn test_old_document_without_sequences_loads() {
    let dir = create_temp_data_dir();
    let document = r#"{
        "books": {
            "B107": {"id": "B107", "title": "Dune", "author": "Herbert", "isbn": "1", "available": true}
        },
        "members": {
            "M103": {"id": "M103", "name": "Ada", "email": "", "borrowedBooks": []}
        }
    }"#;
    fs::write(dir.path().join("library_data.json"), document).unwrap();

    let (library, _) = open_library(&dir);
    assert_eq!(library.books().len(), 1);
    assert_eq!(library.add_book("Emma", "Austen", "").as_str(), "B108");
    assert_eq!(library.add_member("Bob", "").as_str(), "M104");
}

#[test]
fn test_plain_text_history_document_loads() {
    let dir = create_temp_data_dir();
    let document = r#"{
        "books": {
            "B100": {"id": "B100", "title": "Dune", "author": "Herbert", "isbn": "ISBN1",
                     "available": false, "currentBorrowerId": "M100", "dueDate": "2026-11-02"},
            "B101": {"id": "B101", "title": "Emma", "author": "Austen", "isbn": "ISBN2",
                     "available": true, "currentBorrowerId": null, "dueDate": null}
        },
        "members": {
            "M100": {"id": "M100", "name": "Ada", "email": "ada@example.org", "borrowedBooks": ["B100"]}
        },
        "history": {"M100": ["Checked out Emma", "Returned Emma", "Checked out Dune"]},
        "reservations": {"B100": ["M100"]}
    }"#;
    fs::write(dir.path().join("library_data.json"), document).unwrap();

    let (library, _) = open_library(&dir);
    assert_eq!(library.books().len(), 2);
    assert_eq!(library.members().len(), 1);
    assert!(library.snapshot().is_consistent());

    let member = MemberId::new("M100");
    let lines: Vec<String> = library
        .history(&member)
        .iter()
        .map(ToString::to_string)
        .collect();
    assert_eq!(lines, vec!["Checked out Emma", "Returned Emma", "Checked out Dune"]);

    // new entries append after the plain-text ones and survive a reopen
    assert!(library.return_book(&BookId::new("B100")));
    drop(library);
    let (reopened, _) = open_library(&dir);
    let history = reopened.history(&member);
    assert_eq!(history.len(), 4);
    assert_eq!(history[3].to_string(), "Returned Dune");
    assert_eq!(history[3].book_id(), Some(&BookId::new("B100")));
}

#[test]
fn test_max_id_in_file_does_not_panic() {
    let dir = create_temp_data_dir();
    let document = r#"{
        "books": {
            "B18446744073709551615": {"id": "B18446744073709551615", "title": "Dune",
                                      "author": "Herbert", "isbn": "", "available": true}
        }
    }"#;
    fs::write(dir.path().join("library_data.json"), document).unwrap();

    let (library, _) = open_library(&dir);
    let first = library.add_book("Emma", "Austen", "");
    let second = library.add_book("Ulysses", "Joyce", "");
    assert_ne!(first.as_str(), "B18446744073709551615");
    assert_ne!(first, second);
    assert_eq!(library.books().len(), 3);

    drop(library);
    let (reopened, _) = open_library(&dir);
    let third = reopened.add_book("Walden", "Thoreau", "");
    assert!(![first, second].contains(&third));
}

#[test]
fn test_ids_are_not_reused_after_restart() {
    let dir = create_temp_data_dir();
    let removed = {
        let (library, _) = open_library(&dir);
        library.add_book("Dune", "Herbert", "");
        let last = library.add_book("Emma", "Austen", "");
        library.remove_book(&last);
        last
    };

    let (library, _) = open_library(&dir);
    let fresh = library.add_book("Ulysses", "Joyce", "");
    assert_ne!(fresh, removed);
    assert_eq!(fresh.as_str(), "B102");
}

// =============================================================================
// Interchange
// =============================================================================

#[test]
fn test_export_import_round_trip() {
    let dir = create_temp_data_dir();
    let (library, store) = open_library(&dir);
    populated(&library);
    let target = dir.path().join("exports").join("library.json");

    store.export_to(&target, &library.snapshot()).unwrap();
    let imported = store.import_from(&target).unwrap();
    assert_eq!(imported, library.snapshot());
}

#[test]
fn test_import_after_removing_lent_book() {
    let dir = create_temp_data_dir();
    let (library, store) = open_library(&dir);
    let book = library.add_book("Dune", "Herbert", "ISBN1");
    let member = library.add_member("Ada", "");
    library.checkout_on(&book, &member, NaiveDate::from_ymd_opt(2026, 10, 19).unwrap());
    library.remove_book(&book);
    let target = dir.path().join("library.json");

    store.export_to(&target, &library.snapshot()).unwrap();
    let imported = store.import_from(&target).unwrap();
    library.restore_snapshot(imported).expect("import restores");

    let (reopened, _) = open_library(&dir);
    assert!(reopened.book(&book).is_none());
    assert!(reopened.member(&member).unwrap().holds(&book));
}

#[test]
fn test_import_rejects_inconsistent_state() {
    let dir = create_temp_data_dir();
    let (library, store) = open_library(&dir);
    let target = dir.path().join("broken.json");
    fs::write(
        &target,
        r#"{"books": {"B100": {"id": "B100", "title": "Dune", "author": "", "isbn": "", "available": false}}}"#,
    )
    .unwrap();

    let snapshot: LibrarySnapshot = store.import_from(&target).unwrap();
    let err = library.restore_snapshot(snapshot).unwrap_err();
    assert!(matches!(err, LibraryError::InconsistentSnapshot(_)));
}
