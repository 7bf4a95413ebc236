//! CLI command implementations
//!
//! Each command loads the configuration, opens the library, does one thing
//! and returns the `data` payload of its response. Commands are thin: all
//! rules live in the library.

use std::path::Path;
use std::sync::Arc;

use chrono::{Local, NaiveDate};
use serde::Serialize;
use serde_json::{json, Value};

use crate::alerts::{deliver_due_alerts, AlertScheduler, LogAlertSink, MemoryAlertSink};
use crate::config::LibraryConfig;
use crate::library::{CheckoutOutcome, Library};
use crate::model::{BookId, LibrarySnapshot, MemberId};
use crate::persistence::DataStore;

use super::args::{Cli, Command};
use super::errors::{CliError, CliResult};
use super::io::{write_error, write_response};

/// An opened library plus the store behind it
struct Session {
    config: LibraryConfig,
    store: Arc<DataStore>,
    library: Library,
}

impl Session {
    fn open(config_path: &Path) -> CliResult<Self> {
        let config = LibraryConfig::load_or_default(config_path)?;
        let store = Arc::new(DataStore::open(config.store_options()));
        let library = Library::with_store(store.clone(), config.loan_policy())?;
        Ok(Self {
            config,
            store,
            library,
        })
    }

    // Auto-save failures are only logged by the library; a one-shot command
    // must not report success for a change that is not on disk.
    fn ensure_saved(&self) -> CliResult<()> {
        if self.library.metrics().save_failures() > 0 {
            return Err(CliError::persistence(format!(
                "Change applied but not saved to {}",
                self.store.data_file().display()
            )));
        }
        Ok(())
    }

    fn counts(&self) -> Value {
        let snapshot = self.library.snapshot();
        json!({
            "books": snapshot.books.len(),
            "members": snapshot.members.len(),
        })
    }
}

/// Main CLI entry point
///
/// Parses arguments, runs the command and prints exactly one JSON response.
/// This is the only function that main.rs should call.
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    match run_command(&cli.config, cli.command) {
        Ok(data) => write_response(data),
        Err(e) => {
            write_error(e.code_str(), e.message())?;
            Err(e)
        }
    }
}

/// Run one command and return its response payload
pub fn run_command(config_path: &Path, cmd: Command) -> CliResult<Value> {
    match cmd {
        Command::Init => init(config_path),
        Command::AddBook {
            title,
            author,
            isbn,
            category,
        } => add_book(config_path, &title, &author, &isbn, &category),
        Command::RemoveBook { book_id } => remove_book(config_path, BookId::new(book_id)),
        Command::AddMember { name, email, phone } => {
            add_member(config_path, &name, &email, &phone)
        }
        Command::RemoveMember { member_id } => {
            remove_member(config_path, MemberId::new(member_id))
        }
        Command::Deactivate { member_id } => {
            set_active(config_path, MemberId::new(member_id), false)
        }
        Command::Activate { member_id } => set_active(config_path, MemberId::new(member_id), true),
        Command::Checkout {
            book_id,
            member_id,
            date,
        } => checkout(
            config_path,
            BookId::new(book_id),
            MemberId::new(member_id),
            date,
        ),
        Command::Return { book_id } => return_book(config_path, BookId::new(book_id)),
        Command::Reserve { book_id, member_id } => {
            reserve(config_path, BookId::new(book_id), MemberId::new(member_id))
        }
        Command::NextReservation { book_id } => {
            next_reservation(config_path, BookId::new(book_id))
        }
        Command::Reservations { book_id } => reservations(config_path, BookId::new(book_id)),
        Command::Outstanding => {
            let session = Session::open(config_path)?;
            to_data(&session.library.outstanding_books())
        }
        Command::History { member_id } => history(config_path, MemberId::new(member_id)),
        Command::Search { query } => {
            let session = Session::open(config_path)?;
            to_data(&session.library.search_books(&query))
        }
        Command::Books => {
            let session = Session::open(config_path)?;
            to_data(&session.library.books())
        }
        Command::Members => {
            let session = Session::open(config_path)?;
            to_data(&session.library.members())
        }
        Command::Alerts { days, date } => alerts(config_path, days, date),
        Command::Watch => watch(config_path),
        Command::Backups => backups(config_path),
        Command::Restore { backup } => restore(config_path, backup),
        Command::Export { path } => export(config_path, &path),
        Command::Import { path } => import(config_path, &path),
    }
}

fn to_data<T: Serialize>(value: &T) -> CliResult<Value> {
    Ok(serde_json::to_value(value)?)
}

/// Write a default config if there is none, then an empty data file.
///
/// Refuses to touch an existing data file.
pub fn init(config_path: &Path) -> CliResult<Value> {
    let config_created = !config_path.exists();
    if config_created {
        LibraryConfig::default().write(config_path)?;
    }

    let config = LibraryConfig::load(config_path)?;
    let store = DataStore::open(config.store_options());
    if store.data_file_exists() {
        return Err(CliError::already_initialized(store.data_file()));
    }
    store.save(&LibrarySnapshot::new())?;

    Ok(json!({
        "initialized": true,
        "configCreated": config_created,
        "dataFile": store.data_file().display().to_string(),
    }))
}

fn add_book(
    config_path: &Path,
    title: &str,
    author: &str,
    isbn: &str,
    category: &str,
) -> CliResult<Value> {
    let session = Session::open(config_path)?;
    let id = session
        .library
        .add_book_with_category(title, author, isbn, category);
    session.ensure_saved()?;
    Ok(json!({ "bookId": id }))
}

fn remove_book(config_path: &Path, id: BookId) -> CliResult<Value> {
    let session = Session::open(config_path)?;
    if !session.library.remove_book(&id) {
        return Err(CliError::not_found(format!("Book {} not found", id)));
    }
    session.ensure_saved()?;
    Ok(json!({ "bookId": id, "removed": true }))
}

fn add_member(config_path: &Path, name: &str, email: &str, phone: &str) -> CliResult<Value> {
    let session = Session::open(config_path)?;
    let id = session.library.add_member_with_phone(name, email, phone);
    session.ensure_saved()?;
    Ok(json!({ "memberId": id }))
}

fn set_active(config_path: &Path, id: MemberId, active: bool) -> CliResult<Value> {
    let session = Session::open(config_path)?;
    if session.library.member(&id).is_none() {
        return Err(CliError::not_found(format!("Member {} not found", id)));
    }
    let changed = session.library.set_member_active(&id, active);
    session.ensure_saved()?;
    Ok(json!({ "memberId": id, "active": active, "changed": changed }))
}

fn remove_member(config_path: &Path, id: MemberId) -> CliResult<Value> {
    let session = Session::open(config_path)?;
    let held: Vec<BookId> = session
        .library
        .member(&id)
        .map(|m| m.borrowed_books().iter().cloned().collect())
        .unwrap_or_default();

    if !session.library.remove_member(&id) {
        return Err(CliError::not_found(format!("Member {} not found", id)));
    }
    session.ensure_saved()?;
    Ok(json!({ "memberId": id, "removed": true, "stillHeld": held }))
}

fn checkout(
    config_path: &Path,
    book_id: BookId,
    member_id: MemberId,
    date: Option<NaiveDate>,
) -> CliResult<Value> {
    let session = Session::open(config_path)?;
    let outcome = match date {
        Some(today) => session.library.checkout_on(&book_id, &member_id, today),
        None => session.library.checkout(&book_id, &member_id),
    };

    match outcome {
        CheckoutOutcome::CheckedOut { due_date } => {
            session.ensure_saved()?;
            Ok(json!({
                "bookId": book_id,
                "memberId": member_id,
                "dueDate": due_date,
            }))
        }
        CheckoutOutcome::UnknownBook => {
            Err(CliError::not_found(format!("Book {} not found", book_id)))
        }
        CheckoutOutcome::UnknownMember => {
            Err(CliError::not_found(format!("Member {} not found", member_id)))
        }
        CheckoutOutcome::Unavailable => Err(CliError::rejected(format!(
            "Book {} is already checked out",
            book_id
        ))),
    }
}

fn return_book(config_path: &Path, id: BookId) -> CliResult<Value> {
    let session = Session::open(config_path)?;
    let borrower = session
        .library
        .book(&id)
        .and_then(|b| b.current_borrower_id().cloned());

    if !session.library.return_book(&id) {
        return match session.library.book(&id) {
            None => Err(CliError::not_found(format!("Book {} not found", id))),
            Some(_) => Err(CliError::rejected(format!("Book {} is not checked out", id))),
        };
    }
    session.ensure_saved()?;
    Ok(json!({ "bookId": id, "memberId": borrower, "returned": true }))
}

fn reserve(config_path: &Path, book_id: BookId, member_id: MemberId) -> CliResult<Value> {
    let session = Session::open(config_path)?;
    let position = session.library.reserve(&book_id, &member_id);
    session.ensure_saved()?;
    Ok(json!({
        "bookId": book_id,
        "memberId": member_id,
        "position": position,
    }))
}

fn next_reservation(config_path: &Path, book_id: BookId) -> CliResult<Value> {
    let session = Session::open(config_path)?;
    let next = session.library.next_reservation(&book_id);
    session.ensure_saved()?;
    Ok(json!({ "bookId": book_id, "memberId": next }))
}

fn reservations(config_path: &Path, book_id: BookId) -> CliResult<Value> {
    let session = Session::open(config_path)?;
    let queue = session.library.reservations(&book_id);
    Ok(json!({ "bookId": book_id, "queue": queue }))
}

fn history(config_path: &Path, member_id: MemberId) -> CliResult<Value> {
    let session = Session::open(config_path)?;
    let entries = session.library.history(&member_id);
    let lines: Vec<String> = entries.iter().map(ToString::to_string).collect();
    Ok(json!({
        "memberId": member_id,
        "entries": entries,
        "lines": lines,
    }))
}

fn alerts(config_path: &Path, days: Option<u32>, date: Option<NaiveDate>) -> CliResult<Value> {
    let session = Session::open(config_path)?;
    let days_before = days.unwrap_or(session.config.alert_days_before);
    let today = date.unwrap_or_else(|| Local::now().date_naive());

    let sink = MemoryAlertSink::new();
    deliver_due_alerts(&session.library, &sink, today, days_before);

    let alerts = sink.alerts();
    let messages: Vec<String> = alerts.iter().map(ToString::to_string).collect();
    Ok(json!({
        "today": today,
        "daysBefore": days_before,
        "alerts": alerts,
        "messages": messages,
    }))
}

/// Scan on the configured interval until Ctrl-C, then shut down cleanly
fn watch(config_path: &Path) -> CliResult<Value> {
    let session = Session::open(config_path)?;
    let policy = session.config.alert_policy();
    let library = Arc::new(session.library);

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async {
        let handle = AlertScheduler::spawn(library.clone(), Arc::new(LogAlertSink), policy);
        let signal = tokio::signal::ctrl_c().await;
        handle.stop().await;
        signal
    })?;

    library.shutdown()?;
    Ok(json!({ "stopped": true, "metrics": library.metrics().to_json() }))
}

fn backups(config_path: &Path) -> CliResult<Value> {
    let session = Session::open(config_path)?;
    Ok(json!({
        "backupDir": session.store.backup_dir().display().to_string(),
        "backups": session.store.list_backups()?,
    }))
}

fn restore(config_path: &Path, backup: Option<String>) -> CliResult<Value> {
    let session = Session::open(config_path)?;
    let name = match backup {
        Some(name) => name,
        None => session
            .store
            .list_backups()?
            .into_iter()
            .next()
            .ok_or_else(|| CliError::not_found("No backups available"))?,
    };

    let snapshot = session.store.restore_from_backup(&name)?;
    session.library.restore_snapshot(snapshot)?;
    Ok(json!({ "restored": name, "state": session.counts() }))
}

fn export(config_path: &Path, path: &Path) -> CliResult<Value> {
    let session = Session::open(config_path)?;
    session.store.export_to(path, &session.library.snapshot())?;
    Ok(json!({
        "path": path.display().to_string(),
        "state": session.counts(),
    }))
}

fn import(config_path: &Path, path: &Path) -> CliResult<Value> {
    let session = Session::open(config_path)?;
    let snapshot = session.store.import_from(path)?;
    session.library.restore_snapshot(snapshot)?;
    Ok(json!({
        "path": path.display().to_string(),
        "state": session.counts(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::errors::CliErrorCode;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn setup() -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("circulation.json");
        LibraryConfig {
            data_dir: dir.path().join("data"),
            ..LibraryConfig::default()
        }
        .write(&config_path)
        .unwrap();
        (dir, config_path)
    }

    fn add_book(config: &Path, title: &str) -> String {
        let data = run_command(
            config,
            Command::AddBook {
                title: title.into(),
                author: "Herbert".into(),
                isbn: "ISBN1".into(),
                category: "Fiction".into(),
            },
        )
        .unwrap();
        data["bookId"].as_str().unwrap().to_string()
    }

    fn add_member(config: &Path, name: &str) -> String {
        let data = run_command(
            config,
            Command::AddMember {
                name: name.into(),
                email: String::new(),
                phone: String::new(),
            },
        )
        .unwrap();
        data["memberId"].as_str().unwrap().to_string()
    }

    fn checkout(config: &Path, book: &str, member: &str) -> CliResult<Value> {
        run_command(
            config,
            Command::Checkout {
                book_id: book.into(),
                member_id: member.into(),
                date: NaiveDate::from_ymd_opt(2026, 10, 19),
            },
        )
    }

    #[test]
    fn test_init_twice_fails() {
        let (_dir, config) = setup();
        let data = run_command(&config, Command::Init).unwrap();
        assert_eq!(data["initialized"], true);
        assert_eq!(data["configCreated"], false);

        let err = run_command(&config, Command::Init).unwrap_err();
        assert_eq!(err.code(), CliErrorCode::AlreadyInitialized);
    }

    #[test]
    fn test_state_survives_between_commands() {
        let (_dir, config) = setup();
        let book = add_book(&config, "Dune");
        let member = add_member(&config, "Ada");

        let data = checkout(&config, &book, &member).unwrap();
        assert_eq!(data["dueDate"], "2026-11-02");

        let outstanding = run_command(&config, Command::Outstanding).unwrap();
        assert_eq!(outstanding.as_array().unwrap().len(), 1);
        assert_eq!(outstanding[0]["currentBorrowerId"], member.as_str());
    }

    #[test]
    fn test_domain_failures_are_coded() {
        let (_dir, config) = setup();
        let book = add_book(&config, "Dune");
        let ada = add_member(&config, "Ada");
        let bob = add_member(&config, "Bob");
        checkout(&config, &book, &ada).unwrap();

        let err = checkout(&config, &book, &bob).unwrap_err();
        assert_eq!(err.code(), CliErrorCode::Rejected);

        let err = checkout(&config, "B999", &bob).unwrap_err();
        assert_eq!(err.code(), CliErrorCode::NotFound);

        let err = run_command(&config, Command::Return { book_id: "B999".into() }).unwrap_err();
        assert_eq!(err.code(), CliErrorCode::NotFound);
    }

    #[test]
    fn test_return_reports_borrower() {
        let (_dir, config) = setup();
        let book = add_book(&config, "Dune");
        let member = add_member(&config, "Ada");
        checkout(&config, &book, &member).unwrap();

        let data = run_command(&config, Command::Return { book_id: book.clone() }).unwrap();
        assert_eq!(data["memberId"], member.as_str());

        let err = run_command(&config, Command::Return { book_id: book }).unwrap_err();
        assert_eq!(err.code(), CliErrorCode::Rejected);

        let history = run_command(&config, Command::History { member_id: member }).unwrap();
        assert_eq!(history["lines"][0], "Checked out Dune");
        assert_eq!(history["lines"][1], "Returned Dune");
    }

    #[test]
    fn test_deactivate_member() {
        let (_dir, config) = setup();
        let member = add_member(&config, "Ada");

        let data = run_command(&config, Command::Deactivate { member_id: member.clone() }).unwrap();
        assert_eq!(data["changed"], true);
        let data = run_command(&config, Command::Deactivate { member_id: member.clone() }).unwrap();
        assert_eq!(data["changed"], false);

        let members = run_command(&config, Command::Members).unwrap();
        assert_eq!(members[0]["isActive"], false);

        let err = run_command(&config, Command::Activate { member_id: "M999".into() }).unwrap_err();
        assert_eq!(err.code(), CliErrorCode::NotFound);
    }

    #[test]
    fn test_restore_without_backups() {
        let (_dir, config) = setup();
        let err = run_command(&config, Command::Restore { backup: None }).unwrap_err();
        assert_eq!(err.code(), CliErrorCode::NotFound);
    }

    #[test]
    fn test_restore_newest_backup() {
        let (_dir, config) = setup();
        add_book(&config, "Dune");
        add_book(&config, "Emma");

        // the newest backup is the state before "Emma" was added
        let data = run_command(&config, Command::Restore { backup: None }).unwrap();
        assert_eq!(data["state"]["books"], 1);

        let books = run_command(&config, Command::Books).unwrap();
        assert_eq!(books[0]["title"], "Dune");
    }

    #[test]
    fn test_export_then_import() {
        let (dir, config) = setup();
        add_book(&config, "Dune");
        let exported = dir.path().join("export.json");

        run_command(&config, Command::Export { path: exported.clone() }).unwrap();
        add_book(&config, "Emma");

        let data = run_command(&config, Command::Import { path: exported }).unwrap();
        assert_eq!(data["state"]["books"], 1);
    }

    #[test]
    fn test_alerts_for_date() {
        let (_dir, config) = setup();
        let book = add_book(&config, "Dune");
        let member = add_member(&config, "Ada");
        checkout(&config, &book, &member).unwrap();

        let data = run_command(
            &config,
            Command::Alerts {
                days: None,
                date: NaiveDate::from_ymd_opt(2026, 10, 31),
            },
        )
        .unwrap();
        assert_eq!(data["messages"][0], "ALERT: Dune is due in 2 days for Ada");

        let data = run_command(
            &config,
            Command::Alerts {
                days: Some(1),
                date: NaiveDate::from_ymd_opt(2026, 10, 31),
            },
        )
        .unwrap();
        assert!(data["alerts"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_search_and_reservations() {
        let (_dir, config) = setup();
        let book = add_book(&config, "Dune");
        add_book(&config, "Emma");
        let member = add_member(&config, "Ada");

        let found = run_command(&config, Command::Search { query: "dune".into() }).unwrap();
        assert_eq!(found.as_array().unwrap().len(), 1);

        let data = run_command(
            &config,
            Command::Reserve {
                book_id: book.clone(),
                member_id: member.clone(),
            },
        )
        .unwrap();
        assert_eq!(data["position"], 1);

        let data = run_command(&config, Command::NextReservation { book_id: book.clone() }).unwrap();
        assert_eq!(data["memberId"], member.as_str());
        let data = run_command(&config, Command::NextReservation { book_id: book }).unwrap();
        assert!(data["memberId"].is_null());
    }
}
