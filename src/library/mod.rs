//! The shared library registry
//!
//! `Library` owns the catalog, members, history and reservation queues
//! behind one mutex. It is built once at startup and shared as
//! `Arc<Library>`.
//!
//! # Persistence
//!
//! Every state-changing operation saves the full snapshot before releasing
//! the lock, so saves happen in mutation order. A failed auto-save is logged
//! and counted but the in-memory change stands; callers that need a durable
//! guarantee use `flush`.

mod circulation;
mod errors;
mod state;

pub use circulation::CheckoutOutcome;
pub use errors::{LibraryError, LibraryResult};

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Local;

use crate::config::LibraryConfig;
use crate::model::{Book, BookId, LibrarySnapshot, Member, MemberId};
use crate::observability::{log_event, Event, LibraryMetrics};
use crate::persistence::{DataStore, PersistenceResult, SnapshotStore};

use state::LibraryState;

/// Default loan period in days
pub const DEFAULT_LOAN_DAYS: u32 = 14;

/// Circulation rules
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoanPolicy {
    pub loan_days: u32,
}

impl Default for LoanPolicy {
    fn default() -> Self {
        Self {
            loan_days: DEFAULT_LOAN_DAYS,
        }
    }
}

pub struct Library {
    state: Mutex<LibraryState>,
    store: Arc<dyn SnapshotStore>,
    policy: LoanPolicy,
    metrics: LibraryMetrics,
}

impl Library {
    /// Open the file-backed library described by `config`
    pub fn open(config: &LibraryConfig) -> LibraryResult<Self> {
        config.validate()?;
        let store = Arc::new(DataStore::open(config.store_options()));
        Self::with_store(store, config.loan_policy())
    }

    /// Load state from `store` and wrap it.
    ///
    /// Unreadable or missing state starts empty (see `SnapshotStore::load`).
    /// A loaded state that breaks the invariants is kept as-is and reported
    /// with a `STATE_INCONSISTENT` warning.
    pub fn with_store(store: Arc<dyn SnapshotStore>, policy: LoanPolicy) -> LibraryResult<Self> {
        let snapshot = store.load()?;

        let violations = snapshot.invariant_violations();
        if let Some(first) = violations.first() {
            log_event(
                Event::StateInconsistent,
                &[
                    ("violations", &violations.len().to_string()),
                    ("first", first),
                ],
            );
        }

        let state = LibraryState::from_snapshot(snapshot);
        let sequences = state.snapshot().sequences;
        if sequences.is_exhausted() {
            log_event(
                Event::IdSequenceExhausted,
                &[
                    ("next_book", &sequences.next_book.to_string()),
                    ("next_member", &sequences.next_member.to_string()),
                ],
            );
        }
        log_event(
            Event::LibraryOpened,
            &[
                ("store", &store.describe()),
                ("books", &state.snapshot().books.len().to_string()),
                ("members", &state.snapshot().members.len().to_string()),
            ],
        );

        Ok(Self {
            state: Mutex::new(state),
            store,
            policy,
            metrics: LibraryMetrics::new(),
        })
    }

    pub fn policy(&self) -> LoanPolicy {
        self.policy
    }

    pub fn metrics(&self) -> &LibraryMetrics {
        &self.metrics
    }

    // A panic inside a transition happens before any mutation, so the
    // guarded state is still whole.
    fn lock(&self) -> MutexGuard<'_, LibraryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn persist(&self, state: &LibraryState, operation: &str) {
        match self.store.save(state.snapshot()) {
            Ok(()) => self.metrics.increment_saves(),
            Err(e) => {
                self.metrics.increment_save_failures();
                log_event(
                    Event::SaveFailed,
                    &[
                        ("operation", operation),
                        ("code", e.code().code()),
                        ("error", &e.to_string()),
                    ],
                );
            }
        }
    }

    // ========================================================================
    // Catalog
    // ========================================================================

    /// Add an available book and return its new id
    pub fn add_book(&self, title: &str, author: &str, isbn: &str) -> BookId {
        self.add_book_with_category(title, author, isbn, "")
    }

    pub fn add_book_with_category(
        &self,
        title: &str,
        author: &str,
        isbn: &str,
        category: &str,
    ) -> BookId {
        let mut state = self.lock();
        let id = state.add_book(title, author, isbn, category);
        log_event(
            Event::BookAdded,
            &[("book_id", id.as_str()), ("title", title)],
        );
        self.persist(&state, "add_book");
        id
    }

    /// Remove a book and its reservation queue. False if neither existed.
    pub fn remove_book(&self, id: &BookId) -> bool {
        let mut state = self.lock();
        if !state.remove_book(id) {
            return false;
        }
        log_event(Event::BookRemoved, &[("book_id", id.as_str())]);
        self.persist(&state, "remove_book");
        true
    }

    pub fn book(&self, id: &BookId) -> Option<Book> {
        self.lock().snapshot().books.get(id).cloned()
    }

    /// All books, ordered by id
    pub fn books(&self) -> Vec<Book> {
        self.lock().snapshot().books.values().cloned().collect()
    }

    /// Books whose title contains `query`, ignoring case
    pub fn search_books(&self, query: &str) -> Vec<Book> {
        self.lock().search_books(query)
    }

    // ========================================================================
    // Members
    // ========================================================================

    /// Register a member and return their new id
    pub fn add_member(&self, name: &str, email: &str) -> MemberId {
        self.add_member_with_phone(name, email, "")
    }

    /// Register an active member joining today
    pub fn add_member_with_phone(&self, name: &str, email: &str, phone: &str) -> MemberId {
        let today = Local::now().date_naive();
        let mut state = self.lock();
        let id = state.add_member(name, email, phone, today);
        log_event(
            Event::MemberAdded,
            &[("member_id", id.as_str()), ("name", name)],
        );
        self.persist(&state, "add_member");
        id
    }

    /// Remove a member record. Their loans, queue entries and history stay.
    pub fn remove_member(&self, id: &MemberId) -> bool {
        let mut state = self.lock();
        let Some(member) = state.remove_member(id) else {
            return false;
        };

        if member.borrowed_books().is_empty() {
            log_event(Event::MemberRemoved, &[("member_id", id.as_str())]);
        } else {
            let held: Vec<&str> = member.borrowed_books().iter().map(BookId::as_str).collect();
            log_event(
                Event::MemberRemovedWithLoans,
                &[("member_id", id.as_str()), ("books", &held.join(","))],
            );
        }
        self.persist(&state, "remove_member");
        true
    }

    /// Mark a member active or inactive. False if unknown or unchanged.
    pub fn set_member_active(&self, id: &MemberId, active: bool) -> bool {
        let mut state = self.lock();
        if !state.set_member_active(id, active) {
            return false;
        }
        log_event(
            Event::MemberStatusChanged,
            &[("member_id", id.as_str()), ("active", &active.to_string())],
        );
        self.persist(&state, "set_member_active");
        true
    }

    pub fn member(&self, id: &MemberId) -> Option<Member> {
        self.lock().snapshot().members.get(id).cloned()
    }

    /// All members, ordered by id
    pub fn members(&self) -> Vec<Member> {
        self.lock().snapshot().members.values().cloned().collect()
    }

    // ========================================================================
    // Whole-state operations
    // ========================================================================

    /// Consistent copy of the whole state
    pub fn snapshot(&self) -> LibrarySnapshot {
        self.lock().snapshot().clone()
    }

    /// Save now and report the outcome
    pub fn flush(&self) -> PersistenceResult<()> {
        let state = self.lock();
        match self.store.save(state.snapshot()) {
            Ok(()) => {
                self.metrics.increment_saves();
                Ok(())
            }
            Err(e) => {
                self.metrics.increment_save_failures();
                log_event(
                    Event::SaveFailed,
                    &[
                        ("operation", "flush"),
                        ("code", e.code().code()),
                        ("error", &e.to_string()),
                    ],
                );
                Err(e)
            }
        }
    }

    /// Replace the whole state, e.g. from a backup or an import.
    ///
    /// The replacement is saved before it becomes visible; if the save fails
    /// the current state is kept. Id sequences never move backwards, so ids
    /// handed out since the backup was taken are not reissued.
    pub fn restore_snapshot(&self, snapshot: LibrarySnapshot) -> LibraryResult<()> {
        let violations = snapshot.invariant_violations();
        if !violations.is_empty() {
            return Err(LibraryError::InconsistentSnapshot(violations));
        }

        let mut state = self.lock();
        let mut replacement = LibraryState::from_snapshot(snapshot);
        replacement.keep_sequences_ahead_of(state.snapshot());

        if let Err(e) = self.store.save(replacement.snapshot()) {
            self.metrics.increment_save_failures();
            log_event(
                Event::SaveFailed,
                &[
                    ("operation", "restore"),
                    ("code", e.code().code()),
                    ("error", &e.to_string()),
                ],
            );
            return Err(e.into());
        }
        self.metrics.increment_saves();

        log_event(
            Event::RestoreComplete,
            &[
                ("books", &replacement.snapshot().books.len().to_string()),
                ("members", &replacement.snapshot().members.len().to_string()),
            ],
        );
        *state = replacement;
        Ok(())
    }

    /// Final flush before the process exits
    pub fn shutdown(&self) -> PersistenceResult<()> {
        log_event(Event::ShutdownStart, &[]);
        let result = self.flush();
        if result.is_ok() {
            log_event(Event::ShutdownComplete, &[]);
        }
        result
    }
}
