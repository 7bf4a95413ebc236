//! Checkout, return and reservation workflows
//!
//! Every mutating operation runs its transition and the follow-up save under
//! a single lock acquisition.

use std::fmt;

use chrono::{Local, NaiveDate, Utc};

use crate::alerts::{scan_due_alerts, DueAlert};
use crate::model::{Book, BookId, HistoryEntry, MemberId};
use crate::observability::{log_event, Event};

use super::Library;

/// Result of a checkout attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutOutcome {
    /// The book is now lent out until `due_date`
    CheckedOut { due_date: NaiveDate },
    UnknownBook,
    UnknownMember,
    /// Already lent to someone
    Unavailable,
}

impl CheckoutOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::CheckedOut { .. })
    }

    pub fn due_date(&self) -> Option<NaiveDate> {
        match self {
            Self::CheckedOut { due_date } => Some(*due_date),
            _ => None,
        }
    }

    /// Stable name for logs and shell output
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CheckedOut { .. } => "checked_out",
            Self::UnknownBook => "unknown_book",
            Self::UnknownMember => "unknown_member",
            Self::Unavailable => "unavailable",
        }
    }
}

impl fmt::Display for CheckoutOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Library {
    /// Lend a book, with the due date counted from today's local date
    pub fn checkout(&self, book_id: &BookId, member_id: &MemberId) -> CheckoutOutcome {
        self.checkout_on(book_id, member_id, Local::now().date_naive())
    }

    /// Lend a book, with the due date counted from `today`
    pub fn checkout_on(
        &self,
        book_id: &BookId,
        member_id: &MemberId,
        today: NaiveDate,
    ) -> CheckoutOutcome {
        let mut state = self.lock();
        let outcome = state.checkout(
            book_id,
            member_id,
            today,
            self.policy.loan_days,
            Utc::now(),
        );

        match outcome {
            CheckoutOutcome::CheckedOut { due_date } => {
                self.metrics.increment_checkouts();
                log_event(
                    Event::CheckoutComplete,
                    &[
                        ("book_id", book_id.as_str()),
                        ("member_id", member_id.as_str()),
                        ("due_date", &due_date.to_string()),
                    ],
                );
                self.persist(&state, "checkout");
            }
            rejected => {
                self.metrics.increment_checkouts_rejected();
                log_event(
                    Event::CheckoutRejected,
                    &[
                        ("book_id", book_id.as_str()),
                        ("member_id", member_id.as_str()),
                        ("reason", rejected.as_str()),
                    ],
                );
            }
        }
        outcome
    }

    /// Take a book back. False if it is unknown or not lent out.
    pub fn return_book(&self, book_id: &BookId) -> bool {
        let mut state = self.lock();
        let Some(borrower) = state.return_book(book_id, Utc::now()) else {
            return false;
        };

        self.metrics.increment_returns();
        log_event(
            Event::ReturnComplete,
            &[
                ("book_id", book_id.as_str()),
                ("member_id", borrower.as_str()),
            ],
        );
        self.persist(&state, "return");
        true
    }

    /// Queue a member for a book and return their 1-based position.
    ///
    /// No admission checks: unknown ids, duplicates and the current borrower
    /// are all accepted.
    pub fn reserve(&self, book_id: &BookId, member_id: &MemberId) -> usize {
        let mut state = self.lock();
        let position = state.reserve(book_id, member_id);

        self.metrics.increment_reservations();
        log_event(
            Event::ReservationQueued,
            &[
                ("book_id", book_id.as_str()),
                ("member_id", member_id.as_str()),
                ("position", &position.to_string()),
            ],
        );
        self.persist(&state, "reserve");
        position
    }

    /// Dequeue the member at the head of a book's queue
    pub fn next_reservation(&self, book_id: &BookId) -> Option<MemberId> {
        let mut state = self.lock();
        let next = state.next_reservation(book_id)?;

        log_event(
            Event::ReservationServed,
            &[("book_id", book_id.as_str()), ("member_id", next.as_str())],
        );
        self.persist(&state, "next_reservation");
        Some(next)
    }

    /// Current queue for a book, head first
    pub fn reservations(&self, book_id: &BookId) -> Vec<MemberId> {
        self.lock().reservations(book_id)
    }

    /// Books currently lent out, ordered by id
    pub fn outstanding_books(&self) -> Vec<Book> {
        self.lock().outstanding_books()
    }

    /// A member's checkout/return log, oldest first
    pub fn history(&self, member_id: &MemberId) -> Vec<HistoryEntry> {
        self.lock().history(member_id)
    }

    /// Loans due within `days_before` days of `today`
    pub fn due_alerts(&self, today: NaiveDate, days_before: u32) -> Vec<DueAlert> {
        scan_due_alerts(self.lock().snapshot(), today, days_before)
    }
}
