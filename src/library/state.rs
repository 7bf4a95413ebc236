//! Registry state transitions
//!
//! Pure functions over the snapshot: no locking, no I/O, no clock. Every
//! transition validates before it mutates, so a rejected operation leaves
//! the state exactly as it was.

use chrono::{DateTime, Days, NaiveDate, Utc};

use crate::model::{
    Book, BookId, HistoryEntry, LibrarySnapshot, Member, MemberId, TransactionKind,
};

use super::circulation::CheckoutOutcome;

#[derive(Debug, Default)]
pub(crate) struct LibraryState {
    data: LibrarySnapshot,
}

impl LibraryState {
    pub(crate) fn from_snapshot(mut data: LibrarySnapshot) -> Self {
        data.normalize_sequences();
        Self { data }
    }

    pub(crate) fn snapshot(&self) -> &LibrarySnapshot {
        &self.data
    }

    /// Never hand out an id `previous` already used.
    pub(crate) fn keep_sequences_ahead_of(&mut self, previous: &LibrarySnapshot) {
        let sequences = &mut self.data.sequences;
        sequences.next_book = sequences.next_book.max(previous.sequences.next_book);
        sequences.next_member = sequences.next_member.max(previous.sequences.next_member);
    }

    // Catalog

    pub(crate) fn add_book(
        &mut self,
        title: &str,
        author: &str,
        isbn: &str,
        category: &str,
    ) -> BookId {
        let id = self.next_book_id();
        let book = Book::new(id.clone(), title, author, isbn).with_category(category);
        self.data.books.insert(id.clone(), book);
        id
    }

    // The last sequence number is never handed out plainly; once reached,
    // ids carry a suffix that no sequence parses.
    fn next_book_id(&mut self) -> BookId {
        let sequence = self.data.sequences.next_book;
        self.data.sequences.next_book = sequence.saturating_add(1);
        if sequence < u64::MAX {
            return BookId::from_sequence(sequence);
        }

        let mut suffix = 1u64;
        loop {
            let id = BookId::new(format!("B{}-{}", sequence, suffix));
            if !self.data.book_ids().any(|used| *used == id) {
                return id;
            }
            suffix = suffix.saturating_add(1);
        }
    }

    /// Drops the book and its reservation queue. True if either existed.
    pub(crate) fn remove_book(&mut self, id: &BookId) -> bool {
        let book = self.data.books.remove(id);
        let queue = self.data.reservations.remove(id);
        book.is_some() || queue.is_some()
    }

    // Members

    pub(crate) fn add_member(
        &mut self,
        name: &str,
        email: &str,
        phone: &str,
        joined: NaiveDate,
    ) -> MemberId {
        let id = self.next_member_id();
        let member = Member::new(id.clone(), name, email)
            .with_phone(phone)
            .joined_on(joined);
        self.data.members.insert(id.clone(), member);
        self.data.history.entry(id.clone()).or_default();
        id
    }

    fn next_member_id(&mut self) -> MemberId {
        let sequence = self.data.sequences.next_member;
        self.data.sequences.next_member = sequence.saturating_add(1);
        if sequence < u64::MAX {
            return MemberId::from_sequence(sequence);
        }

        let mut suffix = 1u64;
        loop {
            let id = MemberId::new(format!("M{}-{}", sequence, suffix));
            if !self.data.member_ids().any(|used| *used == id) {
                return id;
            }
            suffix = suffix.saturating_add(1);
        }
    }

    /// True when the flag actually changed.
    pub(crate) fn set_member_active(&mut self, id: &MemberId, active: bool) -> bool {
        self.data
            .members
            .get_mut(id)
            .is_some_and(|member| member.set_active(active))
    }

    /// Removes the member record only; loans, queue positions and history
    /// stay where they are.
    pub(crate) fn remove_member(&mut self, id: &MemberId) -> Option<Member> {
        self.data.members.remove(id)
    }

    // Circulation

    pub(crate) fn checkout(
        &mut self,
        book_id: &BookId,
        member_id: &MemberId,
        today: NaiveDate,
        loan_days: u32,
        at: DateTime<Utc>,
    ) -> CheckoutOutcome {
        let Some(book) = self.data.books.get_mut(book_id) else {
            return CheckoutOutcome::UnknownBook;
        };
        let Some(member) = self.data.members.get_mut(member_id) else {
            return CheckoutOutcome::UnknownMember;
        };
        if !book.is_available() {
            return CheckoutOutcome::Unavailable;
        }

        let due_date = today
            .checked_add_days(Days::new(u64::from(loan_days)))
            .unwrap_or(NaiveDate::MAX);

        book.lend_to(member_id.clone(), due_date);
        member.borrow(book_id.clone());
        let entry = HistoryEntry::new(TransactionKind::Checkout, book, member_id.clone(), at);
        self.data
            .history
            .entry(member_id.clone())
            .or_default()
            .push(entry);

        CheckoutOutcome::CheckedOut { due_date }
    }

    /// Returns the borrower when the book was actually out.
    pub(crate) fn return_book(&mut self, book_id: &BookId, at: DateTime<Utc>) -> Option<MemberId> {
        let book = self.data.books.get_mut(book_id)?;
        if book.is_available() {
            return None;
        }

        let borrower = book.release()?;
        if let Some(member) = self.data.members.get_mut(&borrower) {
            member.give_back(book_id);
        }
        let entry = HistoryEntry::new(TransactionKind::Return, book, borrower.clone(), at);
        self.data
            .history
            .entry(borrower.clone())
            .or_default()
            .push(entry);

        Some(borrower)
    }

    /// Appends to the queue and returns the 1-based position.
    pub(crate) fn reserve(&mut self, book_id: &BookId, member_id: &MemberId) -> usize {
        let queue = self.data.reservations.entry(book_id.clone()).or_default();
        queue.push_back(member_id.clone());
        queue.len()
    }

    pub(crate) fn next_reservation(&mut self, book_id: &BookId) -> Option<MemberId> {
        self.data.reservations.get_mut(book_id)?.pop_front()
    }

    // Queries

    pub(crate) fn reservations(&self, book_id: &BookId) -> Vec<MemberId> {
        self.data
            .reservations
            .get(book_id)
            .map(|queue| queue.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub(crate) fn outstanding_books(&self) -> Vec<Book> {
        self.data.outstanding().cloned().collect()
    }

    pub(crate) fn history(&self, member_id: &MemberId) -> Vec<HistoryEntry> {
        self.data
            .history
            .get(member_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Case-insensitive title match; a blank query matches everything.
    pub(crate) fn search_books(&self, query: &str) -> Vec<Book> {
        let needle = query.trim().to_lowercase();
        self.data
            .books
            .values()
            .filter(|book| needle.is_empty() || book.title().to_lowercase().contains(&needle))
            .cloned()
            .collect()
    }
}
