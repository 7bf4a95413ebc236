//! The complete serializable library state
//!
//! Every field defaults when missing so documents written by older or newer
//! versions still load. Maps are ordered, which keeps the persisted document
//! byte-stable for equal states.

use std::collections::{BTreeMap, VecDeque};

use serde::{Deserialize, Serialize};

use super::book::Book;
use super::history::{self, HistoryEntry};
use super::ids::{BookId, MemberId, FIRST_SEQUENCE};
use super::member::Member;

/// Next sequence numbers for generated identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IdSequences {
    pub next_book: u64,
    pub next_member: u64,
}

impl IdSequences {
    /// Either sequence can no longer produce plain numbered ids
    pub fn is_exhausted(&self) -> bool {
        self.next_book == u64::MAX || self.next_member == u64::MAX
    }
}

impl Default for IdSequences {
    fn default() -> Self {
        Self {
            next_book: FIRST_SEQUENCE,
            next_member: FIRST_SEQUENCE,
        }
    }
}

/// Catalog, member registry, history log and reservation queues.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibrarySnapshot {
    #[serde(default)]
    pub books: BTreeMap<BookId, Book>,
    #[serde(default)]
    pub members: BTreeMap<MemberId, Member>,
    #[serde(default, deserialize_with = "history::deserialize_log")]
    pub history: BTreeMap<MemberId, Vec<HistoryEntry>>,
    #[serde(default)]
    pub reservations: BTreeMap<BookId, VecDeque<MemberId>>,
    #[serde(default)]
    pub sequences: IdSequences,
}

impl LibrarySnapshot {
    /// Create an empty snapshot
    pub fn new() -> Self {
        Self::default()
    }

    /// No books, members, history or reservations
    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
            && self.members.is_empty()
            && self.history.is_empty()
            && self.reservations.is_empty()
    }

    /// Books currently lent out
    pub fn outstanding(&self) -> impl Iterator<Item = &Book> {
        self.books.values().filter(|book| !book.is_available())
    }

    /// Advance both sequences past every generated identifier that appears
    /// anywhere in the state, so no identifier is handed out twice. An id at
    /// the top of the numeric range leaves its sequence exhausted.
    pub fn normalize_sequences(&mut self) {
        let max_book = self.book_ids().filter_map(BookId::sequence).max();
        let max_member = self.member_ids().filter_map(MemberId::sequence).max();

        if let Some(max) = max_book {
            self.sequences.next_book = self.sequences.next_book.max(max.saturating_add(1));
        }
        if let Some(max) = max_member {
            self.sequences.next_member = self.sequences.next_member.max(max.saturating_add(1));
        }
    }

    /// Every book id referenced anywhere in the state
    pub fn book_ids(&self) -> impl Iterator<Item = &BookId> {
        self.books
            .keys()
            .chain(self.reservations.keys())
            .chain(self.history.values().flatten().filter_map(HistoryEntry::book_id))
    }

    /// Every member id referenced anywhere in the state
    pub fn member_ids(&self) -> impl Iterator<Item = &MemberId> {
        self.members
            .keys()
            .chain(self.history.keys())
            .chain(self.reservations.values().flatten())
            .chain(self.books.values().filter_map(Book::current_borrower_id))
    }

    /// Every way the state breaks the circulation invariants.
    ///
    /// Removals leave dangling references behind and neither is a violation:
    /// a lent book whose borrower is no longer registered, and a held id
    /// whose book is no longer in the catalog.
    pub fn invariant_violations(&self) -> Vec<String> {
        let mut violations = Vec::new();

        for (key, book) in &self.books {
            if key != book.id() {
                violations.push(format!("book stored under {} has id {}", key, book.id()));
            }
            if !book.is_consistent() {
                violations.push(format!(
                    "book {} availability disagrees with borrower/due date",
                    key
                ));
            }
            if let Some(borrower) = book.current_borrower_id() {
                if let Some(member) = self.members.get(borrower) {
                    if !member.holds(key) {
                        violations.push(format!(
                            "book {} lent to {} but missing from their borrowed set",
                            key, borrower
                        ));
                    }
                }
            }
        }

        for (key, member) in &self.members {
            if key != member.id() {
                violations.push(format!(
                    "member stored under {} has id {}",
                    key,
                    member.id()
                ));
            }
            for book_id in member.borrowed_books() {
                let Some(book) = self.books.get(book_id) else {
                    continue;
                };
                let lent_to_member = book
                    .current_borrower_id()
                    .is_some_and(|borrower| borrower == key);
                if !lent_to_member {
                    violations.push(format!(
                        "member {} holds {} which is not lent to them",
                        key, book_id
                    ));
                }
            }
        }

        violations
    }

    /// No invariant violations
    pub fn is_consistent(&self) -> bool {
        self.invariant_violations().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn due() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 11, 2).unwrap()
    }

    fn lent_snapshot() -> LibrarySnapshot {
        let mut snapshot = LibrarySnapshot::new();
        let mut book = Book::new(BookId::new("B100"), "Dune", "Herbert", "ISBN1");
        let mut member = Member::new(MemberId::new("M100"), "Ada", "ada@example.org");
        book.lend_to(member.id().clone(), due());
        member.borrow(book.id().clone());
        snapshot.books.insert(book.id().clone(), book);
        snapshot.members.insert(member.id().clone(), member);
        snapshot
    }

    #[test]
    fn test_empty_snapshot_from_empty_object() {
        let snapshot: LibrarySnapshot = serde_json::from_str("{}").unwrap();
        assert!(snapshot.is_empty());
        assert_eq!(snapshot.sequences, IdSequences::default());
    }

    #[test]
    fn test_unknown_fields_are_ignored() {
        let snapshot: LibrarySnapshot =
            serde_json::from_str(r#"{"books":{},"shelves":[1,2,3]}"#).unwrap();
        assert!(snapshot.is_empty());
    }

    #[test]
    fn test_plain_text_history_loads() {
        let snapshot: LibrarySnapshot = serde_json::from_str(
            r#"{"history": {"M100": ["Checked out Dune", "Returned Dune"], "M101": []}}"#,
        )
        .unwrap();

        let lines: Vec<String> = snapshot.history[&MemberId::new("M100")]
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(lines, vec!["Checked out Dune", "Returned Dune"]);
        assert_eq!(
            snapshot.history[&MemberId::new("M100")][0].member_id(),
            &MemberId::new("M100")
        );
        assert!(snapshot.history[&MemberId::new("M101")].is_empty());
    }

    #[test]
    fn test_consistent_loan() {
        assert!(lent_snapshot().is_consistent());
    }

    #[test]
    fn test_detects_missing_borrowed_entry() {
        let mut snapshot = lent_snapshot();
        snapshot
            .members
            .get_mut(&MemberId::new("M100"))
            .unwrap()
            .give_back(&BookId::new("B100"));

        let violations = snapshot.invariant_violations();
        assert_eq!(violations.len(), 1);
        assert!(violations[0].contains("missing from their borrowed set"));
    }

    #[test]
    fn test_detects_phantom_holding() {
        let mut snapshot = lent_snapshot();
        snapshot
            .books
            .get_mut(&BookId::new("B100"))
            .unwrap()
            .release();

        let violations = snapshot.invariant_violations();
        assert_eq!(violations.len(), 1);
        assert!(violations[0].contains("not lent to them"));
    }

    #[test]
    fn test_loan_of_removed_member_is_allowed() {
        let mut snapshot = lent_snapshot();
        snapshot.members.clear();
        assert!(snapshot.is_consistent());
    }

    #[test]
    fn test_holding_of_removed_book_is_allowed() {
        let mut snapshot = lent_snapshot();
        snapshot.books.clear();
        assert!(snapshot.is_consistent());

        // the id still counts when the book exists but is lent elsewhere
        let mut other = Book::new(BookId::new("B100"), "Dune", "Herbert", "ISBN1");
        other.lend_to(MemberId::new("M200"), due());
        snapshot.books.insert(other.id().clone(), other);
        let violations = snapshot.invariant_violations();
        assert_eq!(violations.len(), 1);
        assert!(violations[0].contains("not lent to them"));
    }

    #[test]
    fn test_normalize_sequences_skips_past_existing_ids() {
        let mut snapshot = lent_snapshot();
        snapshot
            .reservations
            .insert(BookId::new("B250"), VecDeque::from([MemberId::new("M300")]));
        snapshot.normalize_sequences();

        assert_eq!(snapshot.sequences.next_book, 251);
        assert_eq!(snapshot.sequences.next_member, 301);
    }

    #[test]
    fn test_normalize_sequences_saturates_at_max_id() {
        let mut snapshot = LibrarySnapshot::new();
        let id = BookId::new(format!("B{}", u64::MAX));
        snapshot
            .books
            .insert(id.clone(), Book::new(id, "Dune", "Herbert", "ISBN1"));
        snapshot.normalize_sequences();

        assert_eq!(snapshot.sequences.next_book, u64::MAX);
        assert_eq!(snapshot.sequences.next_member, FIRST_SEQUENCE);
        assert!(snapshot.sequences.is_exhausted());
    }

    #[test]
    fn test_normalize_sequences_never_goes_backwards() {
        let mut snapshot = lent_snapshot();
        snapshot.sequences.next_book = 500;
        snapshot.normalize_sequences();
        assert_eq!(snapshot.sequences.next_book, 500);
    }
}
