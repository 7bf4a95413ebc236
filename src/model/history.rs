//! Borrowing history records

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::book::Book;
use super::ids::{BookId, MemberId};

/// What happened to a book
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Checkout,
    Return,
    /// Free text that names no transaction
    Note,
}

/// One entry in a member's append-only history.
///
/// The title is captured at the time of the transaction so the entry still
/// reads correctly after the book leaves the catalog. Entries read from a
/// plain-text log have no book id or timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    kind: TransactionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    book_id: Option<BookId>,
    member_id: MemberId,
    title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    recorded_at: Option<DateTime<Utc>>,
}

impl HistoryEntry {
    pub fn new(
        kind: TransactionKind,
        book: &Book,
        member_id: MemberId,
        recorded_at: DateTime<Utc>,
    ) -> Self {
        Self {
            kind,
            book_id: Some(book.id().clone()),
            member_id,
            title: book.title().to_string(),
            recorded_at: Some(recorded_at),
        }
    }

    /// Parse a line of the plain-text log, e.g. `Checked out Dune`.
    /// Lines in neither form are kept verbatim as notes.
    pub fn from_text(member_id: MemberId, text: &str) -> Self {
        let (kind, title) = if let Some(title) = text.strip_prefix("Checked out ") {
            (TransactionKind::Checkout, title)
        } else if let Some(title) = text.strip_prefix("Returned ") {
            (TransactionKind::Return, title)
        } else {
            (TransactionKind::Note, text)
        };
        Self {
            kind,
            book_id: None,
            member_id,
            title: title.to_string(),
            recorded_at: None,
        }
    }

    pub fn kind(&self) -> TransactionKind {
        self.kind
    }

    pub fn book_id(&self) -> Option<&BookId> {
        self.book_id.as_ref()
    }

    pub fn member_id(&self) -> &MemberId {
        &self.member_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn recorded_at(&self) -> Option<DateTime<Utc>> {
        self.recorded_at
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LoggedEntry {
    Record(HistoryEntry),
    Text(String),
}

/// Reads the history map with entries either structured or plain text.
pub(crate) fn deserialize_log<'de, D>(
    deserializer: D,
) -> Result<BTreeMap<MemberId, Vec<HistoryEntry>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = BTreeMap::<MemberId, Vec<LoggedEntry>>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .map(|(member_id, entries)| {
            let entries = entries
                .into_iter()
                .map(|entry| match entry {
                    LoggedEntry::Record(entry) => entry,
                    LoggedEntry::Text(text) => HistoryEntry::from_text(member_id.clone(), &text),
                })
                .collect();
            (member_id, entries)
        })
        .collect())
}

impl fmt::Display for HistoryEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TransactionKind::Checkout => write!(f, "Checked out {}", self.title),
            TransactionKind::Return => write!(f, "Returned {}", self.title),
            TransactionKind::Note => f.write_str(&self.title),
        }
    }
}
