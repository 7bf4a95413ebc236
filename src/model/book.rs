//! Catalog entries

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::ids::{BookId, MemberId};

fn default_available() -> bool {
    true
}

/// A book in the catalog.
///
/// `available`, `current_borrower_id` and `due_date` move together: a book
/// is available exactly when it has neither a borrower nor a due date. The
/// only way to change them is `lend_to`/`release`, which keep that true.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    id: BookId,
    title: String,
    author: String,
    #[serde(default)]
    isbn: String,
    #[serde(default)]
    category: String,
    #[serde(default = "default_available")]
    available: bool,
    #[serde(default)]
    current_borrower_id: Option<MemberId>,
    #[serde(default)]
    due_date: Option<NaiveDate>,
}

impl Book {
    /// Create an available book
    pub fn new(
        id: BookId,
        title: impl Into<String>,
        author: impl Into<String>,
        isbn: impl Into<String>,
    ) -> Self {
        Self {
            id,
            title: title.into(),
            author: author.into(),
            isbn: isbn.into(),
            category: String::new(),
            available: true,
            current_borrower_id: None,
            due_date: None,
        }
    }

    /// Shelf category, empty when uncategorized
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn id(&self) -> &BookId {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn author(&self) -> &str {
        &self.author
    }

    pub fn isbn(&self) -> &str {
        &self.isbn
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn is_available(&self) -> bool {
        self.available
    }

    pub fn current_borrower_id(&self) -> Option<&MemberId> {
        self.current_borrower_id.as_ref()
    }

    pub fn due_date(&self) -> Option<NaiveDate> {
        self.due_date
    }

    /// Whole days from `today` until the due date; negative when overdue.
    pub fn days_until_due(&self, today: NaiveDate) -> Option<i64> {
        self.due_date.map(|due| (due - today).num_days())
    }

    /// Availability, borrower and due date agree with each other.
    pub fn is_consistent(&self) -> bool {
        match (self.available, &self.current_borrower_id, self.due_date) {
            (true, None, None) => true,
            (false, Some(_), Some(_)) => true,
            _ => false,
        }
    }

    /// Mark as borrowed by `member` until `due`.
    pub(crate) fn lend_to(&mut self, member: MemberId, due: NaiveDate) {
        self.available = false;
        self.current_borrower_id = Some(member);
        self.due_date = Some(due);
    }

    /// Mark as available again, returning the previous borrower.
    pub(crate) fn release(&mut self) -> Option<MemberId> {
        self.available = true;
        self.due_date = None;
        self.current_borrower_id.take()
    }
}

impl fmt::Display for Book {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = if self.available {
            "Available"
        } else {
            "Checked Out"
        };
        write!(
            f,
            "{} by {} [{}] - {}",
            self.title, self.author, self.isbn, status
        )
    }
}
