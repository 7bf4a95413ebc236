//! Registered members

use std::collections::BTreeSet;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::ids::{BookId, MemberId};

fn default_active() -> bool {
    true
}

/// A registered member and the books they currently hold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    id: MemberId,
    name: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    phone: String,
    #[serde(default)]
    membership_date: Option<NaiveDate>,
    #[serde(rename = "isActive", default = "default_active")]
    active: bool,
    #[serde(default)]
    borrowed_books: BTreeSet<BookId>,
}

impl Member {
    /// Create an active member holding no books
    pub fn new(id: MemberId, name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            email: email.into(),
            phone: String::new(),
            membership_date: None,
            active: true,
            borrowed_books: BTreeSet::new(),
        }
    }

    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = phone.into();
        self
    }

    pub fn joined_on(mut self, date: NaiveDate) -> Self {
        self.membership_date = Some(date);
        self
    }

    pub fn id(&self) -> &MemberId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn phone(&self) -> &str {
        &self.phone
    }

    /// Registration date; absent for records that predate it
    pub fn membership_date(&self) -> Option<NaiveDate> {
        self.membership_date
    }

    /// Inactive members keep their record and loans.
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn borrowed_books(&self) -> &BTreeSet<BookId> {
        &self.borrowed_books
    }

    pub fn holds(&self, book: &BookId) -> bool {
        self.borrowed_books.contains(book)
    }

    /// Returns false if the book was already held.
    pub(crate) fn borrow(&mut self, book: BookId) -> bool {
        self.borrowed_books.insert(book)
    }

    /// Returns false if the book was not held.
    pub(crate) fn give_back(&mut self, book: &BookId) -> bool {
        self.borrowed_books.remove(book)
    }

    /// Returns false if the flag already had that value.
    pub(crate) fn set_active(&mut self, active: bool) -> bool {
        let changed = self.active != active;
        self.active = active;
        changed
    }
}

impl fmt::Display for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}
