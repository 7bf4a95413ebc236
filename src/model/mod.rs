//! Entity model for the circulation core
//!
//! Passive records with identity and state. The only mutators are
//! crate-internal and keep each record's own invariant; cross-record
//! invariants (who holds what) are maintained by the registry.

mod book;
mod history;
mod ids;
mod member;
mod snapshot;

pub use book::Book;
pub use history::{HistoryEntry, TransactionKind};
pub use ids::{BookId, MemberId, FIRST_SEQUENCE};
pub use member::Member;
pub use snapshot::{IdSequences, LibrarySnapshot};
