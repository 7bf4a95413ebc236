//! circulation - a small library circulation manager
//!
//! Catalog, members, checkout/return, FIFO reservations and borrowing
//! history, kept in one shared registry and saved as a JSON snapshot after
//! every change.

pub mod alerts;
pub mod cli;
pub mod config;
pub mod library;
pub mod model;
pub mod observability;
pub mod persistence;

pub use alerts::{AlertPolicy, AlertScheduler, AlertSink, DueAlert};
pub use config::LibraryConfig;
pub use library::{CheckoutOutcome, Library, LibraryError, LibraryResult, LoanPolicy};
pub use model::{Book, BookId, HistoryEntry, LibrarySnapshot, Member, MemberId};
pub use persistence::{DataStore, MemoryStore, SnapshotStore, StoreOptions};
