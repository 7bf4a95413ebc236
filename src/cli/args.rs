//! CLI argument definitions using clap
//!
//! Every subcommand reads the same `--config` file (defaults when absent).

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

/// Library circulation manager
#[derive(Parser, Debug)]
#[command(name = "circulation")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, global = true, default_value = "./circulation.json")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Write a default config (if missing) and an empty data file
    Init,

    /// Add a book to the catalog
    AddBook {
        #[arg(long)]
        title: String,
        #[arg(long)]
        author: String,
        #[arg(long, default_value = "")]
        isbn: String,
        #[arg(long, default_value = "")]
        category: String,
    },

    /// Remove a book and its reservation queue
    RemoveBook { book_id: String },

    /// Register a member
    AddMember {
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        email: String,
        #[arg(long, default_value = "")]
        phone: String,
    },

    /// Remove a member record (loans and history are kept)
    RemoveMember { member_id: String },

    /// Mark a member inactive
    Deactivate { member_id: String },

    /// Mark a member active again
    Activate { member_id: String },

    /// Lend a book to a member
    Checkout {
        book_id: String,
        member_id: String,
        /// Count the loan period from this date instead of today
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Take a book back
    Return { book_id: String },

    /// Queue a member for a book
    Reserve { book_id: String, member_id: String },

    /// Serve the head of a book's reservation queue
    NextReservation { book_id: String },

    /// Show a book's reservation queue
    Reservations { book_id: String },

    /// List books currently lent out
    Outstanding,

    /// Show a member's borrowing history
    History { member_id: String },

    /// Find books by title
    Search {
        #[arg(default_value = "")]
        query: String,
    },

    /// List the catalog
    Books,

    /// List registered members
    Members,

    /// Run one due-date scan
    Alerts {
        /// Alert window in days (config `alert_days_before` by default)
        #[arg(long)]
        days: Option<u32>,
        /// Scan as of this date instead of today
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Run periodic due-date scans until Ctrl-C
    Watch,

    /// List backups, newest first
    Backups,

    /// Replace the state with a backup (the newest by default)
    Restore { backup: Option<String> },

    /// Write the state to a file
    Export { path: PathBuf },

    /// Replace the state with a previously exported file
    Import { path: PathBuf },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
