//! circulation CLI entry point
//!
//! Parses arguments and dispatches through `cli::run`, which has already
//! printed the JSON error response when it fails. The error is repeated on
//! stderr and the process exits non-zero.

use circulation::cli;

fn main() {
    if let Err(e) = cli::run() {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
