//! CLI module for the circulation manager
//!
//! A thin shell over `Library`: one command per invocation, one JSON object
//! on stdout, structured logs on stderr.

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{init, run, run_command};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{write_error, write_response};
