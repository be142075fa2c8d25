//! Command-line interface
//!
//! A thin, one-shot front end over the record store and booking workflow.
//! Each invocation loads a JSON config, runs one command and prints one JSON
//! response.

mod args;
mod commands;
mod errors;
mod io;

pub use args::{parse_criterion, Cli, Command};
pub use commands::{run, run_command, CliConfig};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{write_error, write_response};
