//! CLI argument definitions using clap
//!
//! Commands:
//! - slotstore --config <path> init
//! - slotstore --config <path> schema
//! - slotstore --config <path> find [--field IDX=PREFIX]...
//! - slotstore --config <path> read <record>
//! - slotstore --config <path> create <value>...
//! - slotstore --config <path> delete <record>
//! - slotstore --config <path> book <record> <customer>
//! - slotstore --config <path> release <record>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// slotstore - a fixed-width record store with per-record locking
#[derive(Parser, Debug)]
#[command(name = "slotstore")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, global = true, default_value = "./slotstore.json")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Create a new database file from the schema in the config
    Init,

    /// Print the schema and slot usage
    Schema,

    /// List live records matching field prefixes
    Find {
        /// Criterion as FIELD_INDEX=PREFIX, repeatable
        #[arg(long = "field", value_parser = parse_criterion)]
        criteria: Vec<(usize, String)>,
    },

    /// Print one record
    Read {
        record: u32,
    },

    /// Insert a record, one value per field
    Create {
        #[arg(required = true)]
        values: Vec<String>,
    },

    /// Delete a record
    Delete {
        record: u32,
    },

    /// Book an available record for a customer
    Book {
        record: u32,
        customer: String,
    },

    /// Make a booked record available again
    Release {
        record: u32,
    },
}

/// Parses `IDX=PREFIX`; the prefix may be empty.
pub fn parse_criterion(value: &str) -> Result<(usize, String), String> {
    let (index, prefix) = value
        .split_once('=')
        .ok_or_else(|| format!("expected FIELD_INDEX=PREFIX, got '{}'", value))?;
    let index = index
        .trim()
        .parse::<usize>()
        .map_err(|e| format!("invalid field index '{}': {}", index, e))?;
    Ok((index, prefix.to_string()))
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
