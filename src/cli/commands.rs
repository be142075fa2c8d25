//! CLI command implementations
//!
//! Each command opens the store named in the config, runs one operation and
//! returns the JSON payload for the success response. Mutating commands take
//! the record lock and always release it before returning.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::booking::BookingService;
use crate::config::StoreConfig;
use crate::schema::{FieldDef, Schema};
use crate::store::RecordStore;

use super::args::{Cli, Command};
use super::errors::{CliError, CliResult};
use super::io::{write_error, write_response};

/// Configuration file structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CliConfig {
    /// Database file (required)
    pub db_path: PathBuf,

    /// Engine configuration
    #[serde(flatten)]
    pub store: StoreConfig,

    /// Schema used by `init` (optional otherwise)
    #[serde(default)]
    pub fields: Option<Vec<FieldDef>>,
}

impl CliConfig {
    /// Load configuration from file
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| CliError::config_error(format!("Failed to read config: {}", e)))?;

        let config: CliConfig = serde_json::from_str(&content)
            .map_err(|e| CliError::config_error(format!("Invalid config JSON: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    fn validate(&self) -> CliResult<()> {
        if self.db_path.as_os_str().is_empty() {
            return Err(CliError::config_error("db_path must not be empty"));
        }
        self.store
            .validate()
            .map_err(|e| CliError::config_error(e.to_string()))
    }

    fn open_store(&self) -> CliResult<RecordStore> {
        Ok(RecordStore::open(&self.db_path, self.store.clone())?)
    }
}

/// Parse arguments, run the command and write the response
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    match run_command(&cli.config, cli.command) {
        Ok(data) => write_response(data),
        Err(e) => {
            write_error(e.code_str(), e.message())?;
            Err(e)
        }
    }
}

/// Run one command against the database named in the config file
pub fn run_command(config_path: &Path, cmd: Command) -> CliResult<Value> {
    let config = CliConfig::load(config_path)?;
    match cmd {
        Command::Init => init(&config),
        Command::Schema => schema(&config),
        Command::Find { criteria } => find(&config, &criteria),
        Command::Read { record } => read(&config, record),
        Command::Create { values } => create(&config, &values),
        Command::Delete { record } => delete(&config, record),
        Command::Book { record, customer } => book(&config, record, &customer),
        Command::Release { record } => release(&config, record),
    }
}

/// Create an empty database file with the configured schema
pub fn init(config: &CliConfig) -> CliResult<Value> {
    if config.db_path.exists() {
        return Err(CliError::already_initialized(&config.db_path));
    }
    let fields = config.fields.clone().ok_or_else(CliError::missing_schema)?;
    let schema = Schema::new(fields)?;

    let store = RecordStore::create_file(&config.db_path, config.store.clone(), &schema)?;
    Ok(json!({
        "db_path": config.db_path,
        "record_size": store.schema().record_size(),
        "fields": store.schema().fields(),
    }))
}

/// Describe the schema and slot usage
pub fn schema(config: &CliConfig) -> CliResult<Value> {
    let store = config.open_store()?;
    Ok(json!({
        "record_size": store.schema().record_size(),
        "fields": store.schema().fields(),
        "record_count": store.record_count(),
        "free_slots": store.free_slots(),
    }))
}

/// List live records matching the given prefixes
pub fn find(config: &CliConfig, criteria: &[(usize, String)]) -> CliResult<Value> {
    let store = config.open_store()?;
    let field_count = store.schema().field_count();

    let mut pattern: Vec<Option<String>> = vec![None; field_count];
    for (index, prefix) in criteria {
        let slot = pattern.get_mut(*index).ok_or_else(|| {
            CliError::invalid_argument(format!(
                "field index {} out of range for {} fields",
                index, field_count
            ))
        })?;
        *slot = Some(prefix.clone());
    }

    let records = store.find(&pattern)?;
    Ok(json!({ "records": records }))
}

pub fn read(config: &CliConfig, record: u32) -> CliResult<Value> {
    let store = config.open_store()?;
    let fields = store.read(record)?;
    Ok(json!({ "record": record, "fields": fields }))
}

pub fn create(config: &CliConfig, values: &[String]) -> CliResult<Value> {
    let store = config.open_store()?;
    let record = store.create(values)?;
    Ok(json!({ "record": record }))
}

pub fn delete(config: &CliConfig, record: u32) -> CliResult<Value> {
    let store = config.open_store()?;
    let token = store.lock(record)?;
    let deleted = store.delete(record, token);
    store.unlock(record, token)?;
    deleted?;
    Ok(json!({ "record": record }))
}

pub fn book(config: &CliConfig, record: u32, customer: &str) -> CliResult<Value> {
    let booking = BookingService::new(config.open_store()?)?;
    let fields = booking.book(record, customer)?;
    Ok(json!({ "record": record, "fields": fields }))
}

pub fn release(config: &CliConfig, record: u32) -> CliResult<Value> {
    let booking = BookingService::new(config.open_store()?)?;
    let fields = booking.release(record)?;
    Ok(json!({ "record": record, "fields": fields }))
}
