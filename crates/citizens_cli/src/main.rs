//! Command-line caller for the citizens import core.
//!
//! # Responsibility
//! - Map `import`, `show` and `patch` onto the core create/read/update calls.
//! - Render results as `{"data": ...}` and failures as
//!   `{"error": <code>, "description": <text>}` on stdout.
//!
//! # Invariants
//! - Internal failures are logged in full but reported generically.

use citizens_core::config::DB_PATH_VAR;
use citizens_core::db::{open_db, DbError};
use citizens_core::{
    init_logging, AppConfig, ConfigError, ErrorClass, ImportService, ImportServiceError,
    LoggingError, SchemaCompileError, SchemaValidator, SqliteImportRepository,
};
use clap::{Parser, Subcommand};
use log::error;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

const SETUP_FAILURE_EXIT: u8 = 2;

#[derive(Debug, Parser)]
#[command(name = "citizens-cli", version, about = "Import and edit citizen batches")]
struct Cli {
    /// SQLite database path; overrides `CITIZENS_DB_PATH`.
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create an import batch from a JSON payload file.
    Import { file: PathBuf },
    /// Print every citizen of an import batch, ordered by id.
    Show { import_id: i64 },
    /// Apply a partial update from a JSON file to one citizen.
    Patch {
        import_id: i64,
        citizen_id: i64,
        file: PathBuf,
    },
}

enum CliError {
    /// Process could not be set up (config, logging, schemas, database).
    Setup(String),
    /// Payload file could not be read or parsed.
    BadPayload(String),
    Service(ImportServiceError),
    Internal(String),
}

impl CliError {
    fn status(&self) -> u16 {
        match self {
            Self::Setup(_) | Self::Internal(_) => 500,
            Self::BadPayload(_) => 400,
            Self::Service(err) => match err.class() {
                ErrorClass::InvalidInput => 400,
                ErrorClass::NotFound => 404,
                ErrorClass::Unsupported => 405,
                ErrorClass::Internal => 500,
            },
        }
    }

    fn description(&self) -> String {
        match self {
            Self::BadPayload(message) => message.clone(),
            Self::Service(err) if err.class() != ErrorClass::Internal => err.to_string(),
            _ => "Internal Server Error".to_string(),
        }
    }
}

impl From<ImportServiceError> for CliError {
    fn from(value: ImportServiceError) -> Self {
        Self::Service(value)
    }
}

impl From<ConfigError> for CliError {
    fn from(value: ConfigError) -> Self {
        Self::Setup(value.to_string())
    }
}

impl From<LoggingError> for CliError {
    fn from(value: LoggingError) -> Self {
        Self::Setup(value.to_string())
    }
}

impl From<SchemaCompileError> for CliError {
    fn from(value: SchemaCompileError) -> Self {
        Self::Setup(value.to_string())
    }
}

impl From<DbError> for CliError {
    fn from(value: DbError) -> Self {
        Self::Setup(value.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(value: serde_json::Error) -> Self {
        Self::Internal(value.to_string())
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(data) => {
            println!("{}", json!({ "data": data }));
            ExitCode::SUCCESS
        }
        Err(CliError::Setup(message)) => {
            eprintln!("citizens-cli: {message}");
            ExitCode::from(SETUP_FAILURE_EXIT)
        }
        Err(err) => {
            if err.status() == 500 {
                match &err {
                    CliError::Service(inner) => error!("event=cli_run module=cli status=error error={inner}"),
                    CliError::Internal(message) => error!("event=cli_run module=cli status=error error={message}"),
                    _ => {}
                }
            }
            println!(
                "{}",
                json!({ "error": err.status(), "description": err.description() })
            );
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<Value, CliError> {
    let config = load_config(cli.db)?;
    if let Some(log) = &config.log {
        init_logging(log)?;
    }

    let validator = SchemaValidator::builtin()?;
    let mut conn = open_db(&config.db_path)?;
    let mut service = ImportService::new(SqliteImportRepository::new(&mut conn), &validator);

    match cli.command {
        Command::Import { file } => {
            let payload = read_payload(&file)?;
            let import_id = service.create_import(&payload)?;
            Ok(json!({ "import_id": import_id }))
        }
        Command::Show { import_id } => {
            let batch = service.get_import(import_id)?;
            Ok(serde_json::to_value(batch.citizen_list())?)
        }
        Command::Patch {
            import_id,
            citizen_id,
            file,
        } => {
            let fields = read_payload(&file)?;
            let citizen = service.update_citizen(import_id, citizen_id, &fields)?;
            Ok(serde_json::to_value(citizen)?)
        }
    }
}

fn load_config(db: Option<PathBuf>) -> Result<AppConfig, ConfigError> {
    match db {
        Some(path) => {
            let db_path = path.to_string_lossy().into_owned();
            AppConfig::from_lookup(|key| {
                if key == DB_PATH_VAR {
                    Some(db_path.clone())
                } else {
                    std::env::var(key).ok()
                }
            })
        }
        None => AppConfig::from_env(),
    }
}

fn read_payload(path: &Path) -> Result<Value, CliError> {
    let text = std::fs::read_to_string(path).map_err(|err| {
        CliError::BadPayload(format!("cannot read `{}`: {err}", path.display()))
    })?;
    serde_json::from_str(&text).map_err(|err| {
        CliError::BadPayload(format!("`{}` is not valid JSON: {err}", path.display()))
    })
}
