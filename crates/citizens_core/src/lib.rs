//! Core domain logic for citizen import batches.
//! This crate is the single source of truth for batch invariants.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod validation;

pub use config::{default_log_level, AppConfig, ConfigError, LogConfig};
pub use logging::{init_logging, logging_status, LoggingError};
pub use model::citizen::{Citizen, CitizenId, CitizenPatch, Gender, ImportBatch, ImportId};
pub use repo::import_repo::{ImportRepository, RepoError, RepoResult, SqliteImportRepository};
pub use service::import_service::{ErrorClass, ImportService, ImportServiceError, ServiceResult};
pub use validation::{
    validate_date, SchemaCompileError, SchemaRegistry, SchemaValidator, ValidationError,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
