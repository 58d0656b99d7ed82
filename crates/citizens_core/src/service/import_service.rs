//! Import use-case service (consistency engine).
//!
//! # Responsibility
//! - Provide the create/read/update entry points for core callers.
//! - Run schema, date and relatives checks before any persistence.
//! - Classify failures for the outer layer (input, not found, internal).
//!
//! # Invariants
//! - A rejected create or update writes nothing.
//! - The relatives relation of every stored batch stays symmetric.
//! - Errors are never swallowed; only payload decoding failures are turned
//!   into `ValidationError`.

use crate::model::citizen::{Citizen, CitizenId, CitizenPatch, ImportBatch, ImportId};
use crate::repo::import_repo::{ImportRepository, RepoError};
use crate::service::consistency::{check_relatives_symmetric, propagate_relatives};
use crate::validation::schema::{CITIZEN_SCHEMA, IMPORT_SCHEMA, UPDATE_SCHEMA};
use crate::validation::{validate_date, SchemaValidator, ValidationError};
use log::{error, info, warn};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ServiceResult<T> = Result<T, ImportServiceError>;

/// Coarse error class used by outer layers to pick a response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Payload violates a schema or batch invariant (400-class).
    InvalidInput,
    /// Referenced import or citizen does not exist (404-class).
    NotFound,
    /// Operation is part of the contract but not provided (405-class).
    Unsupported,
    /// Storage or other unexpected failure (500-class).
    Internal,
}

/// Errors from import service operations.
#[derive(Debug)]
pub enum ImportServiceError {
    Validation(ValidationError),
    ImportNotFound(ImportId),
    CitizenNotFound {
        import_id: ImportId,
        citizen_id: CitizenId,
    },
    Unsupported(&'static str),
    Repo(RepoError),
}

impl ImportServiceError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Validation(_) => ErrorClass::InvalidInput,
            Self::ImportNotFound(_) | Self::CitizenNotFound { .. } => ErrorClass::NotFound,
            Self::Unsupported(_) => ErrorClass::Unsupported,
            Self::Repo(_) => ErrorClass::Internal,
        }
    }
}

impl Display for ImportServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::ImportNotFound(id) => write!(f, "import {id} doesn't exist"),
            Self::CitizenNotFound {
                import_id,
                citizen_id,
            } => write!(f, "citizen {citizen_id} doesn't exist in import {import_id}"),
            Self::Unsupported(operation) => write!(f, "operation not supported: {operation}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ImportServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for ImportServiceError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<RepoError> for ImportServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(import_id) => Self::ImportNotFound(import_id),
            RepoError::CitizenNotFound {
                import_id,
                citizen_id,
            } => Self::CitizenNotFound {
                import_id,
                citizen_id,
            },
            RepoError::Unsupported(operation) => Self::Unsupported(operation),
            other => Self::Repo(other),
        }
    }
}

/// Import service facade over a repository and a shared schema validator.
pub struct ImportService<'v, R: ImportRepository> {
    repo: R,
    validator: &'v SchemaValidator,
}

impl<'v, R: ImportRepository> ImportService<'v, R> {
    /// Creates service from repository implementation and compiled schemas.
    pub fn new(repo: R, validator: &'v SchemaValidator) -> Self {
        Self { repo, validator }
    }

    /// Read access to the underlying repository.
    pub fn repository(&self) -> &R {
        &self.repo
    }

    /// Validates a full import payload and stores it as a new batch.
    ///
    /// # Contract
    /// - Citizens are checked in input order; the first failure wins.
    /// - Relatives symmetry is checked only after all citizens are staged.
    /// - Returns the new sequential import id.
    pub fn create_import(&mut self, payload: &Value) -> ServiceResult<ImportId> {
        let result = self.try_create_import(payload);
        match &result {
            Ok(import_id) => info!(
                "event=import_create module=service status=ok import_id={import_id}"
            ),
            Err(err) => log_failure("import_create", err),
        }
        result
    }

    /// Loads one batch by id.
    pub fn get_import(&self, import_id: ImportId) -> ServiceResult<ImportBatch> {
        let result = self
            .repo
            .get_import(import_id)
            .map_err(ImportServiceError::from)
            .and_then(|batch| batch.ok_or(ImportServiceError::ImportNotFound(import_id)));
        if let Err(err) = &result {
            log_failure("import_read", err);
        }
        result
    }

    /// Applies a partial update to one citizen and mirrors relatives edits.
    ///
    /// # Contract
    /// - Unknown import or citizen yields a not-found error before the
    ///   payload is looked at.
    /// - The citizen and every peer whose list changed are written in one
    ///   repository call.
    /// - Returns the updated citizen.
    pub fn update_citizen(
        &mut self,
        import_id: ImportId,
        citizen_id: CitizenId,
        fields: &Value,
    ) -> ServiceResult<Citizen> {
        let result = self.try_update_citizen(import_id, citizen_id, fields);
        match &result {
            Ok(_) => info!(
                "event=citizen_update module=service status=ok import_id={import_id} citizen_id={citizen_id}"
            ),
            Err(err) => log_failure("citizen_update", err),
        }
        result
    }

    /// Imports cannot be deleted; always returns `Unsupported`.
    pub fn delete_import(&mut self, import_id: ImportId) -> ServiceResult<()> {
        let result = self
            .repo
            .delete_import(import_id)
            .map_err(ImportServiceError::from);
        if let Err(err) = &result {
            log_failure("import_delete", err);
        }
        result
    }

    fn try_create_import(&mut self, payload: &Value) -> ServiceResult<ImportId> {
        self.validator.validate_import(payload)?;
        let entries = payload
            .get("citizens")
            .and_then(Value::as_array)
            .ok_or_else(|| ValidationError::Schema {
                schema: IMPORT_SCHEMA,
                details: vec!["`citizens` must be an array".to_string()],
            })?;

        let mut staged: BTreeMap<CitizenId, Citizen> = BTreeMap::new();
        for raw in entries {
            self.validator.validate_citizen(raw)?;
            let citizen = Citizen::deserialize(raw).map_err(|err| ValidationError::Schema {
                schema: CITIZEN_SCHEMA,
                details: vec![err.to_string()],
            })?;
            validate_date(&citizen.birth_date)?;

            if staged.contains_key(&citizen.citizen_id) {
                return Err(ValidationError::DuplicateCitizen(citizen.citizen_id).into());
            }
            staged.insert(citizen.citizen_id, citizen);
        }

        check_relatives_symmetric(&staged)?;
        Ok(self.repo.create_import(&staged)?)
    }

    fn try_update_citizen(
        &mut self,
        import_id: ImportId,
        citizen_id: CitizenId,
        fields: &Value,
    ) -> ServiceResult<Citizen> {
        let mut citizens = self
            .repo
            .get_import(import_id)?
            .ok_or(ImportServiceError::ImportNotFound(import_id))?
            .citizens;
        if !citizens.contains_key(&citizen_id) {
            return Err(ImportServiceError::CitizenNotFound {
                import_id,
                citizen_id,
            });
        }

        self.validator.validate_update(fields)?;
        let patch = CitizenPatch::deserialize(fields).map_err(|err| ValidationError::Schema {
            schema: UPDATE_SCHEMA,
            details: vec![err.to_string()],
        })?;
        if let Some(birth_date) = &patch.birth_date {
            validate_date(birth_date)?;
        }

        let mut touched = match &patch.relatives {
            Some(next) => propagate_relatives(&mut citizens, citizen_id, next)?,
            None => Default::default(),
        };
        touched.insert(citizen_id);

        if let Some(citizen) = citizens.get_mut(&citizen_id) {
            patch.apply_to(citizen);
        }

        let changed: Vec<&Citizen> = touched
            .iter()
            .filter_map(|id| citizens.get(id))
            .collect();
        self.repo.update_citizens(import_id, &changed)?;

        citizens
            .remove(&citizen_id)
            .ok_or(ImportServiceError::CitizenNotFound {
                import_id,
                citizen_id,
            })
    }
}

fn log_failure(event: &str, err: &ImportServiceError) {
    match err.class() {
        ErrorClass::InvalidInput | ErrorClass::NotFound | ErrorClass::Unsupported => warn!(
            "event={event} module=service status=rejected error={err}"
        ),
        ErrorClass::Internal => error!(
            "event={event} module=service status=error error={err} source={:?}",
            err.source()
        ),
    }
}
