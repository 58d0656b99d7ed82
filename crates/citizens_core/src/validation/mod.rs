//! Input validation for import and update payloads.
//!
//! # Responsibility
//! - Apply structural JSON schemas to incoming payloads.
//! - Check calendar validity of textual dates.
//! - Define the caller-input error taxonomy shared by the engine.
//!
//! # Invariants
//! - Validators never mutate their input.
//! - Every rejection carries a human-readable description.

use crate::model::citizen::CitizenId;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod date;
pub mod schema;

pub use date::validate_date;
pub use schema::{SchemaCompileError, SchemaRegistry, SchemaValidator};

/// Caller-input error: the payload violates a schema or a batch invariant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Payload does not match the named structural schema.
    Schema {
        schema: &'static str,
        details: Vec<String>,
    },
    /// Text is not a real `DD.MM.YYYY` calendar date.
    InvalidDate { value: String, reason: String },
    /// Citizen id appears more than once in one import payload.
    DuplicateCitizen(CitizenId),
    /// A relatives list references a citizen missing from the batch.
    UnknownRelative(CitizenId),
    /// `citizen_id` lists `relative_id`, but not the other way around.
    AsymmetricRelatives {
        citizen_id: CitizenId,
        relative_id: CitizenId,
    },
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Schema { schema, details } => {
                write!(f, "payload does not match `{schema}`: {}", details.join("; "))
            }
            Self::InvalidDate { value, reason } => {
                write!(f, "invalid date `{value}`: {reason}")
            }
            Self::DuplicateCitizen(id) => write!(f, "citizen_ids are not unique: {id}"),
            Self::UnknownRelative(id) => write!(f, "relative {id} doesn't exist"),
            Self::AsymmetricRelatives {
                citizen_id,
                relative_id,
            } => write!(
                f,
                "citizens relatives are not bidirectional: {citizen_id} lists {relative_id}, \
                 but {relative_id} does not list {citizen_id}"
            ),
        }
    }
}

impl Error for ValidationError {}
