//! JSON schema registry and compiled payload validators.
//!
//! # Responsibility
//! - Hold parsed schema documents by name (`SchemaRegistry`).
//! - Compile import/citizen/update validators once (`SchemaValidator`).
//!
//! # Invariants
//! - Cross-document `$ref`s resolve through the registry only, never through
//!   the file system or network.
//! - A `SchemaValidator` is immutable after construction and safe to share.

use super::ValidationError;
use jsonschema::{Draft, Retrieve, Uri, Validator};
use serde_json::Value;
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

pub const FIELDS_SCHEMA: &str = "fields.json";
pub const IMPORT_SCHEMA: &str = "import.json";
pub const CITIZEN_SCHEMA: &str = "citizen.json";
pub const UPDATE_SCHEMA: &str = "update.json";

const BUILTIN_SCHEMAS: &[(&str, &str)] = &[
    (FIELDS_SCHEMA, include_str!("../../schemas/fields.json")),
    (IMPORT_SCHEMA, include_str!("../../schemas/import.json")),
    (CITIZEN_SCHEMA, include_str!("../../schemas/citizen.json")),
    (UPDATE_SCHEMA, include_str!("../../schemas/update.json")),
];

/// Internal failure while loading or compiling schema documents.
#[derive(Debug)]
pub enum SchemaCompileError {
    /// Schema name is not present in the registry.
    Missing(String),
    /// Schema text is not valid JSON.
    Malformed { schema: String, message: String },
    /// Schema document was rejected by the compiler (bad keyword, dangling `$ref`).
    Invalid { schema: String, message: String },
}

impl Display for SchemaCompileError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Missing(name) => write!(f, "schema `{name}` is not registered"),
            Self::Malformed { schema, message } => {
                write!(f, "schema `{schema}` is not valid JSON: {message}")
            }
            Self::Invalid { schema, message } => {
                write!(f, "schema `{schema}` failed to compile: {message}")
            }
        }
    }
}

impl Error for SchemaCompileError {}

/// Name → parsed schema document mapping used for compilation and `$ref`s.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    schemas: HashMap<String, Value>,
}

impl SchemaRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding the schema documents shipped with the crate.
    pub fn builtin() -> Result<Self, SchemaCompileError> {
        let mut registry = Self::new();
        for (name, text) in BUILTIN_SCHEMAS {
            registry.insert_json(name, text)?;
        }
        Ok(registry)
    }

    /// Registers (or replaces) one parsed schema document.
    pub fn insert(&mut self, name: impl Into<String>, schema: Value) {
        self.schemas.insert(name.into(), schema);
    }

    /// Parses and registers one schema document from JSON text.
    pub fn insert_json(&mut self, name: &str, text: &str) -> Result<(), SchemaCompileError> {
        let schema = serde_json::from_str(text).map_err(|err| SchemaCompileError::Malformed {
            schema: name.to_string(),
            message: err.to_string(),
        })?;
        self.insert(name, schema);
        Ok(())
    }

    /// Resolves a schema name to its document.
    pub fn resolve(&self, name: &str) -> Option<&Value> {
        self.schemas.get(name)
    }
}

/// Resolves `$ref` targets by the last path segment of their URI.
///
/// Relative refs such as `fields.json#/definitions/id` arrive here as
/// `json-schema:///fields.json`.
struct RegistryRetriever {
    schemas: Arc<HashMap<String, Value>>,
}

impl Retrieve for RegistryRetriever {
    fn retrieve(
        &self,
        uri: &Uri<&str>,
    ) -> Result<Value, Box<dyn std::error::Error + Send + Sync>> {
        let name = schema_name(uri.as_str());
        self.schemas
            .get(name)
            .cloned()
            .ok_or_else(|| format!("schema `{name}` is not registered").into())
    }
}

fn schema_name(uri: &str) -> &str {
    let without_fragment = uri.split('#').next().unwrap_or(uri);
    without_fragment
        .rsplit('/')
        .next()
        .unwrap_or(without_fragment)
}

/// Compiled validators for import, citizen and update payloads.
pub struct SchemaValidator {
    import: Validator,
    citizen: Validator,
    update: Validator,
}

impl SchemaValidator {
    /// Compiles all payload validators from `registry`.
    ///
    /// # Errors
    /// - `SchemaCompileError` when a schema is missing or does not compile.
    pub fn new(registry: &SchemaRegistry) -> Result<Self, SchemaCompileError> {
        let shared = Arc::new(registry.schemas.clone());
        Ok(Self {
            import: compile(&shared, IMPORT_SCHEMA)?,
            citizen: compile(&shared, CITIZEN_SCHEMA)?,
            update: compile(&shared, UPDATE_SCHEMA)?,
        })
    }

    /// Compiles validators from the schema documents shipped with the crate.
    pub fn builtin() -> Result<Self, SchemaCompileError> {
        Self::new(&SchemaRegistry::builtin()?)
    }

    /// Checks the top-level shape of an import payload.
    pub fn validate_import(&self, payload: &Value) -> Result<(), ValidationError> {
        check(&self.import, IMPORT_SCHEMA, payload)
    }

    /// Checks one full citizen record (strict shape, no unknown fields).
    pub fn validate_citizen(&self, record: &Value) -> Result<(), ValidationError> {
        check(&self.citizen, CITIZEN_SCHEMA, record)
    }

    /// Checks a partial update payload. `citizen_id` is never accepted.
    pub fn validate_update(&self, fields: &Value) -> Result<(), ValidationError> {
        check(&self.update, UPDATE_SCHEMA, fields)
    }
}

fn compile(
    schemas: &Arc<HashMap<String, Value>>,
    name: &'static str,
) -> Result<Validator, SchemaCompileError> {
    let schema = schemas
        .get(name)
        .ok_or_else(|| SchemaCompileError::Missing(name.to_string()))?;

    jsonschema::options()
        .with_draft(Draft::Draft7)
        .with_retriever(RegistryRetriever {
            schemas: Arc::clone(schemas),
        })
        .build(schema)
        .map_err(|err| SchemaCompileError::Invalid {
            schema: name.to_string(),
            message: err.to_string(),
        })
}

fn check(validator: &Validator, schema: &'static str, instance: &Value) -> Result<(), ValidationError> {
    let details: Vec<String> = validator
        .iter_errors(instance)
        .map(|err| {
            let path = err.instance_path.to_string();
            if path.is_empty() {
                err.to_string()
            } else {
                format!("{path}: {err}")
            }
        })
        .collect();

    if details.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::Schema { schema, details })
    }
}
