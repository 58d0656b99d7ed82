//! Import batch repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Persist a whole import batch atomically and assign its sequential id.
//! - Overwrite selected citizen sub-records of one batch atomically.
//!
//! # Invariants
//! - Import id is `count + 1`, computed inside the same `IMMEDIATE`
//!   transaction as the insert, so concurrent creators never share an id.
//! - Read paths reject corrupted rows instead of masking them.
//! - Imports are never deleted.

use crate::db::DbError;
use crate::model::citizen::{Citizen, CitizenId, ImportBatch, ImportId};
use rusqlite::{params, Connection, Row, TransactionBehavior};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for import persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    NotFound(ImportId),
    CitizenNotFound {
        import_id: ImportId,
        citizen_id: CitizenId,
    },
    InvalidData(String),
    Serialization(serde_json::Error),
    /// Operation exists in the contract but is intentionally not provided.
    Unsupported(&'static str),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "import not found: {id}"),
            Self::CitizenNotFound {
                import_id,
                citizen_id,
            } => write!(f, "citizen {citizen_id} not found in import {import_id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted import data: {message}"),
            Self::Serialization(err) => write!(f, "citizen serialization failed: {err}"),
            Self::Unsupported(operation) => write!(f, "operation not supported: {operation}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Serialization(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<serde_json::Error> for RepoError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization(value)
    }
}

/// Record-store interface for import batches.
pub trait ImportRepository {
    /// Number of stored imports.
    fn count_imports(&self) -> RepoResult<i64>;
    /// Persists a full batch and returns its newly assigned id.
    fn create_import(&mut self, citizens: &BTreeMap<CitizenId, Citizen>) -> RepoResult<ImportId>;
    /// Loads one batch, `None` when the id is unknown.
    fn get_import(&self, import_id: ImportId) -> RepoResult<Option<ImportBatch>>;
    /// Overwrites the given citizens of one batch in a single transaction.
    fn update_citizens(&mut self, import_id: ImportId, citizens: &[&Citizen]) -> RepoResult<()>;
    /// Always fails with `RepoError::Unsupported`; imports are never deleted.
    fn delete_import(&mut self, import_id: ImportId) -> RepoResult<()>;
}

/// SQLite-backed import repository.
pub struct SqliteImportRepository<'conn> {
    conn: &'conn mut Connection,
}

impl<'conn> SqliteImportRepository<'conn> {
    pub fn new(conn: &'conn mut Connection) -> Self {
        Self { conn }
    }
}

impl ImportRepository for SqliteImportRepository<'_> {
    fn count_imports(&self) -> RepoResult<i64> {
        count_imports_in(self.conn)
    }

    fn create_import(&mut self, citizens: &BTreeMap<CitizenId, Citizen>) -> RepoResult<ImportId> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let import_id = count_imports_in(&tx)? + 1;

        tx.execute("INSERT INTO imports (id) VALUES (?1);", [import_id])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO citizens (import_id, citizen_id, payload)
                 VALUES (?1, ?2, ?3);",
            )?;
            for citizen in citizens.values() {
                let payload = serde_json::to_string(citizen)?;
                stmt.execute(params![import_id, citizen.citizen_id, payload])?;
            }
        }
        tx.commit()?;

        Ok(import_id)
    }

    fn get_import(&self, import_id: ImportId) -> RepoResult<Option<ImportBatch>> {
        if !import_exists(self.conn, import_id)? {
            return Ok(None);
        }

        let mut stmt = self.conn.prepare(
            "SELECT citizen_id, payload
             FROM citizens
             WHERE import_id = ?1
             ORDER BY citizen_id ASC;",
        )?;
        let mut rows = stmt.query([import_id])?;
        let mut citizens = BTreeMap::new();

        while let Some(row) = rows.next()? {
            let citizen = parse_citizen_row(import_id, row)?;
            citizens.insert(citizen.citizen_id, citizen);
        }

        Ok(Some(ImportBatch {
            import_id,
            citizens,
        }))
    }

    fn update_citizens(&mut self, import_id: ImportId, citizens: &[&Citizen]) -> RepoResult<()> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        if !import_exists(&tx, import_id)? {
            return Err(RepoError::NotFound(import_id));
        }

        for citizen in citizens {
            let payload = serde_json::to_string(citizen)?;
            let changed = tx.execute(
                "UPDATE citizens
                 SET
                    payload = ?1,
                    updated_at = (strftime('%s', 'now') * 1000)
                 WHERE import_id = ?2 AND citizen_id = ?3;",
                params![payload, import_id, citizen.citizen_id],
            )?;
            if changed == 0 {
                // Dropping `tx` rolls back rows already written in this call.
                return Err(RepoError::CitizenNotFound {
                    import_id,
                    citizen_id: citizen.citizen_id,
                });
            }
        }
        tx.commit()?;

        Ok(())
    }

    fn delete_import(&mut self, _import_id: ImportId) -> RepoResult<()> {
        Err(RepoError::Unsupported("delete_import"))
    }
}

fn count_imports_in(conn: &Connection) -> RepoResult<i64> {
    let count = conn.query_row("SELECT COUNT(*) FROM imports;", [], |row| row.get(0))?;
    Ok(count)
}

fn import_exists(conn: &Connection, import_id: ImportId) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM imports WHERE id = ?1);",
        [import_id],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn parse_citizen_row(import_id: ImportId, row: &Row<'_>) -> RepoResult<Citizen> {
    let citizen_id: CitizenId = row.get("citizen_id")?;
    let payload: String = row.get("payload")?;
    let citizen: Citizen = serde_json::from_str(&payload).map_err(|err| {
        RepoError::InvalidData(format!(
            "invalid payload for citizen {citizen_id} in import {import_id}: {err}"
        ))
    })?;

    if citizen.citizen_id != citizen_id {
        return Err(RepoError::InvalidData(format!(
            "payload id {} does not match row id {citizen_id} in import {import_id}",
            citizen.citizen_id
        )));
    }

    Ok(citizen)
}
