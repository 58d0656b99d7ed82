//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the record-store contract for import batches.
//! - Isolate SQLite query details from the consistency engine.
//!
//! # Invariants
//! - Every write is one SQLite transaction; partial writes are never visible.
//! - Repository APIs return semantic errors (`NotFound`, `Unsupported`) in
//!   addition to DB transport errors.

pub mod import_repo;
