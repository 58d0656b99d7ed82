//! Typed domain model for citizen import batches.
//!
//! # Responsibility
//! - Define canonical data structures used by core business logic.
//! - Replace loosely-typed citizen maps with explicit batch/citizen types.
//!
//! # Invariants
//! - Citizen ids are unique inside one `ImportBatch`.
//! - The relatives relation is symmetric inside one `ImportBatch`.

pub mod citizen;
