//! Core use-case services.
//!
//! # Responsibility
//! - Enforce batch-wide invariants above the repository layer.
//! - Keep outer callers decoupled from storage and schema details.

pub mod consistency;
pub mod import_service;
