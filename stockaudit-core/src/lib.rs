// stockaudit-core/src/lib.rs

// 1. Mandatory documentation for production code
#![allow(missing_docs)] // On autorise le manque de doc pour le moment

// 2. Memory safety
#![deny(unsafe_code)]
// 3. Robustness
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
// 4. Performance
#![warn(clippy::perf)]

// --- MODULES HEXAGONAUX ---

// 1. Ports (Interfaces / Traits)
// Contracts the engine consumes: repositories and the validation logger sink.
pub mod ports;

// 2. Domain (Cœur du métier)
// Entities, validation config, reports and the pure aggregation logic.
// Ne dépend de RIEN d'autre (ni infra, ni app).
pub mod domain;

// 3. Infrastructure (Adapters)
// DuckDB / in-memory stores, tracing logger, YAML config, report writer.
pub mod infrastructure;

// 4. Application (Use Cases)
// Detectors, repair engine and the integrity validation service.
pub mod application;

// --- GESTION DES ERREURS GLOBALE ---
pub mod error;

#[cfg(test)]
pub(crate) mod test_support;

// --- RE-EXPORTS (FACADE) ---
// use stockaudit_core::{AuditError, IntegrityValidationService};
pub use application::IntegrityValidationService;
pub use error::AuditError;
