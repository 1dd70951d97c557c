//! Test module for determinism and integration tests.
//!
//! - **Determinism tests**: the same seed and input script yield identical snapshots
//! - **Integration tests**: the full tick pipeline, from driver input to snapshot
//! - **Helper functions**: world and scenario factories
//!
//! # Test Structure
//!
//! - `determinism.rs`: Tests that verify deterministic execution
//! - `integration.rs`: End-to-end tests of the simulation
//! - `helpers.rs`: Test setup utilities and factory functions

mod helpers;

// Re-export for convenience
pub use helpers::*;
