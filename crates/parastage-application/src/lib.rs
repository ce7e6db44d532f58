//! Application layer of the Parastage staging engine.
//!
//! [`StagingOrchestrator`] is the entry point callers use; it owns one
//! project's [`VersionStore`], history cursor and pending change.

pub mod orchestrator;
pub mod version_store;

#[cfg(test)]
mod test_support;

pub use crate::orchestrator::{INITIAL_DESCRIPTION, StagingOrchestrator};
pub use crate::version_store::VersionStore;
