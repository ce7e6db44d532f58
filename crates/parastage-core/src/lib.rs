//! Domain layer of the Parastage staging engine.
//!
//! Contains the document and version models, the collaborator and repository
//! traits, the history cursor and the pending change set. Nothing in this
//! crate performs I/O on its own.

pub mod collaborator;
pub mod config;
pub mod description;
pub mod document;
pub mod error;
pub mod history;
pub mod outcome;
pub mod parameters;
pub mod pending;
pub mod version;

pub use collaborator::{ArtifactRenderer, CandidateResult, ChangeProposer};
pub use config::{RendererConfig, StagingConfig};
pub use document::{Artifact, Document};
pub use error::{Result, StagingError};
pub use history::HistoryNavigator;
pub use outcome::{CommitResult, CurrentState, NavigationResult, ProposalResult, RestoreResult};
pub use parameters::{ParameterChange, ParameterExtractor, ParameterMap, RegexParameterExtractor};
pub use pending::{PendingChangeSet, PendingSummary, StagedChange};
pub use version::{HeadRecord, HistoryItem, VersionEntry, VersionRepository};
