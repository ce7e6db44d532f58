//! Result values returned by the staging orchestrator.

use serde::{Deserialize, Serialize};

use crate::document::Document;
use crate::parameters::ParameterMap;
use crate::pending::PendingSummary;
use crate::version::VersionEntry;

/// Outcome of a `propose` call that did not fail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum ProposalResult {
    /// The candidate is now the pending change.
    Staged(PendingSummary),
    /// The proposer needs more information; nothing changed.
    ClarificationNeeded {
        question: String,
        understood: Option<String>,
    },
    /// The proposer declined, or its candidate equals the head; nothing changed.
    NoChange,
}

/// Outcome of a successful approve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitResult {
    pub entry: VersionEntry,
    /// Sequence number evicted to keep the history within bounds, if any.
    pub evicted: Option<u64>,
}

/// Outcome of a successful restore.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreResult {
    pub sequence_number: u64,
    pub parameters: ParameterMap,
    /// Whether a pending proposal was abandoned by the restore.
    pub discarded_pending: bool,
}

/// Outcome of undo, redo and jump.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationResult {
    /// `false` when the move was out of range and nothing happened.
    pub moved: bool,
    /// Head sequence number after the call.
    pub sequence_number: Option<u64>,
}

/// Snapshot of what the caller should display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentState {
    pub project_name: Option<String>,
    pub head_sequence_number: Option<u64>,
    pub head_document: Option<Document>,
    pub head_parameters: ParameterMap,
    pub pending: Option<PendingSummary>,
    pub can_undo: bool,
    pub can_redo: bool,
}
