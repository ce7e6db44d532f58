//! The single outstanding proposal.
//!
//! A [`StagedChange`] is built in full (rendered and parameter-extracted)
//! before it is installed, so a failed render never leaves a half-formed
//! pending state visible. [`PendingChangeSet`] holds at most one of them;
//! installing a new one replaces the old one ("latest wins").

use serde::{Deserialize, Serialize};

use crate::collaborator::ArtifactRenderer;
use crate::document::{Artifact, Document};
use crate::error::Result;
use crate::parameters::{ParameterChange, ParameterExtractor, ParameterMap};

/// A fully prepared candidate, ready to be staged.
#[derive(Debug, Clone, PartialEq)]
pub struct StagedChange {
    pub candidate_document: Document,
    pub candidate_parameters: ParameterMap,
    /// Absent when preview rendering is disabled.
    pub candidate_artifact: Option<Artifact>,
    pub description: String,
}

impl StagedChange {
    /// Renders and extracts parameters for a candidate document.
    ///
    /// Performs no locking and touches no shared state, so it can run while
    /// other operations proceed.
    ///
    /// # Arguments
    ///
    /// * `candidate` - The proposed document
    /// * `description` - Human-readable summary from the proposer
    /// * `renderer` - Preview renderer, or `None` to skip rendering
    /// * `extractor` - Parameter extractor
    ///
    /// # Errors
    ///
    /// Returns the renderer's error (normally `RenderFailure`) if rendering
    /// fails. Nothing is staged in that case.
    pub async fn prepare(
        candidate: Document,
        description: impl Into<String>,
        renderer: Option<&dyn ArtifactRenderer>,
        extractor: &dyn ParameterExtractor,
    ) -> Result<Self> {
        let candidate_artifact = match renderer {
            Some(renderer) => Some(renderer.render(&candidate).await?),
            None => None,
        };
        let candidate_parameters = extractor.extract(&candidate);

        Ok(Self {
            candidate_document: candidate,
            candidate_parameters,
            candidate_artifact,
            description: description.into(),
        })
    }

    /// Summarizes this change relative to the head parameters.
    pub fn summary(&self, head_parameters: &ParameterMap) -> PendingSummary {
        PendingSummary {
            description: self.description.clone(),
            parameters: self.candidate_parameters.clone(),
            changes: self.candidate_parameters.changes_from(head_parameters),
            artifact_size: self.candidate_artifact.as_ref().map(Artifact::len),
        }
    }
}

/// Display form of the pending proposal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingSummary {
    pub description: String,
    pub parameters: ParameterMap,
    pub changes: Vec<ParameterChange>,
    pub artifact_size: Option<usize>,
}

/// Holds zero or one staged change.
#[derive(Debug, Default)]
pub struct PendingChangeSet {
    staged: Option<StagedChange>,
}

impl PendingChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prepares and installs a candidate in one step.
    ///
    /// On failure the previous pending change (if any) is left untouched.
    /// Callers that hold a lock around the set should call
    /// [`StagedChange::prepare`] unlocked and then [`install`](Self::install),
    /// so rendering never runs under the lock.
    pub async fn stage(
        &mut self,
        candidate: Document,
        description: impl Into<String>,
        renderer: Option<&dyn ArtifactRenderer>,
        extractor: &dyn ParameterExtractor,
    ) -> Result<()> {
        let change = StagedChange::prepare(candidate, description, renderer, extractor).await?;
        self.install(change);
        Ok(())
    }

    /// Installs an already prepared change, replacing any earlier one.
    pub fn install(&mut self, change: StagedChange) {
        if self.staged.is_some() {
            tracing::debug!("[PendingChangeSet] Replacing earlier uncommitted change");
        }
        self.staged = Some(change);
    }

    pub fn peek(&self) -> Option<&StagedChange> {
        self.staged.as_ref()
    }

    /// Discards the staged change, if any.
    pub fn clear(&mut self) {
        self.staged = None;
    }

    pub fn is_empty(&self) -> bool {
        self.staged.is_none()
    }
}
