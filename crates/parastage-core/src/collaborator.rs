//! Interfaces of the external collaborators the staging engine consumes.
//!
//! The engine keeps no state inside these collaborators; they are treated as
//! (possibly slow, possibly failing) functions.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::document::{Artifact, Document};
use crate::error::Result;
use crate::parameters::ParameterMap;

/// Answer of a [`ChangeProposer`] to one instruction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum CandidateResult {
    /// A complete rewritten document.
    Candidate {
        document: Document,
        description: String,
    },
    /// Only numeric parameter values change; applied to the document the
    /// proposal was made against.
    ParameterEdits {
        edits: ParameterMap,
        description: String,
    },
    /// The instruction was ambiguous.
    Clarification {
        question: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        understood: Option<String>,
    },
    /// The proposer declined to modify anything.
    NoChange,
}

/// Turns a natural-language instruction into a candidate document.
#[async_trait]
pub trait ChangeProposer: Send + Sync {
    /// Proposes a change to `document`.
    ///
    /// # Returns
    ///
    /// - `Ok(CandidateResult)`: The proposer's answer
    /// - `Err(StagingError::Proposer)`: The proposer could not be reached or
    ///   returned garbage
    async fn propose(&self, document: &Document, instruction: &str) -> Result<CandidateResult>;
}

/// Renders a document into a preview artifact.
#[async_trait]
pub trait ArtifactRenderer: Send + Sync {
    /// Renders `document`.
    ///
    /// # Returns
    ///
    /// - `Ok(Artifact)`: Rendered bytes
    /// - `Err(StagingError::RenderFailure)`: The document could not be rendered
    async fn render(&self, document: &Document) -> Result<Artifact>;
}
