//! Error types for the Parastage staging engine.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A shared error type for the staging engine.
///
/// Every failure of a staging operation is returned to the caller as one of
/// these variants. None of them is retried by the engine itself; retry policy
/// belongs to the caller (e.g. re-issuing `propose` after a `StaleBase`).
///
/// A clarification request from the proposer is not an error and is modelled
/// as a `ProposalResult` variant instead.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StagingError {
    /// The candidate document could not be rendered to a preview artifact.
    #[error("Render failure: {message}")]
    RenderFailure { message: String },

    /// The head document moved while a proposal was being computed.
    #[error("Stale base: proposal was computed against version {expected:?}, head is now {actual:?}")]
    StaleBase {
        expected: Option<u64>,
        actual: Option<u64>,
    },

    /// Approve was requested while nothing is staged.
    #[error("Nothing pending: there is no staged change to approve")]
    NothingPending,

    /// No version with the given sequence number is held by the store.
    #[error("Version not found: #{sequence_number}")]
    VersionNotFound { sequence_number: u64 },

    /// A durable write or read failed.
    #[error("Persistence failure: {message}")]
    Persistence { message: String },

    /// No project has been opened yet, so there is no head document.
    #[error("No project is open")]
    NoProject,

    /// The change proposer failed to produce an answer.
    #[error("Proposer error: {0}")]
    Proposer(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization {
        format: String, // "TOML", "JSON"
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl StagingError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    /// Creates a RenderFailure error
    pub fn render(message: impl Into<String>) -> Self {
        Self::RenderFailure {
            message: message.into(),
        }
    }

    /// Creates a Persistence error
    pub fn persistence(message: impl Into<String>) -> Self {
        Self::Persistence {
            message: message.into(),
        }
    }

    /// Creates a VersionNotFound error
    pub fn version_not_found(sequence_number: u64) -> Self {
        Self::VersionNotFound { sequence_number }
    }

    /// Creates a Proposer error
    pub fn proposer(message: impl Into<String>) -> Self {
        Self::Proposer(message.into())
    }

    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    // ============================================================================
    // Type checking methods
    // ============================================================================

    /// Check if this is a VersionNotFound error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::VersionNotFound { .. })
    }

    /// Check if this is a persistence error
    pub fn is_persistence(&self) -> bool {
        matches!(self, Self::Persistence { .. })
    }

    /// Check if this is a render failure
    pub fn is_render_failure(&self) -> bool {
        matches!(self, Self::RenderFailure { .. })
    }

    /// Check if this is a stale-base rejection
    pub fn is_stale_base(&self) -> bool {
        matches!(self, Self::StaleBase { .. })
    }

    /// Check if this is a serialization error
    pub fn is_serialization(&self) -> bool {
        matches!(self, Self::Serialization { .. })
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for StagingError {
    fn from(err: std::io::Error) -> Self {
        Self::Persistence {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for StagingError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for StagingError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::ser::Error> for StagingError {
    fn from(err: toml::ser::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

/// A type alias for `Result<T, StagingError>`.
pub type Result<T> = std::result::Result<T, StagingError>;
