//! Version history domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::document::Document;
use crate::parameters::ParameterMap;

/// Schema version written into every persisted record.
pub const RECORD_SCHEMA_VERSION: u32 = 1;

/// A committed snapshot of the design.
///
/// Entries are created only by approving a staged change (or by opening a
/// project). Apart from `description`, which may be edited for display, an
/// entry never changes after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionEntry {
    /// Monotonically increasing, starts at 1, never reused.
    pub sequence_number: u64,
    pub timestamp: DateTime<Utc>,
    pub description: String,
    /// Full snapshot of the document, not a diff.
    pub document: Document,
    /// Parameters extracted from `document`, cached for display.
    #[serde(default)]
    pub parameters: ParameterMap,
}

impl VersionEntry {
    /// Returns the lightweight listing form of this entry.
    pub fn to_history_item(&self) -> HistoryItem {
        HistoryItem {
            sequence_number: self.sequence_number,
            timestamp: self.timestamp,
            description: self.description.clone(),
        }
    }
}

/// One row of the version history as shown to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryItem {
    pub sequence_number: u64,
    pub timestamp: DateTime<Utc>,
    pub description: String,
}

/// The durable "current head" of a project.
///
/// Holds the head pointer, the head document content itself, and the
/// highest sequence number ever assigned so that numbers are never reused,
/// even after every entry that carried them has been evicted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeadRecord {
    /// Sequence number of the entry the head document was taken from.
    pub sequence_number: u64,
    /// Highest sequence number ever assigned in this project.
    pub last_sequence_number: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_name: Option<String>,
    pub document: Document,
    pub updated_at: DateTime<Utc>,
}

impl HeadRecord {
    /// Creates a head record pointing at `entry`.
    pub fn at_entry(
        entry: &VersionEntry,
        last_sequence_number: u64,
        project_name: Option<String>,
    ) -> Self {
        Self {
            sequence_number: entry.sequence_number,
            last_sequence_number,
            project_name,
            document: entry.document.clone(),
            updated_at: Utc::now(),
        }
    }
}
