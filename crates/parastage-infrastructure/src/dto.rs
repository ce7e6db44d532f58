//! Persisted record formats.
//!
//! Domain models stay free of storage concerns; these DTOs carry the schema
//! version and the on-disk field names.

use chrono::{DateTime, Utc};
use parastage_core::version::RECORD_SCHEMA_VERSION;
use parastage_core::{Document, HeadRecord, ParameterMap, StagingError, VersionEntry};
use serde::{Deserialize, Serialize};

/// On-disk form of a [`VersionEntry`] (`versions/vNNNNNN.toml`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionEntryRecord {
    pub schema_version: u32,
    pub sequence_number: u64,
    pub timestamp: DateTime<Utc>,
    pub description: String,
    pub document: String,
    #[serde(default)]
    pub parameters: ParameterMap,
}

impl From<&VersionEntry> for VersionEntryRecord {
    fn from(entry: &VersionEntry) -> Self {
        Self {
            schema_version: RECORD_SCHEMA_VERSION,
            sequence_number: entry.sequence_number,
            timestamp: entry.timestamp,
            description: entry.description.clone(),
            document: entry.document.source().to_string(),
            parameters: entry.parameters.clone(),
        }
    }
}

impl TryFrom<VersionEntryRecord> for VersionEntry {
    type Error = StagingError;

    fn try_from(record: VersionEntryRecord) -> Result<Self, Self::Error> {
        check_schema(record.schema_version, "version entry")?;
        Ok(VersionEntry {
            sequence_number: record.sequence_number,
            timestamp: record.timestamp,
            description: record.description,
            document: Document::new(record.document),
            parameters: record.parameters,
        })
    }
}

/// On-disk form of a [`HeadRecord`] (`head.toml`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeadRecordDto {
    pub schema_version: u32,
    pub sequence_number: u64,
    pub last_sequence_number: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_name: Option<String>,
    pub updated_at: DateTime<Utc>,
    pub document: String,
}

impl From<&HeadRecord> for HeadRecordDto {
    fn from(head: &HeadRecord) -> Self {
        Self {
            schema_version: RECORD_SCHEMA_VERSION,
            sequence_number: head.sequence_number,
            last_sequence_number: head.last_sequence_number,
            project_name: head.project_name.clone(),
            updated_at: head.updated_at,
            document: head.document.source().to_string(),
        }
    }
}

impl TryFrom<HeadRecordDto> for HeadRecord {
    type Error = StagingError;

    fn try_from(dto: HeadRecordDto) -> Result<Self, Self::Error> {
        check_schema(dto.schema_version, "head record")?;
        Ok(HeadRecord {
            sequence_number: dto.sequence_number,
            last_sequence_number: dto.last_sequence_number,
            project_name: dto.project_name,
            document: Document::new(dto.document),
            updated_at: dto.updated_at,
        })
    }
}

fn check_schema(found: u32, what: &str) -> Result<(), StagingError> {
    if found == 0 || found > RECORD_SCHEMA_VERSION {
        return Err(StagingError::Serialization {
            format: "TOML".to_string(),
            message: format!(
                "Unsupported {} schema version {} (supported: 1..={})",
                what, found, RECORD_SCHEMA_VERSION
            ),
        });
    }
    Ok(())
}
