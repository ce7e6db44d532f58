//! Version history domain: committed snapshots and their persistence contract.

pub mod model;
pub mod repository;

pub use model::{HeadRecord, HistoryItem, RECORD_SCHEMA_VERSION, VersionEntry};
pub use repository::VersionRepository;
