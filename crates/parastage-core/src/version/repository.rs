//! Version repository trait.

use async_trait::async_trait;

use crate::error::Result;
use crate::version::model::{HeadRecord, VersionEntry};

/// An abstract repository for durable version history.
///
/// This trait defines the contract for persisting committed snapshots and the
/// head pointer of a single project, decoupling the version store from the
/// storage mechanism (e.g., TOML files, database).
///
/// # Implementation Notes
///
/// Every method is write-through: when it returns `Ok`, the data must be on
/// durable storage. A method that cannot guarantee this must return an error.
#[async_trait]
pub trait VersionRepository: Send + Sync {
    /// Loads every stored entry, ordered by sequence number ascending.
    async fn load_entries(&self) -> Result<Vec<VersionEntry>>;

    /// Loads the head record.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(HeadRecord))`: A project has been committed
    /// - `Ok(None)`: Nothing has been committed yet
    /// - `Err(_)`: The record exists but could not be read
    async fn load_head(&self) -> Result<Option<HeadRecord>>;

    /// Durably records a new entry and moves the head to it.
    ///
    /// Either both records are stored, or the call fails and no new entry is
    /// visible to a later `load_entries`.
    async fn commit(&self, entry: &VersionEntry, head: &HeadRecord) -> Result<()>;

    /// Overwrites an existing entry (used for description edits).
    async fn save_entry(&self, entry: &VersionEntry) -> Result<()>;

    /// Durably replaces the head record without adding an entry.
    async fn save_head(&self, head: &HeadRecord) -> Result<()>;

    /// Removes an entry. Removing a missing entry is not an error.
    async fn delete_entry(&self, sequence_number: u64) -> Result<()>;

    /// Removes every entry and the head record.
    async fn clear(&self) -> Result<()>;
}
