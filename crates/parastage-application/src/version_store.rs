//! Bounded, append-only version history.
//!
//! `VersionStore` keeps the committed entries in memory, ordered by sequence
//! number, and writes every mutation through to a [`VersionRepository`]
//! before changing its in-memory view. A failed write therefore leaves the
//! store exactly as it was.

use std::sync::Arc;

use chrono::Utc;
use parastage_core::{
    CommitResult, Document, HeadRecord, HistoryItem, ParameterMap, Result, StagingError,
    VersionEntry, VersionRepository,
};

pub struct VersionStore {
    repository: Arc<dyn VersionRepository>,
    /// Committed entries, oldest first.
    entries: Vec<VersionEntry>,
    max_entries: usize,
    /// Highest sequence number ever assigned; survives eviction.
    last_sequence_number: u64,
    /// Durable head pointer plus head document.
    head: Option<HeadRecord>,
    /// Name to use for the next head record while no head exists yet.
    project_name: Option<String>,
}

impl VersionStore {
    /// Loads the history held by `repository`.
    ///
    /// # Arguments
    ///
    /// * `repository` - Durable backing store
    /// * `max_entries` - Upper bound on retained entries (at least 1)
    ///
    /// # Returns
    ///
    /// The store with the persisted head. If the stored history is longer
    /// than `max_entries` (for example after an eviction whose delete
    /// failed), the oldest extra entries are dropped. If the head points at
    /// an entry that no longer exists, the head falls back to the newest
    /// entry.
    pub async fn open(repository: Arc<dyn VersionRepository>, max_entries: usize) -> Result<Self> {
        if max_entries == 0 {
            return Err(StagingError::config("max_entries must be at least 1"));
        }

        let mut entries = repository.load_entries().await?;
        entries.sort_by_key(|e| e.sequence_number);
        let mut head = repository.load_head().await?;

        if entries.len() > max_entries {
            let excess = entries.len() - max_entries;
            tracing::warn!(
                "[VersionStore] History holds {} entries, bound is {}; trimming {} oldest",
                entries.len(),
                max_entries,
                excess
            );
            for stale in entries.drain(..excess) {
                if let Err(e) = repository.delete_entry(stale.sequence_number).await {
                    tracing::warn!(
                        "[VersionStore] Failed to delete trimmed entry #{}: {}",
                        stale.sequence_number,
                        e
                    );
                }
            }
        }

        let newest = entries.last().map(|e| e.sequence_number).unwrap_or(0);
        let last_sequence_number = head
            .as_ref()
            .map(|h| h.last_sequence_number)
            .unwrap_or(0)
            .max(newest);
        let project_name = head.as_ref().and_then(|h| h.project_name.clone());

        let head_is_valid = head
            .as_ref()
            .is_some_and(|h| entries.iter().any(|e| e.sequence_number == h.sequence_number));
        if !head_is_valid {
            if head.is_some() {
                tracing::warn!("[VersionStore] Head points at a missing entry; using newest");
            }
            head = entries.last().map(|newest| {
                HeadRecord::at_entry(newest, last_sequence_number, project_name.clone())
            });
        }

        tracing::debug!(
            "[VersionStore] Opened with {} entries, head {:?}, last sequence number {}",
            entries.len(),
            head.as_ref().map(|h| h.sequence_number),
            last_sequence_number
        );

        Ok(Self {
            repository,
            entries,
            max_entries,
            last_sequence_number,
            head,
            project_name,
        })
    }

    /// Appends a new entry and makes it the head.
    ///
    /// The entry and the head record are committed durably before the
    /// in-memory view changes. When the bound is exceeded afterwards, the
    /// oldest entry is evicted; the new entry is never the one evicted.
    ///
    /// # Errors
    ///
    /// Returns the repository's error (normally `StagingError::Persistence`)
    /// if the commit could not be recorded. Nothing changes in that case.
    pub async fn append(
        &mut self,
        document: Document,
        description: String,
        parameters: ParameterMap,
    ) -> Result<CommitResult> {
        let sequence_number = self.last_sequence_number + 1;
        let entry = VersionEntry {
            sequence_number,
            timestamp: Utc::now(),
            description,
            document,
            parameters,
        };
        let head = HeadRecord::at_entry(&entry, sequence_number, self.project_name.clone());

        if let Err(e) = self.repository.commit(&entry, &head).await {
            tracing::error!(
                "[VersionStore] Failed to commit entry #{}: {}",
                sequence_number,
                e
            );
            return Err(e);
        }

        self.entries.push(entry.clone());
        self.last_sequence_number = sequence_number;
        self.head = Some(head);
        tracing::info!(
            "[VersionStore] Committed entry #{} ({})",
            sequence_number,
            entry.description
        );

        let evicted = self.evict_overflow().await;
        Ok(CommitResult { entry, evicted })
    }

    async fn evict_overflow(&mut self) -> Option<u64> {
        if self.entries.len() <= self.max_entries {
            return None;
        }

        let oldest = self.entries.remove(0);
        tracing::info!("[VersionStore] Evicted entry #{}", oldest.sequence_number);
        if let Err(e) = self.repository.delete_entry(oldest.sequence_number).await {
            tracing::warn!(
                "[VersionStore] Failed to delete evicted entry #{}: {}",
                oldest.sequence_number,
                e
            );
        }
        Some(oldest.sequence_number)
    }

    pub fn get(&self, sequence_number: u64) -> Result<&VersionEntry> {
        self.position(sequence_number)
            .map(|i| &self.entries[i])
            .ok_or_else(|| StagingError::version_not_found(sequence_number))
    }

    /// Returns the index of an entry in [`Self::all`].
    pub fn position(&self, sequence_number: u64) -> Option<usize> {
        self.entries
            .binary_search_by_key(&sequence_number, |e| e.sequence_number)
            .ok()
    }

    pub fn entry_at(&self, index: usize) -> Option<&VersionEntry> {
        self.entries.get(index)
    }

    /// Replaces the description of an entry. Document and sequence number
    /// stay as they are.
    pub async fn update_description(&mut self, sequence_number: u64, text: &str) -> Result<()> {
        let index = self
            .position(sequence_number)
            .ok_or_else(|| StagingError::version_not_found(sequence_number))?;

        let mut updated = self.entries[index].clone();
        updated.description = text.to_string();
        self.repository.save_entry(&updated).await?;

        self.entries[index] = updated;
        tracing::debug!(
            "[VersionStore] Updated description of entry #{}",
            sequence_number
        );
        Ok(())
    }

    /// Durably points the head at an existing entry.
    ///
    /// # Errors
    ///
    /// - `StagingError::VersionNotFound` if no such entry is retained
    /// - The repository's error if the head record could not be written
    pub async fn move_head(&mut self, sequence_number: u64) -> Result<&VersionEntry> {
        let index = self
            .position(sequence_number)
            .ok_or_else(|| StagingError::version_not_found(sequence_number))?;

        let head = HeadRecord::at_entry(
            &self.entries[index],
            self.last_sequence_number,
            self.project_name.clone(),
        );
        if let Err(e) = self.repository.save_head(&head).await {
            tracing::error!(
                "[VersionStore] Failed to move head to #{}: {}",
                sequence_number,
                e
            );
            return Err(e);
        }

        self.head = Some(head);
        tracing::info!("[VersionStore] Head moved to #{}", sequence_number);
        Ok(&self.entries[index])
    }

    /// Deletes all history. Sequence numbering starts over at 1.
    pub async fn reset(&mut self, project_name: Option<String>) -> Result<()> {
        self.repository.clear().await?;

        self.entries.clear();
        self.last_sequence_number = 0;
        self.head = None;
        self.project_name = project_name;
        tracing::info!("[VersionStore] History cleared");
        Ok(())
    }

    /// Renames the project, durably if a head record exists.
    pub async fn set_project_name(&mut self, name: Option<String>) -> Result<()> {
        if let Some(head) = &self.head {
            let mut renamed = head.clone();
            renamed.project_name = name.clone();
            self.repository.save_head(&renamed).await?;
            self.head = Some(renamed);
        }
        self.project_name = name;
        Ok(())
    }

    /// All retained entries, oldest first.
    pub fn all(&self) -> &[VersionEntry] {
        &self.entries
    }

    pub fn history(&self) -> Vec<HistoryItem> {
        self.entries.iter().map(VersionEntry::to_history_item).collect()
    }

    pub fn head(&self) -> Option<&HeadRecord> {
        self.head.as_ref()
    }

    pub fn project_name(&self) -> Option<&str> {
        self.project_name.as_deref()
    }

    pub fn last_sequence_number(&self) -> u64 {
        self.last_sequence_number
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
