//! In-memory doubles shared by the unit tests of this crate.

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parastage_core::{HeadRecord, Result, StagingError, VersionEntry, VersionRepository};

#[derive(Default)]
struct Stored {
    entries: BTreeMap<u64, VersionEntry>,
    head: Option<HeadRecord>,
}

/// Repository that keeps records in memory and can be told to fail.
#[derive(Default)]
pub struct InMemoryVersionRepository {
    stored: Mutex<Stored>,
    fail_writes: AtomicBool,
    fail_deletes: AtomicBool,
}

impl InMemoryVersionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    /// Stores an entry directly, bypassing the write-failure switch.
    pub fn seed_entry(&self, entry: VersionEntry) {
        self.stored
            .lock()
            .unwrap()
            .entries
            .insert(entry.sequence_number, entry);
    }

    pub fn seed_head(&self, head: HeadRecord) {
        self.stored.lock().unwrap().head = Some(head);
    }

    pub fn stored_sequence_numbers(&self) -> Vec<u64> {
        self.stored.lock().unwrap().entries.keys().copied().collect()
    }

    pub fn stored_head(&self) -> Option<HeadRecord> {
        self.stored.lock().unwrap().head.clone()
    }

    fn check_writable(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StagingError::persistence("disk full"));
        }
        Ok(())
    }
}

#[async_trait]
impl VersionRepository for InMemoryVersionRepository {
    async fn load_entries(&self) -> Result<Vec<VersionEntry>> {
        Ok(self.stored.lock().unwrap().entries.values().cloned().collect())
    }

    async fn load_head(&self) -> Result<Option<HeadRecord>> {
        Ok(self.stored_head())
    }

    async fn commit(&self, entry: &VersionEntry, head: &HeadRecord) -> Result<()> {
        self.check_writable()?;
        let mut stored = self.stored.lock().unwrap();
        stored.entries.insert(entry.sequence_number, entry.clone());
        stored.head = Some(head.clone());
        Ok(())
    }

    async fn save_entry(&self, entry: &VersionEntry) -> Result<()> {
        self.check_writable()?;
        self.seed_entry(entry.clone());
        Ok(())
    }

    async fn save_head(&self, head: &HeadRecord) -> Result<()> {
        self.check_writable()?;
        self.seed_head(head.clone());
        Ok(())
    }

    async fn delete_entry(&self, sequence_number: u64) -> Result<()> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(StagingError::persistence("permission denied"));
        }
        self.stored
            .lock()
            .unwrap()
            .entries
            .remove(&sequence_number);
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.check_writable()?;
        let mut stored = self.stored.lock().unwrap();
        stored.entries.clear();
        stored.head = None;
        Ok(())
    }
}
