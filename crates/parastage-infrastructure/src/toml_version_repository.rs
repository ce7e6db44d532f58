//! TOML-file-based VersionRepository implementation.

use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parastage_core::{HeadRecord, Result, StagingError, VersionEntry, VersionRepository};

use crate::dto::{HeadRecordDto, VersionEntryRecord};
use crate::paths::ParastagePaths;
use crate::storage::AtomicTomlFile;

/// Version history stored as one TOML file per entry.
///
/// Directory structure:
/// ```text
/// project_dir/
/// ├── head.toml
/// └── versions/
///     ├── v000001.toml
///     └── v000002.toml
/// ```
///
/// All file I/O runs on the blocking thread pool.
#[derive(Debug, Clone)]
pub struct TomlVersionRepository {
    project_dir: PathBuf,
}

impl TomlVersionRepository {
    /// Creates a repository rooted at `project_dir`. Nothing is created on
    /// disk until the first write.
    pub fn new(project_dir: impl Into<PathBuf>) -> Self {
        Self {
            project_dir: project_dir.into(),
        }
    }

    /// Creates the repository for a named project under the data directory.
    pub fn for_project(paths: &ParastagePaths, project_id: &str) -> Result<Self> {
        Ok(Self::new(paths.project_dir(project_id)?))
    }

    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }

    fn versions_dir(&self) -> PathBuf {
        self.project_dir.join("versions")
    }

    fn entry_file(&self, sequence_number: u64) -> AtomicTomlFile<VersionEntryRecord> {
        AtomicTomlFile::new(
            self.versions_dir()
                .join(format!("v{:06}.toml", sequence_number)),
        )
    }

    fn head_file(&self) -> AtomicTomlFile<HeadRecordDto> {
        AtomicTomlFile::new(self.project_dir.join("head.toml"))
    }

    async fn run_blocking<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(TomlVersionRepository) -> Result<T> + Send + 'static,
    {
        let repo = self.clone();
        tokio::task::spawn_blocking(move || f(repo))
            .await
            .map_err(|e| StagingError::internal(format!("Failed to join task: {}", e)))?
    }

    fn load_entries_blocking(&self) -> Result<Vec<VersionEntry>> {
        let dir = self.versions_dir();
        let read_dir = match fs::read_dir(&dir) {
            Ok(read_dir) => read_dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut entries = Vec::new();
        for dir_entry in read_dir {
            let path = dir_entry?.path();
            if !is_entry_file(&path) {
                continue;
            }

            let record = AtomicTomlFile::<VersionEntryRecord>::new(path.clone())
                .load()?
                .ok_or_else(|| {
                    StagingError::persistence(format!("Version record {:?} is empty", path))
                })?;
            entries.push(VersionEntry::try_from(record)?);
        }

        entries.sort_by_key(|e| e.sequence_number);
        tracing::debug!(
            "[TomlVersionRepository] Loaded {} entries from {:?}",
            entries.len(),
            dir
        );
        Ok(entries)
    }

    fn commit_blocking(&self, entry: &VersionEntry, head: &HeadRecord) -> Result<()> {
        let entry_file = self.entry_file(entry.sequence_number);
        entry_file.save(&VersionEntryRecord::from(entry))?;

        if let Err(e) = self.head_file().save(&HeadRecordDto::from(head)) {
            tracing::error!(
                "[TomlVersionRepository] Head write failed for #{}, rolling back entry: {}",
                entry.sequence_number,
                e
            );
            if let Err(cleanup) = entry_file.remove() {
                tracing::warn!(
                    "[TomlVersionRepository] Could not remove uncommitted entry {:?}: {}",
                    entry_file.path(),
                    cleanup
                );
            }
            return Err(e.into());
        }

        Ok(())
    }

    /// Removes the head before the entries, so a partial failure never
    /// leaves a head pointing at deleted entries.
    fn clear_blocking(&self) -> Result<()> {
        self.head_file().remove()?;
        match fs::remove_dir_all(self.versions_dir()) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        Ok(())
    }
}

fn is_entry_file(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    name.starts_with('v') && name.ends_with(".toml")
}

#[async_trait]
impl VersionRepository for TomlVersionRepository {
    async fn load_entries(&self) -> Result<Vec<VersionEntry>> {
        self.run_blocking(|repo| repo.load_entries_blocking()).await
    }

    async fn load_head(&self) -> Result<Option<HeadRecord>> {
        self.run_blocking(|repo| match repo.head_file().load()? {
            Some(dto) => Ok(Some(HeadRecord::try_from(dto)?)),
            None => Ok(None),
        })
        .await
    }

    async fn commit(&self, entry: &VersionEntry, head: &HeadRecord) -> Result<()> {
        let entry = entry.clone();
        let head = head.clone();
        self.run_blocking(move |repo| repo.commit_blocking(&entry, &head))
            .await
    }

    async fn save_entry(&self, entry: &VersionEntry) -> Result<()> {
        let record = VersionEntryRecord::from(entry);
        let sequence_number = entry.sequence_number;
        self.run_blocking(move |repo| {
            repo.entry_file(sequence_number).save(&record)?;
            Ok(())
        })
        .await
    }

    async fn save_head(&self, head: &HeadRecord) -> Result<()> {
        let dto = HeadRecordDto::from(head);
        self.run_blocking(move |repo| {
            repo.head_file().save(&dto)?;
            Ok(())
        })
        .await
    }

    async fn delete_entry(&self, sequence_number: u64) -> Result<()> {
        self.run_blocking(move |repo| {
            repo.entry_file(sequence_number).remove()?;
            Ok(())
        })
        .await
    }

    async fn clear(&self) -> Result<()> {
        self.run_blocking(|repo| repo.clear_blocking()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use parastage_core::{Document, ParameterMap};
    use tempfile::TempDir;

    fn create_test_repository() -> (TomlVersionRepository, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let repo = TomlVersionRepository::new(temp_dir.path().join("project"));
        (repo, temp_dir)
    }

    fn create_test_entry(sequence_number: u64, source: &str) -> VersionEntry {
        let mut parameters = ParameterMap::new();
        parameters.insert("width", sequence_number as f64);
        VersionEntry {
            sequence_number,
            timestamp: Utc::now(),
            description: format!("Version {}", sequence_number),
            document: Document::new(source),
            parameters,
        }
    }

    #[tokio::test]
    async fn test_empty_repository() {
        let (repo, _temp_dir) = create_test_repository();
        assert!(repo.load_entries().await.unwrap().is_empty());
        assert!(repo.load_head().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_commit_and_reload() {
        let (repo, _temp_dir) = create_test_repository();

        for seq in [2, 1, 10] {
            let entry = create_test_entry(seq, &format!("width = {};\n", seq));
            let head = HeadRecord::at_entry(&entry, seq, Some("Wall".to_string()));
            repo.commit(&entry, &head).await.unwrap();
        }

        let entries = repo.load_entries().await.unwrap();
        let numbers: Vec<u64> = entries.iter().map(|e| e.sequence_number).collect();
        assert_eq!(numbers, vec![1, 2, 10]);
        assert_eq!(entries[2].parameters.get("width"), Some(10.0));

        let head = repo.load_head().await.unwrap().unwrap();
        assert_eq!(head.sequence_number, 10);
        assert_eq!(head.document.source(), "width = 10;\n");
        assert_eq!(head.project_name.as_deref(), Some("Wall"));
    }

    #[tokio::test]
    async fn test_save_entry_overwrites_description() {
        let (repo, _temp_dir) = create_test_repository();
        let mut entry = create_test_entry(1, "a = 1;");
        repo.commit(&entry, &HeadRecord::at_entry(&entry, 1, None))
            .await
            .unwrap();

        entry.description = "Renamed".to_string();
        repo.save_entry(&entry).await.unwrap();

        let entries = repo.load_entries().await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].description, "Renamed");
    }

    #[tokio::test]
    async fn test_delete_entry_and_missing_delete() {
        let (repo, _temp_dir) = create_test_repository();
        let entry = create_test_entry(1, "a = 1;");
        repo.commit(&entry, &HeadRecord::at_entry(&entry, 1, None))
            .await
            .unwrap();

        repo.delete_entry(1).await.unwrap();
        assert!(repo.load_entries().await.unwrap().is_empty());
        repo.delete_entry(1).await.unwrap();
    }

    #[tokio::test]
    async fn test_clear_removes_everything() {
        let (repo, _temp_dir) = create_test_repository();
        let entry = create_test_entry(1, "a = 1;");
        repo.commit(&entry, &HeadRecord::at_entry(&entry, 1, None))
            .await
            .unwrap();

        repo.clear().await.unwrap();
        assert!(repo.load_entries().await.unwrap().is_empty());
        assert!(repo.load_head().await.unwrap().is_none());
        // Clearing an empty repository is fine
        repo.clear().await.unwrap();
    }

    #[tokio::test]
    async fn test_corrupt_entry_is_reported() {
        let (repo, _temp_dir) = create_test_repository();
        fs::create_dir_all(repo.versions_dir()).unwrap();
        fs::write(repo.versions_dir().join("v000001.toml"), "sequence_number = \"x\"").unwrap();

        let err = repo.load_entries().await.unwrap_err();
        assert!(err.is_serialization());
    }

    #[tokio::test]
    async fn test_temp_and_foreign_files_are_ignored() {
        let (repo, _temp_dir) = create_test_repository();
        let entry = create_test_entry(1, "a = 1;");
        repo.commit(&entry, &HeadRecord::at_entry(&entry, 1, None))
            .await
            .unwrap();
        fs::write(repo.versions_dir().join(".v000002.toml.tmp"), "garbage").unwrap();
        fs::write(repo.versions_dir().join("notes.txt"), "garbage").unwrap();

        assert_eq!(repo.load_entries().await.unwrap().len(), 1);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failed_head_write_rolls_back_entry() {
        let (repo, _temp_dir) = create_test_repository();
        fs::create_dir_all(repo.project_dir()).unwrap();
        // A directory where head.toml should be makes the rename fail
        fs::create_dir_all(repo.project_dir().join("head.toml/blocker")).unwrap();

        let entry = create_test_entry(1, "a = 1;");
        let err = repo
            .commit(&entry, &HeadRecord::at_entry(&entry, 1, None))
            .await
            .unwrap_err();

        assert!(err.is_persistence());
        assert!(repo.load_entries().await.unwrap().is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failed_clear_keeps_entries() {
        let (repo, _temp_dir) = create_test_repository();
        let entry = create_test_entry(1, "a = 1;");
        repo.commit(&entry, &HeadRecord::at_entry(&entry, 1, None))
            .await
            .unwrap();
        // A directory at head.toml cannot be removed as a file
        fs::remove_file(repo.project_dir().join("head.toml")).unwrap();
        fs::create_dir_all(repo.project_dir().join("head.toml/blocker")).unwrap();

        assert!(repo.clear().await.is_err());
        assert_eq!(repo.load_entries().await.unwrap().len(), 1);
    }
}
