//! Configuration service implementation.
//!
//! This module provides a ConfigService that loads the staging configuration
//! from the configuration file (~/.config/parastage/config.toml).

use std::sync::{Arc, RwLock};

use parastage_core::{Result, StagingConfig, StagingError};

use crate::paths::ParastagePaths;
use crate::storage::AtomicTomlFile;

/// Configuration service that loads and caches the staging configuration.
///
/// The file is created with defaults on first access, so users always have
/// a config.toml to edit.
#[derive(Debug, Clone)]
pub struct ConfigService {
    paths: ParastagePaths,
    /// Cached configuration loaded from file.
    config: Arc<RwLock<Option<StagingConfig>>>,
}

impl ConfigService {
    pub fn new(paths: ParastagePaths) -> Self {
        Self {
            paths,
            config: Arc::new(RwLock::new(None)),
        }
    }

    /// Gets the configuration, loading from file if not cached.
    ///
    /// # Errors
    ///
    /// Returns `StagingError::Serialization` for an unparsable file and
    /// `StagingError::Config` for values that fail validation.
    pub fn get_config(&self) -> Result<StagingConfig> {
        {
            let read_lock = self.config.read().map_err(poisoned)?;
            if let Some(ref cached) = *read_lock {
                return Ok(cached.clone());
            }
        }

        let loaded = self.load_config()?;

        let mut write_lock = self.config.write().map_err(poisoned)?;
        *write_lock = Some(loaded.clone());
        Ok(loaded)
    }

    /// Invalidates the cache, forcing a reload on next access.
    pub fn invalidate_cache(&self) -> Result<()> {
        let mut write_lock = self.config.write().map_err(poisoned)?;
        *write_lock = None;
        Ok(())
    }

    /// Returns the paths with the configured `data_dir` override applied.
    pub fn effective_paths(&self) -> Result<ParastagePaths> {
        let config = self.get_config()?;
        Ok(match config.data_dir {
            Some(data_dir) => self.paths.clone().with_data_dir(data_dir),
            None => self.paths.clone(),
        })
    }

    fn load_config(&self) -> Result<StagingConfig> {
        let path = self.paths.config_file();
        let file = AtomicTomlFile::<StagingConfig>::new(path.clone());

        let config = match file.load()? {
            Some(config) => config,
            None => {
                tracing::info!("[ConfigService] Creating default config at {:?}", path);
                file.update(StagingConfig::default(), |_| Ok(()))?
            }
        };

        config.validate()?;
        tracing::debug!("[ConfigService] Loaded config from {:?}", path);
        Ok(config)
    }
}

fn poisoned<T>(_: T) -> StagingError {
    StagingError::internal("Config cache lock poisoned")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn create_service() -> (ConfigService, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let paths = ParastagePaths::new(Some(temp_dir.path())).unwrap();
        (ConfigService::new(paths), temp_dir)
    }

    #[test]
    fn test_creates_default_config_when_missing() {
        let (service, temp_dir) = create_service();

        let config = service.get_config().unwrap();
        assert_eq!(config, StagingConfig::default());
        assert!(temp_dir.path().join("config.toml").exists());
    }

    #[test]
    fn test_reads_existing_config_and_caches_it() {
        let (service, temp_dir) = create_service();
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "max_entries = 7\nrender_previews = false\n").unwrap();

        let config = service.get_config().unwrap();
        assert_eq!(config.max_entries, 7);
        assert!(!config.render_previews);

        // Cached until invalidated
        fs::write(&path, "max_entries = 9\n").unwrap();
        assert_eq!(service.get_config().unwrap().max_entries, 7);
        service.invalidate_cache().unwrap();
        assert_eq!(service.get_config().unwrap().max_entries, 9);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let (service, temp_dir) = create_service();
        fs::write(temp_dir.path().join("config.toml"), "max_entries = 0\n").unwrap();

        assert!(matches!(
            service.get_config(),
            Err(StagingError::Config(_))
        ));
    }

    #[test]
    fn test_data_dir_override() {
        let (service, temp_dir) = create_service();
        let data = temp_dir.path().join("data");
        fs::write(
            temp_dir.path().join("config.toml"),
            format!("data_dir = {:?}\n", data.to_string_lossy()),
        )
        .unwrap();

        let paths = service.effective_paths().unwrap();
        assert_eq!(paths.projects_dir(), data.join("projects"));
    }
}
