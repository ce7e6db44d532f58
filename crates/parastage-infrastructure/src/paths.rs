//! Unified path management for parastage files.
//!
//! This ensures consistency across all platforms (Linux, macOS, Windows).

use std::path::{Path, PathBuf};

use parastage_core::StagingError;

/// Errors that can occur during path resolution.
#[derive(Debug)]
pub enum PathError {
    /// Platform config/data directory could not be determined.
    HomeDirNotFound,
    /// Project ids are used as directory names and must be plain words.
    InvalidProjectId(String),
}

impl std::fmt::Display for PathError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathError::HomeDirNotFound => write!(f, "Cannot find home directory"),
            PathError::InvalidProjectId(id) => write!(
                f,
                "Invalid project id '{}': use letters, digits, '-' or '_'",
                id
            ),
        }
    }
}

impl std::error::Error for PathError {}

impl From<PathError> for StagingError {
    fn from(err: PathError) -> Self {
        StagingError::config(err.to_string())
    }
}

/// Unified path management for parastage.
///
/// # Directory Structure
///
/// ```text
/// ~/.config/parastage/          # Config directory
/// └── config.toml               # StagingConfig
///
/// ~/.local/share/parastage/     # Data directory
/// ├── logs/                     # Application logs
/// │   └── parastage.log.YYYY-MM-DD
/// └── projects/
///     └── <project_id>/
///         ├── head.toml         # Head pointer + head document
///         └── versions/
///             ├── v000001.toml
///             └── v000002.toml
/// ```
///
/// With a base directory (tests, `data_dir` override) both trees live under
/// that directory.
#[derive(Debug, Clone)]
pub struct ParastagePaths {
    config_dir: PathBuf,
    data_dir: PathBuf,
}

impl ParastagePaths {
    const APP_DIR: &'static str = "parastage";

    /// Resolves the directories.
    ///
    /// # Arguments
    ///
    /// * `base_dir` - Root for both config and data; `None` uses the
    ///   platform directories
    pub fn new(base_dir: Option<&Path>) -> Result<Self, PathError> {
        match base_dir {
            Some(base) => Ok(Self {
                config_dir: base.to_path_buf(),
                data_dir: base.to_path_buf(),
            }),
            None => {
                let config_dir = dirs::config_dir().ok_or(PathError::HomeDirNotFound)?;
                let data_dir = dirs::data_dir().ok_or(PathError::HomeDirNotFound)?;
                Ok(Self {
                    config_dir: config_dir.join(Self::APP_DIR),
                    data_dir: data_dir.join(Self::APP_DIR),
                })
            }
        }
    }

    /// Returns a copy whose data directory is replaced (config stays put).
    pub fn with_data_dir(mut self, data_dir: PathBuf) -> Self {
        self.data_dir = data_dir;
        self
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join("config.toml")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.data_dir.join("logs")
    }

    pub fn projects_dir(&self) -> PathBuf {
        self.data_dir.join("projects")
    }

    /// Returns the directory holding one project's history.
    pub fn project_dir(&self, project_id: &str) -> Result<PathBuf, PathError> {
        let valid = !project_id.is_empty()
            && project_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(PathError::InvalidProjectId(project_id.to_string()));
        }
        Ok(self.projects_dir().join(project_id))
    }
}
