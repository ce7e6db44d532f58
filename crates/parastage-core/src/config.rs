//! Staging engine configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{Result, StagingError};

/// Default bound on the number of retained versions.
pub const DEFAULT_MAX_ENTRIES: usize = 50;

/// Root configuration, stored as `config.toml`.
///
/// Every field has a default so a partial (or empty) file is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StagingConfig {
    /// Maximum number of versions kept; the oldest is evicted beyond this.
    pub max_entries: usize,
    /// Shorten proposer descriptions before they enter the history.
    pub clean_descriptions: bool,
    /// Render a preview artifact for every staged proposal.
    pub render_previews: bool,
    /// Overrides the platform data directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
    pub renderer: RendererConfig,
}

impl Default for StagingConfig {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_MAX_ENTRIES,
            clean_descriptions: true,
            render_previews: true,
            data_dir: None,
            renderer: RendererConfig::default(),
        }
    }
}

impl StagingConfig {
    /// Checks value ranges that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.max_entries == 0 {
            return Err(StagingError::config("max_entries must be at least 1"));
        }
        if self.renderer.timeout_secs == 0 {
            return Err(StagingError::config("renderer.timeout_secs must be at least 1"));
        }
        if self.renderer.command.trim().is_empty() {
            return Err(StagingError::config("renderer.command must not be empty"));
        }
        Ok(())
    }
}

/// Settings of the external preview renderer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Executable invoked as `<command> [args..] -o <out.stl> <in.scad>`.
    pub command: String,
    /// Extra leading arguments, placed before `-o`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    pub timeout_secs: u64,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            command: "openscad".to_string(),
            args: Vec::new(),
            timeout_secs: 30,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = StagingConfig::default();
        assert_eq!(config.max_entries, 50);
        assert!(config.clean_descriptions);
        assert!(config.render_previews);
        assert_eq!(config.renderer.command, "openscad");
        assert_eq!(config.renderer.timeout_secs, 30);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: StagingConfig = toml::from_str("max_entries = 5\n[renderer]\ntimeout_secs = 10\n").unwrap();
        assert_eq!(config.max_entries, 5);
        assert_eq!(config.renderer.timeout_secs, 10);
        assert_eq!(config.renderer.command, "openscad");
        assert!(config.render_previews);
    }

    #[test]
    fn test_zero_bound_is_rejected() {
        let config = StagingConfig {
            max_entries: 0,
            ..StagingConfig::default()
        };
        assert!(matches!(config.validate(), Err(StagingError::Config(_))));
    }
}
