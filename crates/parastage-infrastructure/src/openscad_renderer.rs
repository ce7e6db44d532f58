//! OpenSCAD-backed artifact renderer.
//!
//! Renders a document by running the OpenSCAD command line tool on a
//! temporary copy of it and reading back the exported STL mesh.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use parastage_core::{Artifact, ArtifactRenderer, Document, RendererConfig, Result, StagingError};
use tokio::process::Command;

const INPUT_FILE: &str = "design.scad";
const OUTPUT_FILE: &str = "design.stl";

/// Runs `<command> [args..] -o <tmp>/design.stl <tmp>/design.scad`.
///
/// Every render uses a fresh temporary directory, so concurrent renders of
/// different candidates never share files.
#[derive(Debug, Clone)]
pub struct OpenScadRenderer {
    command: String,
    args: Vec<String>,
    timeout: Duration,
}

impl OpenScadRenderer {
    pub fn new(config: &RendererConfig) -> Self {
        Self {
            command: config.command.clone(),
            args: config.args.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }
}

#[async_trait]
impl ArtifactRenderer for OpenScadRenderer {
    async fn render(&self, document: &Document) -> Result<Artifact> {
        let work_dir = tempfile::TempDir::new()
            .map_err(|e| StagingError::render(format!("Failed to create work dir: {}", e)))?;
        let input = work_dir.path().join(INPUT_FILE);
        let output = work_dir.path().join(OUTPUT_FILE);

        tokio::fs::write(&input, document.source())
            .await
            .map_err(|e| StagingError::render(format!("Failed to write {:?}: {}", input, e)))?;

        let mut cmd = Command::new(&self.command);
        cmd.args(&self.args)
            .arg("-o")
            .arg(&output)
            .arg(&input)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        tracing::debug!("[OpenScadRenderer] Executing: {:?}", cmd);

        let result = tokio::time::timeout(self.timeout, cmd.output())
            .await
            .map_err(|_| {
                StagingError::render(format!(
                    "Render timed out after {} seconds",
                    self.timeout.as_secs()
                ))
            })?
            .map_err(|e| StagingError::render(format!("Failed to run '{}': {}", self.command, e)))?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            tracing::debug!("[OpenScadRenderer] Render failed: {}", stderr.trim());
            return Err(StagingError::render(format!(
                "'{}' exited with {}: {}",
                self.command,
                result.status,
                stderr.trim()
            )));
        }

        let bytes = tokio::fs::read(&output)
            .await
            .map_err(|e| StagingError::render(format!("No output produced: {}", e)))?;

        tracing::debug!("[OpenScadRenderer] Rendered {} bytes", bytes.len());
        Ok(Artifact::new(bytes))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    /// Builds a renderer that runs `sh <script> -o <out> <in>`.
    fn script_renderer(temp_dir: &TempDir, body: &str, timeout_secs: u64) -> OpenScadRenderer {
        let script = temp_dir.path().join("fake-openscad.sh");
        fs::write(&script, format!("#!/bin/sh\n{}\n", body)).unwrap();
        OpenScadRenderer::new(&RendererConfig {
            command: "sh".to_string(),
            args: vec![script.to_string_lossy().into_owned()],
            timeout_secs,
        })
    }

    #[tokio::test]
    async fn test_successful_render_returns_output_bytes() {
        let temp_dir = TempDir::new().unwrap();
        // $2 is the output path, $3 the input path
        let renderer = script_renderer(&temp_dir, "cp \"$3\" \"$2\"", 10);

        let artifact = renderer
            .render(&Document::new("cube([1, 2, 3]);"))
            .await
            .unwrap();
        assert_eq!(artifact.as_bytes(), b"cube([1, 2, 3]);");
    }

    #[tokio::test]
    async fn test_non_zero_exit_carries_stderr() {
        let temp_dir = TempDir::new().unwrap();
        let renderer = script_renderer(
            &temp_dir,
            "echo 'Parser error in line 3' >&2\nexit 1",
            10,
        );

        let err = renderer.render(&Document::new("cube(")).await.unwrap_err();
        assert!(err.is_render_failure());
        assert!(err.to_string().contains("Parser error in line 3"));
    }

    #[tokio::test]
    async fn test_missing_output_is_failure() {
        let temp_dir = TempDir::new().unwrap();
        let renderer = script_renderer(&temp_dir, "exit 0", 10);

        let err = renderer.render(&Document::new("a = 1;")).await.unwrap_err();
        assert!(err.is_render_failure());
    }

    #[tokio::test]
    async fn test_timeout_is_failure() {
        let temp_dir = TempDir::new().unwrap();
        let renderer = script_renderer(&temp_dir, "exec sleep 5", 1);

        let err = renderer.render(&Document::new("a = 1;")).await.unwrap_err();
        assert!(err.is_render_failure());
        assert!(err.to_string().contains("timed out"));
    }

    #[tokio::test]
    async fn test_missing_binary_is_failure() {
        let renderer = OpenScadRenderer::new(&RendererConfig {
            command: "parastage-no-such-renderer".to_string(),
            args: Vec::new(),
            timeout_secs: 5,
        });

        let err = renderer.render(&Document::new("a = 1;")).await.unwrap_err();
        assert!(err.is_render_failure());
    }
}
