//! Design documents and their rendered artifacts.

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Result, StagingError};
use crate::parameters::{ParameterMap, format_value};

/// The full source text of a parametric design.
///
/// A `Document` is immutable: every edit produces a new value. The same
/// content is held authoritatively by exactly one owner at a time, either
/// the head slot of the version store or the pending change set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document {
    source: String,
}

impl Document {
    /// Creates a document from its source text.
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
        }
    }

    /// Returns the source text.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn len(&self) -> usize {
        self.source.len()
    }

    pub fn is_empty(&self) -> bool {
        self.source.is_empty()
    }

    /// Produces a new document where the numeric literal of each named
    /// assignment is replaced by the edited value.
    ///
    /// Only assignments of the form `name = <number>;` are touched. Edits
    /// naming a parameter the document does not assign are ignored, so the
    /// result may equal `self`.
    ///
    /// # Arguments
    ///
    /// * `edits` - Parameter names and their new values
    ///
    /// # Returns
    ///
    /// - `Ok(Document)`: The rewritten document
    /// - `Err(StagingError::Internal)`: A substitution pattern could not be built
    pub fn with_parameter_edits(&self, edits: &ParameterMap) -> Result<Document> {
        let mut source = self.source.clone();

        for (name, value) in edits.iter() {
            let pattern = format!(r"(\b{}\s*=\s*)(\d+(?:\.\d+)?)(\s*;)", regex::escape(name));
            let re = Regex::new(&pattern).map_err(|e| {
                StagingError::internal(format!("Invalid edit pattern for '{}': {}", name, e))
            })?;
            let replacement = format!("${{1}}{}${{3}}", format_value(value));
            source = re.replace_all(&source, replacement.as_str()).into_owned();
            tracing::debug!("[Document] Applied edit {} = {}", name, format_value(value));
        }

        Ok(Document::new(source))
    }
}

impl From<&str> for Document {
    fn from(source: &str) -> Self {
        Document::new(source)
    }
}

impl From<String> for Document {
    fn from(source: String) -> Self {
        Document::new(source)
    }
}

/// Opaque rendered bytes derived from a document (e.g. an STL mesh).
///
/// Artifacts are a cache: they can always be regenerated from the document
/// they were rendered from, and the store never treats them as authoritative.
#[derive(Clone, PartialEq, Eq)]
pub struct Artifact {
    bytes: Vec<u8>,
}

impl Artifact {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

impl std::fmt::Debug for Artifact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Artifact")
            .field("len", &self.bytes.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOX_SCAD: &str = "width = 100;\nheight = 40.5;\ninner_width = 90;\ncube([width, 10, height]);\n";

    #[test]
    fn test_parameter_edits_rewrite_only_named_assignment() {
        let doc = Document::new(BOX_SCAD);
        let mut edits = ParameterMap::new();
        edits.insert("width", 120.0);

        let edited = doc.with_parameter_edits(&edits).unwrap();

        assert!(edited.source().contains("width = 120;"));
        // Word boundary keeps the longer name untouched
        assert!(edited.source().contains("inner_width = 90;"));
        assert!(edited.source().contains("height = 40.5;"));
        // Original is never mutated
        assert_eq!(doc.source(), BOX_SCAD);
    }

    #[test]
    fn test_parameter_edits_fractional_value() {
        let doc = Document::new(BOX_SCAD);
        let mut edits = ParameterMap::new();
        edits.insert("height", 12.25);

        let edited = doc.with_parameter_edits(&edits).unwrap();
        assert!(edited.source().contains("height = 12.25;"));
    }

    #[test]
    fn test_parameter_edits_unknown_name_is_identity() {
        let doc = Document::new(BOX_SCAD);
        let mut edits = ParameterMap::new();
        edits.insert("depth", 5.0);

        let edited = doc.with_parameter_edits(&edits).unwrap();
        assert_eq!(edited, doc);
    }

    #[test]
    fn test_artifact_debug_hides_bytes() {
        let artifact = Artifact::new(vec![0u8; 2048]);
        assert_eq!(format!("{:?}", artifact), "Artifact { len: 2048 }");
    }
}
