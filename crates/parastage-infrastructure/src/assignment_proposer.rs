//! Deterministic change proposer for terminal use.
//!
//! Understands instructions that spell out parameter assignments, such as
//! `set width=120 height=40` or `width to 80`. Anything else is answered
//! with a clarification question.

use std::sync::LazyLock;

use async_trait::async_trait;
use parastage_core::parameters::format_value;
use parastage_core::{
    CandidateResult, ChangeProposer, Document, ParameterExtractor, ParameterMap,
    RegexParameterExtractor, Result,
};
use regex::Regex;

static INSTRUCTION_ASSIGNMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\w+)(?:\s*=\s*|\s+to\s+)(\d+(?:\.\d+)?)")
        .expect("instruction pattern is valid")
});

/// Turns explicit assignments in an instruction into parameter edits.
pub struct AssignmentProposer {
    extractor: Box<dyn ParameterExtractor>,
}

impl AssignmentProposer {
    pub fn new() -> Self {
        Self::with_extractor(Box::new(RegexParameterExtractor))
    }

    pub fn with_extractor(extractor: Box<dyn ParameterExtractor>) -> Self {
        Self { extractor }
    }

    fn parse(instruction: &str) -> ParameterMap {
        INSTRUCTION_ASSIGNMENT
            .captures_iter(instruction)
            .filter_map(|caps| {
                let value = caps[2].parse::<f64>().ok()?;
                Some((caps[1].to_string(), value))
            })
            .collect()
    }
}

impl Default for AssignmentProposer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChangeProposer for AssignmentProposer {
    async fn propose(&self, document: &Document, instruction: &str) -> Result<CandidateResult> {
        let requested = Self::parse(instruction);
        if requested.is_empty() {
            return Ok(CandidateResult::Clarification {
                question: "Which parameter should change? Try e.g. `set width=120`.".to_string(),
                understood: None,
            });
        }

        let known = self.extractor.extract(document);
        let edits: ParameterMap = requested
            .iter()
            .filter(|(name, _)| known.get(name).is_some())
            .map(|(name, value)| (name.to_string(), value))
            .collect();

        if edits.is_empty() {
            tracing::debug!(
                "[AssignmentProposer] None of {} requested parameters exist",
                requested.len()
            );
            return Ok(CandidateResult::NoChange);
        }

        let description = format!(
            "Set {}",
            edits
                .iter()
                .map(|(name, value)| format!("{} to {}", name, format_value(value)))
                .collect::<Vec<_>>()
                .join(", ")
        );

        Ok(CandidateResult::ParameterEdits { edits, description })
    }
}
