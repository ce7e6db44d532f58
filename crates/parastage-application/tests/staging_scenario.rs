//! End-to-end staging behavior against the on-disk repository.

use std::sync::Arc;

use async_trait::async_trait;
use parastage_application::StagingOrchestrator;
use parastage_core::{
    Artifact, ArtifactRenderer, CandidateResult, ChangeProposer, Document, ProposalResult,
    RegexParameterExtractor, Result, StagingConfig, StagingError,
};
use parastage_infrastructure::{ParastagePaths, TomlVersionRepository};
use tempfile::TempDir;

const D1: &str = "width = 100;\ncube([width, 10, 10]);\n";
const D2: &str = "width = 100;\ncube([width, 10, 10]);\n// window\n";
const D3: &str = "width = 100;\ncube([width, 10, 10]);\n// window\n// door\n";

/// Maps known instructions to fixed documents; anything else appends a
/// numbered line.
struct ScriptedProposer;

#[async_trait]
impl ChangeProposer for ScriptedProposer {
    async fn propose(&self, document: &Document, instruction: &str) -> Result<CandidateResult> {
        let candidate = match instruction {
            "add window" => Document::new(D2),
            "add door" => Document::new(D3),
            other => Document::new(format!("{}// {}\n", document.source(), other)),
        };
        Ok(CandidateResult::Candidate {
            document: candidate,
            description: instruction.to_string(),
        })
    }
}

struct EchoRenderer;

#[async_trait]
impl ArtifactRenderer for EchoRenderer {
    async fn render(&self, document: &Document) -> Result<Artifact> {
        Ok(Artifact::new(document.source().as_bytes().to_vec()))
    }
}

fn repository(temp_dir: &TempDir) -> Arc<TomlVersionRepository> {
    let paths = ParastagePaths::new(Some(temp_dir.path())).unwrap();
    Arc::new(TomlVersionRepository::for_project(&paths, "scenario").unwrap())
}

async fn open(temp_dir: &TempDir, config: StagingConfig) -> StagingOrchestrator {
    StagingOrchestrator::open(
        repository(temp_dir),
        Arc::new(ScriptedProposer),
        Arc::new(EchoRenderer),
        Arc::new(RegexParameterExtractor),
        config,
    )
    .await
    .unwrap()
}

async fn head_source(orchestrator: &StagingOrchestrator) -> String {
    orchestrator
        .head_document()
        .await
        .unwrap()
        .source()
        .to_string()
}

async fn history_numbers(orchestrator: &StagingOrchestrator) -> Vec<u64> {
    orchestrator
        .history()
        .await
        .iter()
        .map(|h| h.sequence_number)
        .collect()
}

#[tokio::test]
async fn test_window_door_scenario() {
    let temp_dir = TempDir::new().unwrap();
    let orchestrator = open(&temp_dir, StagingConfig::default()).await;
    orchestrator
        .open_project(Some("Shed".to_string()), Document::new(D1))
        .await
        .unwrap();

    let staged = orchestrator.propose("add window").await.unwrap();
    assert!(matches!(staged, ProposalResult::Staged(_)));
    orchestrator.approve().await.unwrap();
    assert_eq!(history_numbers(&orchestrator).await, vec![1, 2]);
    assert_eq!(head_source(&orchestrator).await, D2);

    orchestrator.propose("add door").await.unwrap();
    assert_eq!(
        orchestrator.pending_artifact().await.unwrap().as_bytes(),
        D3.as_bytes()
    );
    orchestrator.reject().await;
    assert_eq!(history_numbers(&orchestrator).await, vec![1, 2]);
    assert_eq!(head_source(&orchestrator).await, D2);

    let undone = orchestrator.undo().await.unwrap();
    assert_eq!(undone.sequence_number, Some(1));
    assert_eq!(head_source(&orchestrator).await, D1);

    let restored = orchestrator.restore(2).await.unwrap();
    assert_eq!(restored.sequence_number, 2);
    assert_eq!(head_source(&orchestrator).await, D2);
    assert_eq!(history_numbers(&orchestrator).await, vec![1, 2]);
    assert_eq!(
        orchestrator.current_state().await.head_sequence_number,
        Some(2)
    );
}

#[tokio::test]
async fn test_state_survives_restart() {
    let temp_dir = TempDir::new().unwrap();
    {
        let orchestrator = open(&temp_dir, StagingConfig::default()).await;
        orchestrator
            .open_project(Some("Shed".to_string()), Document::new(D1))
            .await
            .unwrap();
        orchestrator.propose("add window").await.unwrap();
        orchestrator.approve().await.unwrap();
        orchestrator.propose("add door").await.unwrap();
        orchestrator.approve().await.unwrap();
        orchestrator.undo().await.unwrap();
        orchestrator.update_description(1, "Bare shed").await.unwrap();
    }

    let reopened = open(&temp_dir, StagingConfig::default()).await;
    let state = reopened.current_state().await;
    assert_eq!(state.project_name.as_deref(), Some("Shed"));
    assert_eq!(state.head_sequence_number, Some(2));
    assert_eq!(head_source(&reopened).await, D2);
    assert!(state.can_redo);
    // Pending changes are not persisted
    assert!(state.pending.is_none());
    assert_eq!(reopened.history().await[0].description, "Bare shed");

    reopened.redo().await.unwrap();
    assert_eq!(head_source(&reopened).await, D3);
}

#[tokio::test]
async fn test_sequence_numbers_are_not_reused_after_eviction() {
    let temp_dir = TempDir::new().unwrap();
    let orchestrator = open(&temp_dir, StagingConfig::default()).await;
    orchestrator
        .open_project(None, Document::new(D1))
        .await
        .unwrap();

    for n in 2..=51 {
        orchestrator.propose(&format!("step {}", n)).await.unwrap();
        let committed = orchestrator.approve().await.unwrap();
        assert_eq!(committed.entry.sequence_number, n);
        assert!(orchestrator.history().await.len() <= 50);
    }

    let numbers = history_numbers(&orchestrator).await;
    assert_eq!(numbers.len(), 50);
    assert_eq!(numbers[0], 2);
    assert!(orchestrator.restore(1).await.unwrap_err().is_not_found());

    orchestrator.propose("step 52").await.unwrap();
    let next = orchestrator.approve().await.unwrap();
    assert_eq!(next.entry.sequence_number, 52);
    assert_eq!(next.evicted, Some(2));

    // Numbering also continues after a restart
    drop(orchestrator);
    let reopened = open(&temp_dir, StagingConfig::default()).await;
    reopened.propose("step 53").await.unwrap();
    assert_eq!(reopened.approve().await.unwrap().entry.sequence_number, 53);
    assert_eq!(reopened.history().await.len(), 50);
}

#[tokio::test]
async fn test_approve_without_pending_leaves_disk_untouched() {
    let temp_dir = TempDir::new().unwrap();
    let orchestrator = open(&temp_dir, StagingConfig::default()).await;
    orchestrator
        .open_project(None, Document::new(D1))
        .await
        .unwrap();

    let err = orchestrator.approve().await.unwrap_err();
    assert_eq!(err, StagingError::NothingPending);

    let reopened = open(&temp_dir, StagingConfig::default()).await;
    assert_eq!(history_numbers(&reopened).await, vec![1]);
}

#[tokio::test]
async fn test_clear_project_removes_history_on_disk() {
    let temp_dir = TempDir::new().unwrap();
    let orchestrator = open(&temp_dir, StagingConfig::default()).await;
    orchestrator
        .open_project(None, Document::new(D1))
        .await
        .unwrap();
    orchestrator.clear_project().await.unwrap();

    let reopened = open(&temp_dir, StagingConfig::default()).await;
    assert!(reopened.history().await.is_empty());
    assert!(reopened.head_document().await.is_none());
}
