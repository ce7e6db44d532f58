//! Staging orchestrator: the single entry point of the staging engine.
//!
//! Coordinates the change proposer, the renderer, the pending change set,
//! the version store and the history cursor for one project.

use std::sync::Arc;

use parastage_core::description::clean_description;
use parastage_core::{
    Artifact, ArtifactRenderer, CandidateResult, ChangeProposer, CommitResult, CurrentState,
    Document, HistoryItem, HistoryNavigator, NavigationResult, ParameterExtractor,
    PendingChangeSet, ProposalResult, RestoreResult, Result, StagedChange, StagingConfig,
    StagingError, VersionRepository,
};
use tokio::sync::Mutex;

use crate::version_store::VersionStore;

/// Description of the entry created by [`StagingOrchestrator::open_project`].
pub const INITIAL_DESCRIPTION: &str = "Initial design";

/// Everything guarded by the orchestrator lock.
struct StagingState {
    store: VersionStore,
    navigator: HistoryNavigator,
    pending: PendingChangeSet,
}

impl StagingState {
    fn head_sequence_number(&self) -> Option<u64> {
        self.store.head().map(|h| h.sequence_number)
    }

    /// Builds the navigator transition for `f`, persists the resulting head
    /// and only then installs it. Pending changes are dropped on a move.
    async fn navigate<F>(&mut self, f: F) -> Result<NavigationResult>
    where
        F: FnOnce(&mut HistoryNavigator, usize) -> bool,
    {
        let mut next = self.navigator;
        let moved = f(&mut next, self.store.len());
        let target = next
            .cursor()
            .and_then(|i| self.store.entry_at(i))
            .map(|e| e.sequence_number);

        let Some(sequence_number) = target.filter(|_| moved) else {
            return Ok(NavigationResult {
                moved: false,
                sequence_number: self.head_sequence_number(),
            });
        };

        self.store.move_head(sequence_number).await?;
        self.navigator = next;
        self.pending.clear();

        Ok(NavigationResult {
            moved: true,
            sequence_number: Some(sequence_number),
        })
    }
}

/// Serializes all state-changing operations of one project behind a single
/// async mutex.
///
/// `propose` is the exception: the proposer and renderer calls run without
/// the lock, and the result is only installed if the head has not moved in
/// the meantime. Two overlapping proposals are both accepted; whichever
/// finishes last wins.
pub struct StagingOrchestrator {
    state: Mutex<StagingState>,
    proposer: Arc<dyn ChangeProposer>,
    /// `None` when previews are disabled.
    renderer: Option<Arc<dyn ArtifactRenderer>>,
    extractor: Arc<dyn ParameterExtractor>,
    config: StagingConfig,
}

impl StagingOrchestrator {
    /// Opens the project held by `repository`.
    ///
    /// The history cursor is derived from the persisted head.
    ///
    /// # Errors
    ///
    /// - `StagingError::Config` if `config` is invalid
    /// - Any error raised while loading the history
    pub async fn open(
        repository: Arc<dyn VersionRepository>,
        proposer: Arc<dyn ChangeProposer>,
        renderer: Arc<dyn ArtifactRenderer>,
        extractor: Arc<dyn ParameterExtractor>,
        config: StagingConfig,
    ) -> Result<Self> {
        config.validate()?;
        let store = VersionStore::open(repository, config.max_entries).await?;

        let navigator = match store.head().and_then(|h| store.position(h.sequence_number)) {
            Some(index) => HistoryNavigator::At(index),
            None => HistoryNavigator::at_newest(store.len()),
        };
        tracing::info!(
            "[Orchestrator] Opened project with {} versions, cursor {:?}",
            store.len(),
            navigator.cursor()
        );

        Ok(Self {
            state: Mutex::new(StagingState {
                store,
                navigator,
                pending: PendingChangeSet::new(),
            }),
            proposer,
            renderer: config.render_previews.then_some(renderer),
            extractor,
            config,
        })
    }

    pub fn config(&self) -> &StagingConfig {
        &self.config
    }

    // ============================================================================
    // Proposal lifecycle
    // ============================================================================

    /// Asks the proposer for a change to the head document and stages it.
    ///
    /// # Returns
    ///
    /// - `ProposalResult::Staged`: the candidate rendered and is now pending
    /// - `ProposalResult::ClarificationNeeded` / `ProposalResult::NoChange`:
    ///   nothing changed
    ///
    /// # Errors
    ///
    /// - `StagingError::NoProject` if there is no head document
    /// - `StagingError::RenderFailure` if the candidate could not be rendered
    /// - `StagingError::StaleBase` if the head moved while the proposal was
    ///   computed
    /// - The proposer's error
    ///
    /// No state changes on any error.
    pub async fn propose(&self, instruction: &str) -> Result<ProposalResult> {
        let (base_sequence_number, base_document) = {
            let state = self.state.lock().await;
            let head = state.store.head().ok_or(StagingError::NoProject)?;
            (head.sequence_number, head.document.clone())
        };
        tracing::debug!(
            "[Orchestrator] Proposing against #{}: {}",
            base_sequence_number,
            instruction
        );

        let (candidate, description) = match self.proposer.propose(&base_document, instruction).await? {
            CandidateResult::Candidate {
                document,
                description,
            } => (document, description),
            CandidateResult::ParameterEdits { edits, description } => {
                (base_document.with_parameter_edits(&edits)?, description)
            }
            CandidateResult::Clarification {
                question,
                understood,
            } => {
                tracing::debug!("[Orchestrator] Proposer asked for clarification");
                return Ok(ProposalResult::ClarificationNeeded {
                    question,
                    understood,
                });
            }
            CandidateResult::NoChange => return Ok(ProposalResult::NoChange),
        };

        if candidate == base_document {
            tracing::debug!("[Orchestrator] Candidate equals head document");
            return Ok(ProposalResult::NoChange);
        }

        let staged = StagedChange::prepare(
            candidate,
            description,
            self.renderer.as_deref(),
            self.extractor.as_ref(),
        )
        .await?;

        let mut state = self.state.lock().await;
        let current = state.store.head();
        let unchanged = current.is_some_and(|h| {
            h.sequence_number == base_sequence_number && h.document == base_document
        });
        if !unchanged {
            let actual = current.map(|h| h.sequence_number);
            tracing::info!(
                "[Orchestrator] Discarding stale proposal (base #{}, head {:?})",
                base_sequence_number,
                actual
            );
            return Err(StagingError::StaleBase {
                expected: Some(base_sequence_number),
                actual,
            });
        }

        let summary = staged.summary(&self.extractor.extract(&base_document));
        state.pending.install(staged);
        tracing::info!("[Orchestrator] Staged change: {}", summary.description);
        Ok(ProposalResult::Staged(summary))
    }

    /// Commits the pending change as a new version.
    ///
    /// # Errors
    ///
    /// - `StagingError::NothingPending` if no change is staged
    /// - The store's error if the commit could not be recorded; the head,
    ///   the cursor and the pending change are then left untouched
    pub async fn approve(&self) -> Result<CommitResult> {
        self.commit_pending(None).await
    }

    /// Like [`Self::approve`], with `description` replacing the proposer's.
    pub async fn approve_with_description(&self, description: &str) -> Result<CommitResult> {
        self.commit_pending(Some(description)).await
    }

    async fn commit_pending(&self, description_override: Option<&str>) -> Result<CommitResult> {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;

        let staged = state.pending.peek().ok_or(StagingError::NothingPending)?;
        let raw = description_override.unwrap_or(&staged.description);
        let description = if self.config.clean_descriptions {
            clean_description(raw)
        } else {
            raw.to_string()
        };

        let result = state
            .store
            .append(
                staged.candidate_document.clone(),
                description,
                staged.candidate_parameters.clone(),
            )
            .await?;

        state.navigator.on_append(state.store.len());
        state.pending.clear();
        tracing::info!(
            "[Orchestrator] Approved change as #{}",
            result.entry.sequence_number
        );
        Ok(result)
    }

    /// Discards the pending change, if any.
    pub async fn reject(&self) {
        let mut state = self.state.lock().await;
        if state.pending.is_empty() {
            tracing::debug!("[Orchestrator] Nothing to reject");
        } else {
            state.pending.clear();
            tracing::info!("[Orchestrator] Rejected pending change");
        }
    }

    // ============================================================================
    // History navigation
    // ============================================================================

    /// Makes an existing version the head without creating a new one.
    ///
    /// Any pending change is discarded.
    ///
    /// # Errors
    ///
    /// - `StagingError::VersionNotFound` for an unknown or evicted version
    /// - The store's error if the head could not be persisted
    pub async fn restore(&self, sequence_number: u64) -> Result<RestoreResult> {
        let mut state = self.state.lock().await;
        let index = state
            .store
            .position(sequence_number)
            .ok_or_else(|| StagingError::version_not_found(sequence_number))?;

        let parameters = state.store.move_head(sequence_number).await?.parameters.clone();
        state.navigator = HistoryNavigator::At(index);
        let discarded_pending = !state.pending.is_empty();
        state.pending.clear();

        tracing::info!("[Orchestrator] Restored version #{}", sequence_number);
        Ok(RestoreResult {
            sequence_number,
            parameters,
            discarded_pending,
        })
    }

    /// Steps the head one version back. No-op at the oldest version.
    pub async fn undo(&self) -> Result<NavigationResult> {
        let mut state = self.state.lock().await;
        state.navigate(|nav, _| nav.undo()).await
    }

    /// Steps the head one version forward. No-op at the newest version.
    pub async fn redo(&self) -> Result<NavigationResult> {
        let mut state = self.state.lock().await;
        state.navigate(|nav, len| nav.redo(len)).await
    }

    /// Moves the head to `sequence_number`. No-op if it is not retained or
    /// is already the head.
    pub async fn jump_to(&self, sequence_number: u64) -> Result<NavigationResult> {
        let mut state = self.state.lock().await;
        let Some(index) = state.store.position(sequence_number) else {
            return Ok(NavigationResult {
                moved: false,
                sequence_number: state.head_sequence_number(),
            });
        };
        state.navigate(|nav, len| nav.jump_to(index, len)).await
    }

    // ============================================================================
    // Queries
    // ============================================================================

    pub async fn current_state(&self) -> CurrentState {
        let state = self.state.lock().await;
        let head = state.store.head();
        let head_parameters = head
            .map(|h| self.extractor.extract(&h.document))
            .unwrap_or_default();
        let pending = state
            .pending
            .peek()
            .map(|staged| staged.summary(&head_parameters));
        let len = state.store.len();

        CurrentState {
            project_name: state.store.project_name().map(str::to_string),
            head_sequence_number: head.map(|h| h.sequence_number),
            head_document: head.map(|h| h.document.clone()),
            head_parameters,
            pending,
            can_undo: state.navigator.can_undo(),
            can_redo: state.navigator.can_redo(len),
        }
    }

    pub async fn history(&self) -> Vec<HistoryItem> {
        self.state.lock().await.store.history()
    }

    /// Returns the head document, if a project is open.
    pub async fn head_document(&self) -> Option<Document> {
        let state = self.state.lock().await;
        state.store.head().map(|h| h.document.clone())
    }

    /// Returns the rendered preview of the pending change, if any.
    pub async fn pending_artifact(&self) -> Option<Artifact> {
        let state = self.state.lock().await;
        state
            .pending
            .peek()
            .and_then(|staged| staged.candidate_artifact.clone())
    }

    pub async fn update_description(&self, sequence_number: u64, text: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        state.store.update_description(sequence_number, text).await
    }

    // ============================================================================
    // Project lifecycle
    // ============================================================================

    /// Replaces the whole history with a single initial version of
    /// `document`.
    pub async fn open_project(
        &self,
        name: Option<String>,
        document: Document,
    ) -> Result<CommitResult> {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;

        state.pending.clear();
        state.store.reset(name).await?;
        state.navigator = HistoryNavigator::Empty;

        let parameters = self.extractor.extract(&document);
        let result = state
            .store
            .append(document, INITIAL_DESCRIPTION.to_string(), parameters)
            .await?;
        state.navigator.on_append(state.store.len());

        tracing::info!(
            "[Orchestrator] Opened new project {:?}",
            state.store.project_name()
        );
        Ok(result)
    }

    /// Removes all history and any pending change. No head remains.
    pub async fn clear_project(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        state.pending.clear();
        state.store.reset(None).await?;
        state.navigator = HistoryNavigator::Empty;
        tracing::info!("[Orchestrator] Project cleared");
        Ok(())
    }

    pub async fn set_project_name(&self, name: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        state.store.set_project_name(Some(name.to_string())).await
    }
}
