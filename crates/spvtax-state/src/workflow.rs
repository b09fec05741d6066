//! # Workflow Controller
//!
//! Gates progression through the six stages of a filing run.
//!
//! ## States
//!
//! ```text
//! AwaitingStage(DataCollection) ──complete──▶ AwaitingStage(DataProcessing)
//!        ──▶ … ──▶ AwaitingStage(EFileSubmission) ──complete──▶ AllComplete
//! ```
//!
//! Completion and navigation are separate transitions. Completing a stage
//! sets its flag and unlocks the next one; it happens only through
//! [`WorkflowController::complete_stage`] or
//! [`WorkflowController::commit_stage`]. Navigation moves the *viewed* stage
//! and never changes a flag: any completed stage or the single next pending
//! stage may be viewed, nothing further ahead.
//!
//! Flags are set in order and never cleared, so the active stage is always
//! the lowest incomplete one. Loading a different SPV or restarting discards
//! the filing and every flag.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use spvtax_core::Timestamp;

use crate::filing::{Filing, SuccessorError};
use crate::stage::{RequirementGap, Stage};

// ─── Phase ───────────────────────────────────────────────────────────

/// Where the workflow stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkflowPhase {
    /// Waiting on the given stage to complete.
    AwaitingStage(Stage),
    /// Every stage is complete (terminal).
    AllComplete,
}

impl std::fmt::Display for WorkflowPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AwaitingStage(stage) => write!(f, "AWAITING_{stage}"),
            Self::AllComplete => write!(f, "ALL_COMPLETE"),
        }
    }
}

// ─── Errors ──────────────────────────────────────────────────────────

/// Rejected workflow transitions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkflowError {
    /// The requested stage is ahead of what the gating allows.
    #[error("stage {requested} is locked; complete {active} first")]
    StageLocked {
        /// Stage that was requested.
        requested: Stage,
        /// Lowest incomplete stage.
        active: Stage,
    },

    /// The workflow is already in its terminal state.
    #[error("workflow is already complete")]
    WorkflowAlreadyComplete,

    /// The stage was completed earlier; re-running it could regress statuses.
    #[error("stage {0} is already complete")]
    StageAlreadyComplete(Stage),

    /// The filing does not meet the stage's completion criteria.
    #[error("stage {stage} is incomplete: {gap}")]
    StageIncomplete {
        /// Stage being completed.
        stage: Stage,
        /// The unmet criterion.
        gap: RequirementGap,
    },

    /// The proposed filing cannot replace the current one.
    #[error("stage {stage} produced an invalid filing: {source}")]
    InvalidSuccessor {
        /// Stage whose result was rejected.
        stage: Stage,
        /// Why it was rejected.
        #[source]
        source: SuccessorError,
    },

    /// Approval checks were not all confirmed.
    #[error("approval confirmation incomplete; missing: {}", missing.join(", "))]
    ConfirmationIncomplete {
        /// Names of the unconfirmed checks.
        missing: Vec<String>,
    },

    /// Navigation past either end of the stage sequence.
    #[error("no stage {direction} {from}")]
    NoAdjacentStage {
        /// "after" or "before".
        direction: &'static str,
        /// Stage navigated from.
        from: Stage,
    },
}

// ─── State ───────────────────────────────────────────────────────────

/// Record of a stage completion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageCompletion {
    /// The completed stage.
    pub stage: Stage,
    /// When it completed.
    pub completed_at: Timestamp,
}

/// The workflow's full state: flags, viewed stage, filing and history.
///
/// Serialize-only: the flags are valid only as produced by
/// [`WorkflowController`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WorkflowState {
    completed: [bool; Stage::COUNT],
    viewed: usize,
    filing: Option<Filing>,
    history: Vec<StageCompletion>,
}

impl WorkflowState {
    /// Per-stage completion flags, indexed by [`Stage::index`].
    pub fn completion_flags(&self) -> [bool; Stage::COUNT] {
        self.completed
    }

    /// The current filing, if one has been loaded.
    pub fn filing(&self) -> Option<&Filing> {
        self.filing.as_ref()
    }

    /// Completed stages in completion order.
    pub fn history(&self) -> &[StageCompletion] {
        &self.history
    }

    /// Lowest incomplete stage, or `None` once everything is complete.
    pub fn active_stage(&self) -> Option<Stage> {
        self.completed
            .iter()
            .position(|done| !done)
            .and_then(Stage::from_index)
    }

    /// The phase derived from the flags.
    pub fn phase(&self) -> WorkflowPhase {
        match self.active_stage() {
            Some(stage) => WorkflowPhase::AwaitingStage(stage),
            None => WorkflowPhase::AllComplete,
        }
    }

    /// The stage currently being looked at.
    pub fn viewed_stage(&self) -> Stage {
        Stage::from_index(self.viewed).unwrap_or(Stage::DataCollection)
    }
}

// ─── Controller ──────────────────────────────────────────────────────

/// Owns the [`WorkflowState`] and applies transitions to it.
#[derive(Debug, Clone, Default)]
pub struct WorkflowController {
    state: WorkflowState,
}

impl WorkflowController {
    /// A fresh workflow awaiting data collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read-only view of the state.
    pub fn state(&self) -> &WorkflowState {
        &self.state
    }

    /// Shorthand for `state().phase()`.
    pub fn phase(&self) -> WorkflowPhase {
        self.state.phase()
    }

    /// Shorthand for `state().filing()`.
    pub fn filing(&self) -> Option<&Filing> {
        self.state.filing()
    }

    /// Whether the given stage's flag is set.
    pub fn is_complete(&self, stage: Stage) -> bool {
        self.state.completed[stage.index()]
    }

    /// Discard the filing, every flag and the history.
    pub fn restart(&mut self) {
        self.state = WorkflowState::default();
    }

    /// Start over with a freshly loaded filing. Whatever was loaded before is
    /// discarded along with all progress; data collection is left pending.
    pub fn load_filing(&mut self, filing: Filing) {
        self.state = WorkflowState {
            filing: Some(filing),
            ..WorkflowState::default()
        };
    }

    /// Check that `stage` is the one whose operation may run now.
    pub fn ensure_runnable(&self, stage: Stage) -> Result<(), WorkflowError> {
        match self.state.active_stage() {
            None => Err(WorkflowError::WorkflowAlreadyComplete),
            Some(active) if stage == active => Ok(()),
            Some(active) if stage > active => Err(WorkflowError::StageLocked {
                requested: stage,
                active,
            }),
            Some(_) => Err(WorkflowError::StageAlreadyComplete(stage)),
        }
    }

    /// Mark `stage` complete against the current filing.
    pub fn complete_stage(&mut self, stage: Stage) -> Result<WorkflowPhase, WorkflowError> {
        self.ensure_runnable(stage)?;
        stage
            .check(self.state.filing.as_ref())
            .map_err(|gap| WorkflowError::StageIncomplete { stage, gap })?;
        Ok(self.set_complete(stage))
    }

    /// Replace the filing with `next` and mark `stage` complete, atomically.
    ///
    /// Nothing changes unless every check passes: gating, successor
    /// validity against the current filing, and the stage's criteria
    /// evaluated on `next`.
    pub fn commit_stage(
        &mut self,
        stage: Stage,
        next: Filing,
    ) -> Result<WorkflowPhase, WorkflowError> {
        self.ensure_runnable(stage)?;
        if let Some(current) = &self.state.filing {
            current
                .check_successor(&next)
                .map_err(|source| WorkflowError::InvalidSuccessor { stage, source })?;
        }
        stage
            .check(Some(&next))
            .map_err(|gap| WorkflowError::StageIncomplete { stage, gap })?;
        self.state.filing = Some(next);
        Ok(self.set_complete(stage))
    }

    /// Navigate to `stage` without changing any flag.
    ///
    /// Allowed for any completed stage and the single next pending stage;
    /// once the workflow is complete every stage may be viewed.
    pub fn request_stage_view(&mut self, stage: Stage) -> Result<Stage, WorkflowError> {
        if let Some(active) = self.state.active_stage() {
            if stage > active {
                return Err(WorkflowError::StageLocked {
                    requested: stage,
                    active,
                });
            }
        }
        self.state.viewed = stage.index();
        Ok(stage)
    }

    /// View the next stage. The stage being left must be complete.
    pub fn advance(&mut self) -> Result<Stage, WorkflowError> {
        let from = self.state.viewed_stage();
        let next = from.next().ok_or(WorkflowError::NoAdjacentStage {
            direction: "after",
            from,
        })?;
        if !self.is_complete(from) {
            return Err(WorkflowError::StageLocked {
                requested: next,
                active: self.state.active_stage().unwrap_or(from),
            });
        }
        self.request_stage_view(next)
    }

    /// View the previous stage.
    pub fn retreat(&mut self) -> Result<Stage, WorkflowError> {
        let from = self.state.viewed_stage();
        let previous = from.previous().ok_or(WorkflowError::NoAdjacentStage {
            direction: "before",
            from,
        })?;
        self.state.viewed = previous.index();
        Ok(previous)
    }

    fn set_complete(&mut self, stage: Stage) -> WorkflowPhase {
        self.state.completed[stage.index()] = true;
        self.state.history.push(StageCompletion {
            stage,
            completed_at: Timestamp::now(),
        });
        self.state.phase()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────
