//! # Engine Errors
//!
//! [`OperationError`] is what a collaborator returns; [`EngineError`] is
//! what the engine surfaces. Every engine error is recoverable: a failed
//! stage stays incomplete, the filing is untouched, and the stage may be
//! run again.

use spvtax_core::SpvId;
use spvtax_state::{Stage, StatusError, WorkflowError};
use thiserror::Error;

use crate::config::ConfigError;

/// A rejection from an external collaborator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OperationError {
    /// The collaborator refused or failed to perform the operation.
    #[error("rejected: {reason}")]
    Rejected {
        /// Human-readable reason.
        reason: String,
    },

    /// The requested record does not exist in the source system.
    #[error("{kind} {id} not found")]
    NotFound {
        /// Record kind ("spv", "investor").
        kind: &'static str,
        /// Requested identifier.
        id: String,
    },

    /// Approval checks were not all confirmed.
    #[error("approval confirmation incomplete; missing: {}", missing.join(", "))]
    ConfirmationIncomplete {
        /// Names of the unconfirmed checks.
        missing: Vec<String>,
    },
}

impl OperationError {
    /// Shorthand for [`OperationError::Rejected`].
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::Rejected {
            reason: reason.into(),
        }
    }
}

/// Coarse classification matching how each error is presented to a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A status regression or skip; a programming error, not user-facing.
    InvalidTransition,
    /// Another run is in flight for the same filing.
    StageAlreadyRunning,
    /// Navigation or completion ahead of the gating.
    StageLocked,
    /// Approval checks missing.
    ConfirmationIncomplete,
    /// The collaborator rejected the operation.
    OperationFailed,
    /// Mutation attempted after the terminal state.
    WorkflowAlreadyComplete,
    /// Configuration or lookup problems outside the workflow itself.
    Environment,
}

/// Errors surfaced by the engine.
#[derive(Error, Debug)]
pub enum EngineError {
    /// A workflow gating or commit rule was violated.
    #[error(transparent)]
    Workflow(#[from] WorkflowError),

    /// A stage result moved a status backwards.
    #[error(transparent)]
    Status(#[from] StatusError),

    /// A run for this filing is already in flight.
    #[error("a stage is already running for filing {spv}")]
    StageAlreadyRunning {
        /// Filing that is busy.
        spv: SpvId,
    },

    /// The stage's collaborator rejected the operation.
    #[error("stage {stage} failed: {reason}")]
    OperationFailed {
        /// Stage that failed.
        stage: Stage,
        /// Collaborator-supplied reason.
        reason: String,
    },

    /// The entity source has no such SPV.
    #[error("entity {0} not found")]
    EntityNotFound(String),

    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl EngineError {
    /// Translate a collaborator error raised while running `stage`.
    pub fn from_operation(stage: Stage, err: OperationError) -> Self {
        match err {
            OperationError::ConfirmationIncomplete { missing } => {
                Self::Workflow(WorkflowError::ConfirmationIncomplete { missing })
            }
            OperationError::NotFound { kind: "spv", id } => Self::EntityNotFound(id),
            other => Self::OperationFailed {
                stage,
                reason: other.to_string(),
            },
        }
    }

    /// How this error should be presented.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Workflow(w) => match w {
                WorkflowError::StageLocked { .. }
                | WorkflowError::StageIncomplete { .. }
                | WorkflowError::NoAdjacentStage { .. } => ErrorKind::StageLocked,
                WorkflowError::WorkflowAlreadyComplete => ErrorKind::WorkflowAlreadyComplete,
                WorkflowError::ConfirmationIncomplete { .. } => ErrorKind::ConfirmationIncomplete,
                WorkflowError::StageAlreadyComplete(_) | WorkflowError::InvalidSuccessor { .. } => {
                    ErrorKind::InvalidTransition
                }
            },
            Self::Status(_) => ErrorKind::InvalidTransition,
            Self::StageAlreadyRunning { .. } => ErrorKind::StageAlreadyRunning,
            Self::OperationFailed { .. } => ErrorKind::OperationFailed,
            Self::EntityNotFound(_) | Self::Config(_) => ErrorKind::Environment,
        }
    }

    /// End-user text for this error.
    pub fn user_message(&self) -> String {
        match self.kind() {
            ErrorKind::InvalidTransition => {
                "An internal consistency check failed; the filing was not changed.".to_string()
            }
            ErrorKind::StageAlreadyRunning => {
                "This step is already running. Please try again in a moment.".to_string()
            }
            ErrorKind::StageLocked => "Please complete the current step first.".to_string(),
            ErrorKind::ConfirmationIncomplete => match self {
                Self::Workflow(WorkflowError::ConfirmationIncomplete { missing }) => {
                    format!("Please confirm: {}.", missing.join(", "))
                }
                _ => "Please confirm all items before approving.".to_string(),
            },
            ErrorKind::OperationFailed => {
                "The operation failed. The filing was not changed; you can retry.".to_string()
            }
            ErrorKind::WorkflowAlreadyComplete => {
                "The tax filing process is already complete.".to_string()
            }
            ErrorKind::Environment => self.to_string(),
        }
    }
}
