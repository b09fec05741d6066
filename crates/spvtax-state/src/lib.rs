//! # spvtax-state: Filing Model and Stage Gating
//!
//! The synchronous half of the workflow engine: everything that can be
//! decided without awaiting a collaborator.
//!
//! ## Modules
//!
//! - **Status** (`status.rs`): the form and investor status lattices,
//!   forward-only advancement, and the `all_at_or_beyond` aggregate.
//!
//! - **Filing** (`filing.rs`): the filing aggregate with its tax forms and
//!   investors, and successor validation used before a stage result is
//!   committed.
//!
//! - **Stage** (`stage.rs`): the six ordered stages and the completion
//!   criteria each one imposes on a filing.
//!
//! - **Approval** (`approval.rs`): the three approver confirmations.
//!
//! - **Workflow** (`workflow.rs`): the controller that owns the filing and
//!   the completion flags, separating completion from navigation.
//!
//! ## Design
//!
//! Stages use an enum with validated transitions rather than one typestate
//! per stage. The controller must hold the current stage in a single value
//! that survives navigation back and forth, which a typestate chain cannot
//! express without erasing back to an enum anyway.

pub mod approval;
pub mod filing;
pub mod stage;
pub mod status;
pub mod workflow;

pub use approval::ApprovalChecks;
pub use filing::{Filing, FormKind, Investor, SuccessorError, TaxForm};
pub use stage::{RequirementGap, Stage, StageRequirement};
pub use status::{
    advance_status, all_at_or_beyond, raise_status, FormStatus, HasStatus, InvestorStatus,
    StatusError, StatusLattice,
};
pub use workflow::{
    StageCompletion, WorkflowController, WorkflowError, WorkflowPhase, WorkflowState,
};
