//! # spvtax-engine
//!
//! Asynchronous execution of the SPV tax workflow.
//!
//! - [`executor`]: runs one stage on a copy of the filing, walking simulated
//!   sub-steps and per-investor deliveries, and validates the result.
//! - [`session`]: [`TaxWorkflow`], the single owner of a filing's workflow,
//!   which commits successful runs through the state machine.
//! - [`progress`]: folds run events into a monotonic percentage for the
//!   [`display`] collaborator.
//! - [`operation`]: the collaborator traits a stage calls out to;
//!   [`mock`] provides in-memory implementations.
//! - [`clock`]: injectable waiting, so tests never sleep.
//! - [`config`]: YAML and environment configuration.
//!
//! ## Crate Policy
//!
//! - Stage results are all-or-nothing: nothing the executor does is
//!   visible until the controller commits the successor filing.
//! - At most one run per filing is in flight; a second attempt fails fast.
//! - Every error is recoverable; a failed stage may simply be run again.

pub mod clock;
pub mod config;
pub mod display;
pub mod error;
pub mod executor;
pub mod mock;
pub mod operation;
pub mod plan;
pub mod progress;
pub mod session;

pub use clock::{Clock, InstantClock, TokioClock};
pub use config::{ConfigError, EngineConfig};
pub use display::{DisplaySink, OutcomeSummary, RecordingDisplay, StageOutcome, TracingDisplay};
pub use error::{EngineError, ErrorKind, OperationError};
pub use executor::{StageExecutor, StageRun};
pub use operation::{EntitySource, EntitySummary, StageOperation};
pub use plan::{StagePlan, SubStep};
pub use progress::{DeliveryStatus, ProgressEvent, ProgressReporter, ProgressUpdate};
pub use session::{StageReport, TaxWorkflow};
