//! # Progress Reporting
//!
//! A stage run emits a stream of [`ProgressEvent`]s: sub-step transitions,
//! per-investor delivery transitions, and a final completion marker.
//! [`project`] folds one event into the running [`ProgressUpdate`] shown to
//! the display collaborator.
//!
//! ## Invariants
//!
//! - `percent` never decreases within one run; an event reporting a lower
//!   figure keeps the previous one.
//! - `percent` never exceeds 100.
//! - [`ProgressReporter::begin`] resets to 0 for the next run.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use spvtax_core::InvestorId;
use spvtax_state::Stage;

use crate::display::DisplaySink;

/// Delivery state of one investor during file distribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    /// Not yet attempted.
    Pending,
    /// Delivery in progress.
    Sending,
    /// Delivered.
    Sent,
    /// Delivery failed.
    Error,
}

impl std::fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Sending => "sending",
            Self::Sent => "sent",
            Self::Error => "error",
        };
        f.write_str(s)
    }
}

/// One observation from a running stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    /// A simulated sub-step started or finished.
    Phase {
        /// Sub-step name.
        label: String,
        /// Cumulative percent at this transition.
        percent: u8,
    },
    /// An investor's delivery changed state.
    Delivery {
        /// The investor.
        investor: InvestorId,
        /// New delivery state.
        status: DeliveryStatus,
        /// Settled investors over total, as a percent.
        percent: u8,
    },
    /// The run committed successfully.
    Finished,
}

/// What the display shows for the running stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressUpdate {
    /// Stage being run.
    pub stage: Stage,
    /// Current phase label, if any.
    pub label: Option<String>,
    /// 0–100.
    pub percent: u8,
}

impl ProgressUpdate {
    /// Zero progress for `stage`.
    pub fn start(stage: Stage) -> Self {
        Self {
            stage,
            label: None,
            percent: 0,
        }
    }
}

/// Fold `event` into `current`.
pub fn project(current: &ProgressUpdate, event: &ProgressEvent) -> ProgressUpdate {
    let (label, percent) = match event {
        ProgressEvent::Phase { label, percent } => (Some(label.clone()), *percent),
        ProgressEvent::Delivery {
            investor,
            status,
            percent,
        } => (Some(format!("{investor}: {status}")), *percent),
        ProgressEvent::Finished => (current.label.clone(), 100),
    };
    ProgressUpdate {
        stage: current.stage,
        label,
        percent: percent.min(100).max(current.percent),
    }
}

/// `numerator / denominator` as a floored percent; an empty denominator
/// counts as done.
pub fn percent_of(numerator: u64, denominator: u64) -> u8 {
    if denominator == 0 {
        return 100;
    }
    let pct = numerator.min(denominator) * 100 / denominator;
    u8::try_from(pct).unwrap_or(100)
}

/// Holds the current projection and forwards every change to the display.
#[derive(Debug, Clone)]
pub struct ProgressReporter {
    display: Arc<dyn DisplaySink>,
    current: ProgressUpdate,
}

impl ProgressReporter {
    /// A reporter publishing to `display`.
    pub fn new(display: Arc<dyn DisplaySink>) -> Self {
        Self {
            display,
            current: ProgressUpdate::start(Stage::DataCollection),
        }
    }

    /// Reset to 0 for a new run of `stage`.
    pub fn begin(&mut self, stage: Stage) {
        self.current = ProgressUpdate::start(stage);
        self.display.progress(&self.current);
    }

    /// Apply an event and publish the result.
    pub fn record(&mut self, event: ProgressEvent) -> &ProgressUpdate {
        self.current = project(&self.current, &event);
        self.display.progress(&self.current);
        &self.current
    }

    /// The latest projection.
    pub fn current(&self) -> &ProgressUpdate {
        &self.current
    }
}
