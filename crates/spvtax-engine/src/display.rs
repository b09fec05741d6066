//! Display collaborators.
//!
//! A [`DisplaySink`] receives progress projections and per-stage outcomes.
//! It is a pure sink: nothing it does can change workflow state.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use spvtax_core::RunId;
use spvtax_state::{Stage, WorkflowPhase};

use crate::error::ErrorKind;
use crate::progress::ProgressUpdate;

/// Final word on one stage attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutcome {
    /// The stage committed.
    Succeeded {
        /// Stage that completed.
        stage: Stage,
        /// The executor run, absent for data collection.
        run_id: Option<RunId>,
        /// Workflow phase after the commit.
        phase: WorkflowPhase,
    },
    /// The stage did not commit; the filing is unchanged.
    Failed {
        /// Stage that failed.
        stage: Stage,
        /// Classification.
        kind: ErrorKind,
        /// End-user message.
        message: String,
    },
}

impl StageOutcome {
    /// The stage this outcome is about.
    pub fn stage(&self) -> Stage {
        match self {
            Self::Succeeded { stage, .. } | Self::Failed { stage, .. } => *stage,
        }
    }

    /// Whether the stage committed.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }
}

/// Receives presentation updates.
pub trait DisplaySink: Send + Sync + std::fmt::Debug {
    /// Latest progress of the running stage.
    fn progress(&self, update: &ProgressUpdate);

    /// A stage attempt finished.
    fn outcome(&self, outcome: &StageOutcome);
}

/// Renders updates as `tracing` events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingDisplay;

impl DisplaySink for TracingDisplay {
    fn progress(&self, update: &ProgressUpdate) {
        tracing::info!(
            stage = %update.stage,
            percent = update.percent,
            phase = update.label.as_deref().unwrap_or("-"),
            "progress"
        );
    }

    fn outcome(&self, outcome: &StageOutcome) {
        match outcome {
            StageOutcome::Succeeded {
                stage,
                run_id,
                phase,
            } => {
                let run = run_id.map(|r| r.to_string()).unwrap_or_default();
                tracing::info!(stage = %stage, run = %run, phase = %phase, "{} complete", stage.title());
            }
            StageOutcome::Failed {
                stage,
                kind,
                message,
            } => {
                tracing::warn!(stage = %stage, kind = ?kind, "{}: {message}", stage.title());
            }
        }
    }
}

/// Keeps every update in memory.
#[derive(Debug, Default)]
pub struct RecordingDisplay {
    updates: Mutex<Vec<ProgressUpdate>>,
    outcomes: Mutex<Vec<StageOutcome>>,
}

impl RecordingDisplay {
    /// Progress updates so far, oldest first.
    pub fn updates(&self) -> Vec<ProgressUpdate> {
        self.updates.lock().clone()
    }

    /// Progress updates for one stage.
    pub fn updates_for(&self, stage: Stage) -> Vec<ProgressUpdate> {
        self.updates
            .lock()
            .iter()
            .filter(|u| u.stage == stage)
            .cloned()
            .collect()
    }

    /// Outcomes so far, oldest first.
    pub fn outcomes(&self) -> Vec<StageOutcome> {
        self.outcomes.lock().clone()
    }
}

impl DisplaySink for RecordingDisplay {
    fn progress(&self, update: &ProgressUpdate) {
        self.updates.lock().push(update.clone());
    }

    fn outcome(&self, outcome: &StageOutcome) {
        self.outcomes.lock().push(outcome.clone());
    }
}

/// A serializable summary of an outcome, for machine-readable output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeSummary {
    /// Stage the outcome is about.
    pub stage: Stage,
    /// Whether it committed.
    pub success: bool,
    /// Failure message, if any.
    pub message: Option<String>,
}

impl From<&StageOutcome> for OutcomeSummary {
    fn from(outcome: &StageOutcome) -> Self {
        match outcome {
            StageOutcome::Succeeded { stage, .. } => Self {
                stage: *stage,
                success: true,
                message: None,
            },
            StageOutcome::Failed { stage, message, .. } => Self {
                stage: *stage,
                success: false,
                message: Some(message.clone()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::Arc;

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl Captured {
        fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.lock()).into_owned()
        }
    }

    #[test]
    fn test_recording_display_keeps_order() {
        let d = RecordingDisplay::default();
        d.progress(&ProgressUpdate::start(Stage::DataProcessing));
        d.progress(&ProgressUpdate::start(Stage::FileGeneration));
        d.outcome(&StageOutcome::Failed {
            stage: Stage::FileGeneration,
            kind: ErrorKind::OperationFailed,
            message: "boom".to_string(),
        });
        assert_eq!(d.updates().len(), 2);
        assert_eq!(d.updates_for(Stage::FileGeneration).len(), 1);
        let outcomes = d.outcomes();
        assert_eq!(outcomes.len(), 1);
        assert!(!outcomes[0].is_success());
        assert_eq!(outcomes[0].stage(), Stage::FileGeneration);
    }

    #[test]
    fn test_outcome_summary_serializes() {
        let summary = OutcomeSummary::from(&StageOutcome::Succeeded {
            stage: Stage::Approval,
            run_id: None,
            phase: WorkflowPhase::AwaitingStage(Stage::EFileSubmission),
        });
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["stage"], "Approval");
        assert_eq!(json["success"], true);
    }

    #[test]
    fn test_tracing_display_logs_progress_and_outcomes() {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::INFO)
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            let display = TracingDisplay;
            display.progress(&ProgressUpdate::start(Stage::DataProcessing));
            display.outcome(&StageOutcome::Succeeded {
                stage: Stage::DataProcessing,
                run_id: None,
                phase: WorkflowPhase::AwaitingStage(Stage::FileGeneration),
            });
            display.outcome(&StageOutcome::Failed {
                stage: Stage::Approval,
                kind: ErrorKind::ConfirmationIncomplete,
                message: "Please confirm: reviewedForms.".to_string(),
            });
        });

        let text = captured.text();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("INFO") && lines[0].contains("progress") && lines[0].contains("percent=0"));
        assert!(lines[1].contains("Data Processing complete"));
        assert!(lines[2].contains("WARN"));
        assert!(lines[2].contains("Please confirm: reviewedForms."));
    }
}
