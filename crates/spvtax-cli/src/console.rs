//! Terminal display.

use std::io::Write;

use parking_lot::Mutex;
use spvtax_engine::{DisplaySink, OutcomeSummary, ProgressUpdate, StageOutcome, TracingDisplay};

/// Prints progress and outcomes to stdout and keeps a summary of every
/// outcome for the final report.
///
/// A quiet display keeps stdout clean for machine-readable output and sends
/// updates to the log instead.
#[derive(Debug, Default)]
pub struct ConsoleDisplay {
    quiet: bool,
    log: TracingDisplay,
    last: Mutex<Option<ProgressUpdate>>,
    outcomes: Mutex<Vec<OutcomeSummary>>,
}

impl ConsoleDisplay {
    /// A display that prints unless `quiet`, in which case it logs.
    pub fn new(quiet: bool) -> Self {
        Self {
            quiet,
            ..Self::default()
        }
    }

    /// Every outcome seen, oldest first.
    pub fn summaries(&self) -> Vec<OutcomeSummary> {
        self.outcomes.lock().clone()
    }

    fn print(&self, line: &str) {
        let mut out = std::io::stdout().lock();
        let _ = writeln!(out, "{line}");
    }
}

/// `[###.......]  30%`
pub fn bar(percent: u8) -> String {
    let filled = usize::from(percent.min(100)) / 10;
    format!("[{}{}] {percent:>3}%", "#".repeat(filled), ".".repeat(10 - filled))
}

impl DisplaySink for ConsoleDisplay {
    fn progress(&self, update: &ProgressUpdate) {
        {
            let mut last = self.last.lock();
            if last.as_ref() == Some(update) {
                return;
            }
            *last = Some(update.clone());
        }
        if self.quiet {
            self.log.progress(update);
            return;
        }
        let label = update.label.as_deref().unwrap_or("");
        self.print(&format!(
            "  {:<18} {} {label}",
            update.stage.title(),
            bar(update.percent)
        ));
    }

    fn outcome(&self, outcome: &StageOutcome) {
        self.outcomes.lock().push(OutcomeSummary::from(outcome));
        if self.quiet {
            self.log.outcome(outcome);
            return;
        }
        let line = match outcome {
            StageOutcome::Succeeded { stage, .. } => format!("✓ {} complete", stage.title()),
            StageOutcome::Failed { stage, message, .. } => {
                format!("✗ {} failed: {message}", stage.title())
            }
        };
        self.print(&line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spvtax_engine::ErrorKind;
    use spvtax_state::Stage;
    use std::sync::Arc;

    #[test]
    fn test_bar_scales_to_ten_cells() {
        assert_eq!(bar(0), "[..........]   0%");
        assert_eq!(bar(35), "[###.......]  35%");
        assert_eq!(bar(100), "[##########] 100%");
    }

    #[test]
    fn test_outcomes_are_summarized() {
        let display = ConsoleDisplay::new(true);
        display.outcome(&StageOutcome::Failed {
            stage: Stage::Approval,
            kind: ErrorKind::ConfirmationIncomplete,
            message: "Please confirm: reviewedForms.".to_string(),
        });
        let summaries = display.summaries();
        assert_eq!(summaries.len(), 1);
        assert!(!summaries[0].success);
        assert_eq!(summaries[0].stage, Stage::Approval);
    }

    #[test]
    fn test_quiet_display_logs_updates() {
        let captured = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&captured);
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || LogBuffer(Arc::clone(&sink)))
            .with_ansi(false)
            .finish();

        let display = ConsoleDisplay::new(true);
        tracing::subscriber::with_default(subscriber, || {
            display.progress(&ProgressUpdate::start(Stage::FileGeneration));
            display.progress(&ProgressUpdate::start(Stage::FileGeneration));
            display.outcome(&StageOutcome::Failed {
                stage: Stage::FileGeneration,
                kind: ErrorKind::OperationFailed,
                message: "render failed".to_string(),
            });
        });

        let text = String::from_utf8_lossy(&captured.lock()).into_owned();
        assert_eq!(text.matches("progress").count(), 1);
        assert!(text.contains("File Generation: render failed"));
        assert_eq!(display.summaries().len(), 1);
    }

    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }
}
