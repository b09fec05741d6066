//! # Run Subcommand
//!
//! `spvtax run --spv <id>` loads the SPV's filing and drives it through
//! every stage with the mock collaborators.
//!
//! - `--reject-check <name>` leaves an approval check unconfirmed, which
//!   stops the run at approval.
//! - `--fail-stage <stage>` makes that stage's operation reject its first
//!   attempt; the run retries once.
//! - `--json` suppresses progress output and prints the outcome list.

use std::sync::Arc;

use anyhow::{bail, Result};
use clap::Args;
use serde::Serialize;
use spvtax_core::SpvId;
use spvtax_engine::mock::{
    FailOnce, MockApproval, MockDistribution, MockEntitySource, MockGeneration, MockProcessing,
    MockSubmission,
};
use spvtax_engine::{
    Clock, EngineConfig, EngineError, ErrorKind, OutcomeSummary, StageExecutor, StageOperation,
    StageReport, TaxWorkflow,
};
use spvtax_state::{ApprovalChecks, Stage, WorkflowPhase};

use crate::console::ConsoleDisplay;

/// Exit code when the workflow stops short of completion.
pub const EXIT_INCOMPLETE: u8 = 2;

/// Arguments for `spvtax run`.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// SPV to file for (e.g. spv-001).
    #[arg(long)]
    pub spv: SpvId,

    /// Approval check to leave unconfirmed. Repeatable.
    #[arg(long = "reject-check", value_name = "NAME")]
    pub reject_checks: Vec<String>,

    /// Stage whose operation rejects its first attempt.
    #[arg(long, value_name = "STAGE")]
    pub fail_stage: Option<Stage>,

    /// Print a JSON report instead of progress.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct RunReport {
    spv: SpvId,
    phase: String,
    confirmation_id: Option<String>,
    outcomes: Vec<OutcomeSummary>,
}

/// Execute the run subcommand.
pub async fn run_filing(args: &RunArgs, config: &EngineConfig, clock: Arc<dyn Clock>) -> Result<u8> {
    let checks = approval_checks(&args.reject_checks)?;
    if args.fail_stage == Some(Stage::DataCollection) {
        bail!("--fail-stage applies to stages with an operation; data collection has none");
    }

    let display = Arc::new(ConsoleDisplay::new(args.json));
    let executor = StageExecutor::with_clock(config, Arc::clone(&clock));
    let source = Arc::new(MockEntitySource::new(Arc::clone(&clock)));
    let mut workflow = TaxWorkflow::new(executor, source, display.clone());

    let stopped = match drive(&mut workflow, args, config, &clock, checks).await {
        Ok(()) => false,
        Err(e) if is_user_stop(&e) => true,
        Err(e) => return Err(e.into()),
    };

    let report = RunReport {
        spv: args.spv.clone(),
        phase: workflow.phase().to_string(),
        confirmation_id: workflow.filing().and_then(|f| f.confirmation_id.clone()),
        outcomes: display.summaries(),
    };
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if let Some(id) = &report.confirmation_id {
        println!("Filed. Confirmation id: {id}");
    } else {
        println!("Stopped at {}.", report.phase);
    }

    Ok(if stopped { EXIT_INCOMPLETE } else { 0 })
}

/// Failures a user can fix by changing the invocation.
fn is_user_stop(err: &EngineError) -> bool {
    matches!(
        err.kind(),
        ErrorKind::ConfirmationIncomplete | ErrorKind::OperationFailed
    )
}

fn approval_checks(rejected: &[String]) -> Result<ApprovalChecks> {
    let mut checks = ApprovalChecks::all_confirmed();
    for name in rejected {
        if let Err(e) = checks.unset(name) {
            bail!("{e}; expected one of {}", ApprovalChecks::NAMES.join(", "));
        }
    }
    Ok(checks)
}

async fn drive(
    workflow: &mut TaxWorkflow,
    args: &RunArgs,
    config: &EngineConfig,
    clock: &Arc<dyn Clock>,
    checks: ApprovalChecks,
) -> Result<(), EngineError> {
    workflow.collect(&args.spv).await?;

    while let WorkflowPhase::AwaitingStage(stage) = workflow.phase() {
        let inject = args.fail_stage == Some(stage);
        let clock = Arc::clone(clock);
        let report = match stage {
            Stage::DataCollection => workflow.collect(&args.spv).await.map(|_| None)?,
            Stage::DataProcessing => {
                attempt(workflow, stage, MockProcessing::new(clock), inject, checks).await?
            }
            Stage::FileGeneration => {
                let op = MockGeneration::new(clock, config.download_base_url.clone());
                attempt(workflow, stage, op, inject, checks).await?
            }
            Stage::FileDistribution => {
                attempt(workflow, stage, MockDistribution::new(clock), inject, checks).await?
            }
            Stage::Approval => {
                let op = MockApproval::new(clock, checks);
                attempt(workflow, stage, op, inject, checks).await?
            }
            Stage::EFileSubmission => {
                attempt(workflow, stage, MockSubmission::new(clock), inject, checks).await?
            }
        };
        if let Some(report) = report {
            tracing::info!(run = %report.run_id, stage = %report.stage, phase = %report.phase, "stage committed");
        }
    }
    Ok(())
}

/// Run `stage`, wrapping `op` in a one-shot failure and retrying once when
/// `inject` is set.
async fn attempt<O: StageOperation>(
    workflow: &mut TaxWorkflow,
    stage: Stage,
    op: O,
    inject: bool,
    checks: ApprovalChecks,
) -> Result<Option<StageReport>, EngineError> {
    if !inject {
        return once(workflow, stage, &op, checks).await.map(Some);
    }
    let op = FailOnce::new(op);
    match once(workflow, stage, &op, checks).await {
        Err(e) if e.kind() == ErrorKind::OperationFailed => {
            tracing::warn!(stage = %stage, error = %e, "retrying after injected failure");
            once(workflow, stage, &op, checks).await.map(Some)
        }
        other => other.map(Some),
    }
}

async fn once(
    workflow: &mut TaxWorkflow,
    stage: Stage,
    op: &dyn StageOperation,
    checks: ApprovalChecks,
) -> Result<StageReport, EngineError> {
    if stage == Stage::Approval {
        workflow.approve(checks, op).await
    } else {
        workflow.run_stage(stage, op).await
    }
}
