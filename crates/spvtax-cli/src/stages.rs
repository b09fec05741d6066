//! # Stages Subcommand
//!
//! `spvtax stages` prints the workflow's stages in order with the status
//! every form and investor must reach before each one counts as complete.

use anyhow::Result;
use clap::Args;
use spvtax_engine::StagePlan;
use spvtax_state::Stage;

/// Arguments for `spvtax stages`.
#[derive(Args, Debug)]
pub struct StagesArgs {}

/// Execute the stages subcommand.
pub fn run_stages(_args: &StagesArgs) -> Result<u8> {
    print!("{}", render());
    Ok(0)
}

fn extra_requirement(stage: Stage) -> &'static str {
    match stage {
        Stage::DataCollection => "filing loaded",
        Stage::FileGeneration => "every form has a download reference",
        Stage::EFileSubmission => "confirmation id recorded",
        _ => "",
    }
}

fn render() -> String {
    let mut out = format!(
        "{:<2} {:<18} {:<18} {:<12} {:<12} {:<6} {}\n",
        "#", "STAGE", "TITLE", "FORMS", "INVESTORS", "STEPS", "ALSO"
    );
    for stage in Stage::ALL {
        let req = stage.requirement();
        let plan = StagePlan::for_stage(stage);
        let steps = if plan.per_investor {
            "each".to_string()
        } else {
            plan.substeps.len().to_string()
        };
        out.push_str(&format!(
            "{:<2} {:<18} {:<18} {:<12} {:<12} {:<6} {}\n",
            stage.index(),
            stage.to_string(),
            stage.title(),
            req.form_status.to_string(),
            req.investor_status.to_string(),
            steps,
            extra_requirement(stage),
        ));
    }
    out
}
