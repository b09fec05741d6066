//! Per-stage execution plans.
//!
//! A plan lists the simulated sub-steps a stage walks through before its
//! operation is invoked, each weighted in nominal units, and whether the
//! stage delivers to investors one at a time. Sub-steps only drive progress
//! reporting; they never influence the resulting filing.

use spvtax_state::Stage;

/// A named simulated phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubStep {
    /// Display name.
    pub name: &'static str,
    /// Nominal duration in step units.
    pub units: u32,
}

const fn step(name: &'static str, units: u32) -> SubStep {
    SubStep { name, units }
}

const PROCESSING: &[SubStep] = &[
    step("Validate Entity Information", 2),
    step("Process Investor Data", 3),
    step("Calculate Distributions", 2),
    step("Prepare Tax Allocations", 4),
    step("Apply Tax Rules & Regulations", 3),
];

const SUBMISSION: &[SubStep] = &[
    step("Preparing submission package", 2),
    step("Validating tax information", 2),
    step("Encrypting sensitive data", 2),
    step("Connecting to IRS e-file system", 2),
    step("Submitting forms", 2),
    step("Receiving confirmation", 2),
];

/// How a stage is executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StagePlan {
    /// Sub-steps, in order.
    pub substeps: &'static [SubStep],
    /// Deliver to each investor before invoking the operation.
    pub per_investor: bool,
}

impl StagePlan {
    /// The plan for `stage`.
    pub fn for_stage(stage: Stage) -> Self {
        match stage {
            Stage::DataProcessing => Self {
                substeps: PROCESSING,
                per_investor: false,
            },
            Stage::EFileSubmission => Self {
                substeps: SUBMISSION,
                per_investor: false,
            },
            Stage::FileDistribution => Self {
                substeps: &[],
                per_investor: true,
            },
            Stage::DataCollection | Stage::FileGeneration | Stage::Approval => Self {
                substeps: &[],
                per_investor: false,
            },
        }
    }

    /// Sum of sub-step units.
    pub fn total_units(&self) -> u64 {
        self.substeps.iter().map(|s| u64::from(s.units)).sum()
    }
}
