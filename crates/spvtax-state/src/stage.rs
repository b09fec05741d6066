//! # Workflow Stages
//!
//! The six stages of a filing run, in fixed order:
//!
//! ```text
//! DataCollection ──▶ DataProcessing ──▶ FileGeneration
//!        ──▶ FileDistribution ──▶ Approval ──▶ EFileSubmission
//! ```
//!
//! Each stage declares the status every form and investor must have reached
//! plus a filing-level predicate. A stage counts as complete only when the
//! filing satisfies both.

use serde::{Deserialize, Serialize};

use crate::filing::Filing;
use crate::status::{all_at_or_beyond, FormStatus, InvestorStatus};

/// One step of the filing workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum Stage {
    /// Select an SPV and load its details.
    DataCollection = 0,
    /// Validate and process entity and investor data.
    DataProcessing = 1,
    /// Render the tax forms.
    FileGeneration = 2,
    /// Deliver share forms to each investor.
    FileDistribution = 3,
    /// Sign off the filing.
    Approval = 4,
    /// E-file with the tax authority.
    EFileSubmission = 5,
}

impl Stage {
    /// Number of stages.
    pub const COUNT: usize = 6;

    /// All stages in workflow order.
    pub const ALL: [Stage; Self::COUNT] = [
        Self::DataCollection,
        Self::DataProcessing,
        Self::FileGeneration,
        Self::FileDistribution,
        Self::Approval,
        Self::EFileSubmission,
    ];

    /// Zero-based position in the workflow.
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Stage at a zero-based position.
    pub fn from_index(index: usize) -> Option<Stage> {
        Self::ALL.get(index).copied()
    }

    /// The following stage, if any.
    pub fn next(&self) -> Option<Stage> {
        Self::from_index(self.index() + 1)
    }

    /// The preceding stage, if any.
    pub fn previous(&self) -> Option<Stage> {
        self.index().checked_sub(1).and_then(Self::from_index)
    }

    /// Whether this is the last stage.
    pub fn is_final(&self) -> bool {
        matches!(self, Self::EFileSubmission)
    }

    /// Human-readable title.
    pub fn title(&self) -> &'static str {
        match self {
            Self::DataCollection => "Data Collection",
            Self::DataProcessing => "Data Processing",
            Self::FileGeneration => "File Generation",
            Self::FileDistribution => "File Distribution",
            Self::Approval => "Approval",
            Self::EFileSubmission => "E-File Submission",
        }
    }

    /// Status thresholds for this stage.
    pub fn requirement(&self) -> StageRequirement {
        let (form_status, investor_status) = match self {
            Self::DataCollection => (FormStatus::Pending, InvestorStatus::Pending),
            Self::DataProcessing | Self::FileGeneration => {
                (FormStatus::Generated, InvestorStatus::Generated)
            }
            Self::FileDistribution => (FormStatus::Distributed, InvestorStatus::Distributed),
            Self::Approval => (FormStatus::Approved, InvestorStatus::Approved),
            Self::EFileSubmission => (FormStatus::Submitted, InvestorStatus::Approved),
        };
        StageRequirement {
            form_status,
            investor_status,
        }
    }

    /// Check whether `filing` satisfies this stage's completion criteria.
    pub fn check(&self, filing: Option<&Filing>) -> Result<(), RequirementGap> {
        let filing = filing.ok_or(RequirementGap::NoFiling)?;
        let req = self.requirement();
        if !all_at_or_beyond(&filing.tax_forms, req.form_status) {
            return Err(RequirementGap::FormsBehind {
                required: req.form_status,
            });
        }
        if !all_at_or_beyond(&filing.investors, req.investor_status) {
            return Err(RequirementGap::InvestorsBehind {
                required: req.investor_status,
            });
        }
        match self {
            Self::FileGeneration => {
                if let Some(form) = filing.tax_forms.iter().find(|f| f.download_url.is_none()) {
                    return Err(RequirementGap::MissingDownload {
                        form: form.id.to_string(),
                    });
                }
            }
            Self::EFileSubmission => {
                if filing
                    .confirmation_id
                    .as_deref()
                    .map_or(true, str::is_empty)
                {
                    return Err(RequirementGap::MissingConfirmation);
                }
            }
            _ => {}
        }
        Ok(())
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::DataCollection => "DATA_COLLECTION",
            Self::DataProcessing => "DATA_PROCESSING",
            Self::FileGeneration => "FILE_GENERATION",
            Self::FileDistribution => "FILE_DISTRIBUTION",
            Self::Approval => "APPROVAL",
            Self::EFileSubmission => "EFILE_SUBMISSION",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for Stage {
    type Err = String;

    /// Accepts the display form, kebab-case, or the 0-based index.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(i) = s.parse::<usize>() {
            return Self::from_index(i).ok_or_else(|| format!("no stage at index {i}"));
        }
        let norm = s.trim().to_ascii_uppercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|stage| stage.to_string() == norm)
            .ok_or_else(|| format!("unknown stage {s:?}"))
    }
}

/// The status thresholds a stage requires of every child record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageRequirement {
    /// Minimum status for every tax form.
    pub form_status: FormStatus,
    /// Minimum status for every investor.
    pub investor_status: InvestorStatus,
}

/// Why a filing does not (yet) satisfy a stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequirementGap {
    /// No filing has been loaded.
    NoFiling,
    /// At least one form is below the threshold.
    FormsBehind {
        /// The form threshold.
        required: FormStatus,
    },
    /// At least one investor is below the threshold.
    InvestorsBehind {
        /// The investor threshold.
        required: InvestorStatus,
    },
    /// A form has no download reference.
    MissingDownload {
        /// The offending form.
        form: String,
    },
    /// No e-file confirmation id is recorded.
    MissingConfirmation,
}

impl std::fmt::Display for RequirementGap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoFiling => write!(f, "no filing loaded"),
            Self::FormsBehind { required } => write!(f, "not every form is {required}"),
            Self::InvestorsBehind { required } => {
                write!(f, "not every investor is {required}")
            }
            Self::MissingDownload { form } => write!(f, "form {form} has no download reference"),
            Self::MissingConfirmation => write!(f, "no e-file confirmation id"),
        }
    }
}
