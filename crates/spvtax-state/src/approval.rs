//! Approval confirmations.
//!
//! Approving a filing requires the approver to confirm three separate
//! checks. Missing checks are reported by their wire names so a caller can
//! point at the exact checkbox.

use serde::{Deserialize, Serialize};

use crate::workflow::WorkflowError;

/// The approver's confirmations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalChecks {
    /// All generated forms have been reviewed.
    pub reviewed_forms: bool,
    /// All information on the forms is correct.
    pub all_info_correct: bool,
    /// Electronic submission is authorized.
    pub authorize_submission: bool,
}

impl ApprovalChecks {
    /// Check names, in display order.
    pub const NAMES: [&'static str; 3] = ["reviewedForms", "allInfoCorrect", "authorizeSubmission"];

    /// Every check confirmed.
    pub fn all_confirmed() -> Self {
        Self {
            reviewed_forms: true,
            all_info_correct: true,
            authorize_submission: true,
        }
    }

    /// Names of the unconfirmed checks.
    pub fn missing(&self) -> Vec<&'static str> {
        [
            self.reviewed_forms,
            self.all_info_correct,
            self.authorize_submission,
        ]
        .into_iter()
        .zip(Self::NAMES)
        .filter_map(|(ok, name)| (!ok).then_some(name))
        .collect()
    }

    /// `Ok` only when every check is confirmed.
    pub fn validate(&self) -> Result<(), WorkflowError> {
        let missing = self.missing();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(WorkflowError::ConfirmationIncomplete {
                missing: missing.into_iter().map(str::to_string).collect(),
            })
        }
    }

    /// Clear the named check. Unknown names are rejected.
    pub fn unset(&mut self, name: &str) -> Result<(), String> {
        match name {
            "reviewedForms" => self.reviewed_forms = false,
            "allInfoCorrect" => self.all_info_correct = false,
            "authorizeSubmission" => self.authorize_submission = false,
            other => return Err(format!("unknown approval check {other:?}")),
        }
        Ok(())
    }
}
