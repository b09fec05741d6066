//! # Filing Model
//!
//! A [`Filing`] is one workflow run's aggregate: the SPV being filed for,
//! its tax forms, and its investors. The workflow controller owns exactly
//! one filing at a time; stage operations receive a copy and hand back a
//! successor, which the controller commits wholesale.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use spvtax_core::{FormId, InvestorId, SpvId, TaxYear};

use crate::status::{
    advance_status, raise_status, FormStatus, HasStatus, InvestorStatus, StatusError,
};

// ─── Tax forms ───────────────────────────────────────────────────────

/// The kind of tax form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FormKind {
    /// Entity-level partnership return.
    #[serde(rename = "1065")]
    PartnershipReturn,
    /// Per-investor share of income, deductions and credits.
    #[serde(rename = "K-1")]
    PartnerShare,
}

impl FormKind {
    /// Short form code used in download paths ("1065", "K-1").
    pub fn code(&self) -> &'static str {
        match self {
            Self::PartnershipReturn => "1065",
            Self::PartnerShare => "K-1",
        }
    }

    /// Human-readable form title.
    pub fn title(&self) -> &'static str {
        match self {
            Self::PartnershipReturn => "Form 1065 (Partnership Return)",
            Self::PartnerShare => "Schedule K-1 (Partner's Share)",
        }
    }
}

impl std::fmt::Display for FormKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// A tax form belonging to a filing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxForm {
    /// Form identifier.
    pub id: FormId,
    /// Form type.
    pub kind: FormKind,
    /// Current status.
    pub status: FormStatus,
    /// Where the rendered form can be fetched; set once generated.
    pub download_url: Option<String>,
}

impl TaxForm {
    /// A new form in `Pending` with no download reference.
    pub fn new(id: FormId, kind: FormKind) -> Self {
        Self {
            id,
            kind,
            status: FormStatus::Pending,
            download_url: None,
        }
    }

    /// Advance to a status strictly ahead of the current one.
    pub fn advance_status(&mut self, target: FormStatus) -> Result<(), StatusError> {
        advance_status(self.id.as_str(), &mut self.status, target)
    }

    /// Advance to `target` unless already there. Returns whether it changed.
    pub fn raise_status(&mut self, target: FormStatus) -> Result<bool, StatusError> {
        raise_status(self.id.as_str(), &mut self.status, target)
    }
}

impl HasStatus for TaxForm {
    type Status = FormStatus;

    fn status(&self) -> FormStatus {
        self.status
    }
}

// ─── Investors ───────────────────────────────────────────────────────

/// An investor in the SPV.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Investor {
    /// Investor identifier.
    pub id: InvestorId,
    /// Display name.
    pub name: String,
    /// Investor tax identifier (masked in the source system).
    pub tax_id: String,
    /// Contact address for form delivery.
    pub email: String,
    /// Current status.
    pub status: InvestorStatus,
}

impl Investor {
    /// A new investor in `Pending`.
    pub fn new(
        id: InvestorId,
        name: impl Into<String>,
        tax_id: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            tax_id: tax_id.into(),
            email: email.into(),
            status: InvestorStatus::Pending,
        }
    }

    /// Advance to a status strictly ahead of the current one.
    pub fn advance_status(&mut self, target: InvestorStatus) -> Result<(), StatusError> {
        advance_status(self.id.as_str(), &mut self.status, target)
    }

    /// Advance to `target` unless already there. Returns whether it changed.
    pub fn raise_status(&mut self, target: InvestorStatus) -> Result<bool, StatusError> {
        raise_status(self.id.as_str(), &mut self.status, target)
    }
}

impl HasStatus for Investor {
    type Status = InvestorStatus;

    fn status(&self) -> InvestorStatus {
        self.status
    }
}

// ─── Filing ──────────────────────────────────────────────────────────

/// Why a proposed successor filing cannot replace the current one.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SuccessorError {
    /// The successor describes a different SPV.
    #[error("successor filing is for {found}, expected {expected}")]
    FilingMismatch {
        /// SPV of the current filing.
        expected: SpvId,
        /// SPV of the proposed successor.
        found: SpvId,
    },

    /// A child record disappeared.
    #[error("successor filing dropped {kind} {id}")]
    MissingRecord {
        /// "form" or "investor".
        kind: &'static str,
        /// Identifier of the dropped record.
        id: String,
    },

    /// A child record moved backwards.
    #[error(transparent)]
    Regression(#[from] StatusError),
}

/// One SPV's tax filing for a tax year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filing {
    /// The SPV this filing belongs to.
    pub spv_id: SpvId,
    /// Year covered.
    pub tax_year: TaxYear,
    /// Legal name of the SPV.
    pub entity_name: String,
    /// Entity tax identifier (EIN).
    pub entity_tax_id: String,
    /// Forms, in source order.
    pub tax_forms: Vec<TaxForm>,
    /// Investors, in source order.
    pub investors: Vec<Investor>,
    /// E-file confirmation id; set by submission.
    pub confirmation_id: Option<String>,
}

impl Filing {
    /// Find a form by identifier.
    pub fn form(&self, id: &FormId) -> Option<&TaxForm> {
        self.tax_forms.iter().find(|f| &f.id == id)
    }

    /// Find an investor by identifier.
    pub fn investor(&self, id: &InvestorId) -> Option<&Investor> {
        self.investors.iter().find(|i| &i.id == id)
    }

    /// Strictly advance every form to `target`.
    pub fn advance_forms(&mut self, target: FormStatus) -> Result<(), StatusError> {
        self.tax_forms
            .iter_mut()
            .try_for_each(|f| f.advance_status(target))
    }

    /// Strictly advance every investor to `target`.
    pub fn advance_investors(&mut self, target: InvestorStatus) -> Result<(), StatusError> {
        self.investors
            .iter_mut()
            .try_for_each(|i| i.advance_status(target))
    }

    /// Check that `next` is a legitimate successor of this filing: same SPV,
    /// no dropped records, and no status regressions.
    pub fn check_successor(&self, next: &Filing) -> Result<(), SuccessorError> {
        if next.spv_id != self.spv_id {
            return Err(SuccessorError::FilingMismatch {
                expected: self.spv_id.clone(),
                found: next.spv_id.clone(),
            });
        }
        for form in &self.tax_forms {
            let successor = next.form(&form.id).ok_or_else(|| SuccessorError::MissingRecord {
                kind: "form",
                id: form.id.to_string(),
            })?;
            // Replaying the successor's status onto a copy of the old one
            // surfaces a regression as the usual transition error.
            let mut status = form.status;
            raise_status(form.id.as_str(), &mut status, successor.status)?;
        }
        for investor in &self.investors {
            let successor =
                next.investor(&investor.id)
                    .ok_or_else(|| SuccessorError::MissingRecord {
                        kind: "investor",
                        id: investor.id.to_string(),
                    })?;
            let mut status = investor.status;
            raise_status(investor.id.as_str(), &mut status, successor.status)?;
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn sample_filing(investors: usize) -> Filing {
        Filing {
            spv_id: SpvId::new("spv-001").unwrap(),
            tax_year: TaxYear::new(2025).unwrap(),
            entity_name: "Tech Ventures Fund I".to_string(),
            entity_tax_id: "XX-1234567".to_string(),
            tax_forms: vec![
                TaxForm::new(FormId::new("form-1").unwrap(), FormKind::PartnershipReturn),
                TaxForm::new(FormId::new("form-2").unwrap(), FormKind::PartnerShare),
            ],
            investors: (0..investors)
                .map(|i| {
                    Investor::new(
                        InvestorId::new(format!("inv-{}", 100 + i)).unwrap(),
                        format!("Investor {}", i + 1),
                        "XXX-XX-1234",
                        format!("investor{}@example.com", i + 1),
                    )
                })
                .collect(),
            confirmation_id: None,
        }
    }

    #[test]
    fn test_form_kind_codes_and_titles() {
        assert_eq!(FormKind::PartnershipReturn.code(), "1065");
        assert_eq!(FormKind::PartnerShare.to_string(), "K-1");
        assert_eq!(FormKind::PartnerShare.title(), "Schedule K-1 (Partner's Share)");
        let json = serde_json::to_string(&FormKind::PartnerShare).unwrap();
        assert_eq!(json, "\"K-1\"");
    }

    #[test]
    fn test_advance_forms_and_investors() {
        let mut f = sample_filing(2);
        f.advance_forms(FormStatus::Generated).unwrap();
        f.advance_investors(InvestorStatus::Generated).unwrap();
        assert!(f.tax_forms.iter().all(|t| t.status == FormStatus::Generated));
        assert!(f.investors.iter().all(|i| i.status == InvestorStatus::Generated));

        // A second identical advance is not strictly forward.
        assert!(f.advance_forms(FormStatus::Generated).is_err());
    }

    #[test]
    fn test_check_successor_accepts_forward_progress() {
        let before = sample_filing(2);
        let mut after = before.clone();
        after.advance_forms(FormStatus::Distributed).unwrap();
        assert_eq!(before.check_successor(&after), Ok(()));
        assert_eq!(before.check_successor(&before), Ok(()));
    }

    #[test]
    fn test_check_successor_rejects_regression() {
        let mut before = sample_filing(1);
        before.advance_forms(FormStatus::Approved).unwrap();
        let mut after = before.clone();
        after.tax_forms[0].status = FormStatus::Generated;
        assert!(matches!(
            before.check_successor(&after),
            Err(SuccessorError::Regression(StatusError::InvalidTransition { .. }))
        ));
    }

    #[test]
    fn test_check_successor_rejects_dropped_investor_and_other_spv() {
        let before = sample_filing(2);
        let mut dropped = before.clone();
        dropped.investors.pop();
        assert!(matches!(
            before.check_successor(&dropped),
            Err(SuccessorError::MissingRecord { kind: "investor", .. })
        ));

        let mut other = before.clone();
        other.spv_id = SpvId::new("spv-002").unwrap();
        assert!(matches!(
            before.check_successor(&other),
            Err(SuccessorError::FilingMismatch { .. })
        ));
    }
}
