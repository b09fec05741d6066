//! # Status Lattices
//!
//! Tax forms and investors each carry a status drawn from a fixed, totally
//! ordered progression:
//!
//! ```text
//! FormStatus:      Pending < Generated < Distributed < Approved < Submitted
//! InvestorStatus:  Pending < Generated < Distributed < Approved
//! ```
//!
//! Investor status has no `Submitted` terminal; it saturates at `Approved`.
//!
//! Statuses only move forward. [`advance_status`] rejects any target that is
//! not strictly ahead of the current value; [`raise_status`] additionally
//! tolerates a no-op when the record already sits at the target.

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ─── Lattice trait ───────────────────────────────────────────────────

/// A linearly ordered status enumeration.
///
/// The derived `Ord` on each implementor is the lattice order.
pub trait StatusLattice: Copy + Ord + std::fmt::Debug + std::fmt::Display {
    /// Lattice name used in error messages ("form", "investor").
    const LATTICE: &'static str;

    /// Least element.
    const BOTTOM: Self;

    /// Greatest element.
    const TOP: Self;

    /// All values in lattice order.
    fn all() -> &'static [Self];
}

/// A record whose progress is measured by a status lattice.
pub trait HasStatus {
    /// The lattice this record's status is drawn from.
    type Status: StatusLattice;

    /// The record's current status.
    fn status(&self) -> Self::Status;
}

// ─── Form status ─────────────────────────────────────────────────────

/// Status of a tax form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormStatus {
    /// Awaiting processing.
    Pending,
    /// Data processed and the form rendered.
    Generated,
    /// Sent to investors.
    Distributed,
    /// Signed off for filing.
    Approved,
    /// E-filed with the tax authority.
    Submitted,
}

impl StatusLattice for FormStatus {
    const LATTICE: &'static str = "form";
    const BOTTOM: Self = Self::Pending;
    const TOP: Self = Self::Submitted;

    fn all() -> &'static [Self] {
        &[
            Self::Pending,
            Self::Generated,
            Self::Distributed,
            Self::Approved,
            Self::Submitted,
        ]
    }
}

impl std::fmt::Display for FormStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Generated => "generated",
            Self::Distributed => "distributed",
            Self::Approved => "approved",
            Self::Submitted => "submitted",
        };
        f.write_str(s)
    }
}

// ─── Investor status ─────────────────────────────────────────────────

/// Status of an investor's share form (K-1) from the investor's side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvestorStatus {
    /// Awaiting processing.
    Pending,
    /// Share form generated.
    Generated,
    /// Share form delivered to the investor.
    Distributed,
    /// Filing approved; terminal for investors.
    Approved,
}

impl StatusLattice for InvestorStatus {
    const LATTICE: &'static str = "investor";
    const BOTTOM: Self = Self::Pending;
    const TOP: Self = Self::Approved;

    fn all() -> &'static [Self] {
        &[
            Self::Pending,
            Self::Generated,
            Self::Distributed,
            Self::Approved,
        ]
    }
}

impl std::fmt::Display for InvestorStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Generated => "generated",
            Self::Distributed => "distributed",
            Self::Approved => "approved",
        };
        f.write_str(s)
    }
}

// ─── Errors ──────────────────────────────────────────────────────────

/// A rejected status change.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StatusError {
    /// The target is not strictly ahead of the current status.
    #[error("invalid {lattice} status transition for {record}: {from} -> {to}")]
    InvalidTransition {
        /// Lattice name.
        lattice: &'static str,
        /// Identifier of the record being advanced.
        record: String,
        /// Current status.
        from: String,
        /// Rejected target status.
        to: String,
    },
}

// ─── Operations ──────────────────────────────────────────────────────

/// Move `current` to `target`, which must be strictly ahead in lattice order.
pub fn advance_status<S: StatusLattice>(
    record: &str,
    current: &mut S,
    target: S,
) -> Result<(), StatusError> {
    if target <= *current {
        return Err(invalid(record, *current, target));
    }
    *current = target;
    Ok(())
}

/// Move `current` up to `target` unless it is already there.
///
/// Returns whether the status changed. A target behind the current status
/// is still a regression and is rejected.
pub fn raise_status<S: StatusLattice>(
    record: &str,
    current: &mut S,
    target: S,
) -> Result<bool, StatusError> {
    if target == *current {
        return Ok(false);
    }
    advance_status(record, current, target).map(|()| true)
}

/// Whether every record has reached `status` or beyond.
///
/// An empty collection is vacuously complete: a filing with no investors
/// satisfies every investor-status threshold.
pub fn all_at_or_beyond<'a, R, I>(records: I, status: R::Status) -> bool
where
    R: HasStatus + 'a,
    I: IntoIterator<Item = &'a R>,
{
    records.into_iter().all(|r| r.status() >= status)
}

fn invalid<S: StatusLattice>(record: &str, from: S, to: S) -> StatusError {
    StatusError::InvalidTransition {
        lattice: S::LATTICE,
        record: record.to_string(),
        from: from.to_string(),
        to: to.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    struct Rec(FormStatus);

    impl HasStatus for Rec {
        type Status = FormStatus;
        fn status(&self) -> FormStatus {
            self.0
        }
    }

    #[test]
    fn test_lattice_order() {
        assert!(FormStatus::Pending < FormStatus::Generated);
        assert!(FormStatus::Approved < FormStatus::Submitted);
        assert!(InvestorStatus::Distributed < InvestorStatus::Approved);
        assert_eq!(FormStatus::all().len(), 5);
        assert_eq!(InvestorStatus::all().len(), 4);
        assert_eq!(InvestorStatus::TOP, InvestorStatus::Approved);
    }

    #[test]
    fn test_advance_forward_skips_allowed() {
        let mut s = FormStatus::Pending;
        advance_status("form-1", &mut s, FormStatus::Distributed).unwrap();
        assert_eq!(s, FormStatus::Distributed);
    }

    #[test]
    fn test_submitted_to_generated_rejected() {
        let mut s = FormStatus::Submitted;
        let err = advance_status("form-1", &mut s, FormStatus::Generated).unwrap_err();
        assert_eq!(
            err,
            StatusError::InvalidTransition {
                lattice: "form",
                record: "form-1".to_string(),
                from: "submitted".to_string(),
                to: "generated".to_string(),
            }
        );
        assert_eq!(s, FormStatus::Submitted);
    }

    #[test]
    fn test_advance_to_same_status_rejected() {
        let mut s = InvestorStatus::Generated;
        assert!(advance_status("inv-1", &mut s, InvestorStatus::Generated).is_err());
    }

    #[test]
    fn test_raise_tolerates_equal_target() {
        let mut s = FormStatus::Generated;
        assert_eq!(raise_status("f", &mut s, FormStatus::Generated), Ok(false));
        assert_eq!(raise_status("f", &mut s, FormStatus::Approved), Ok(true));
        assert!(raise_status("f", &mut s, FormStatus::Generated).is_err());
        assert_eq!(s, FormStatus::Approved);
    }

    #[test]
    fn test_all_at_or_beyond_empty_is_vacuously_true() {
        let empty: Vec<Rec> = Vec::new();
        for s in FormStatus::all() {
            assert!(all_at_or_beyond(&empty, *s));
        }
    }

    #[test]
    fn test_all_at_or_beyond_mixed() {
        let recs = vec![Rec(FormStatus::Approved), Rec(FormStatus::Generated)];
        assert!(all_at_or_beyond(&recs, FormStatus::Generated));
        assert!(!all_at_or_beyond(&recs, FormStatus::Distributed));
    }

    #[test]
    fn test_status_serde_is_snake_case() {
        let json = serde_json::to_string(&FormStatus::Submitted).unwrap();
        assert_eq!(json, "\"submitted\"");
    }

    fn form_status() -> impl Strategy<Value = FormStatus> {
        prop::sample::select(FormStatus::all().to_vec())
    }

    proptest! {
        #[test]
        fn test_advance_succeeds_iff_strictly_ahead(from in form_status(), to in form_status()) {
            let mut s = from;
            let result = advance_status("form", &mut s, to);
            prop_assert_eq!(result.is_ok(), to > from);
            prop_assert_eq!(s, if to > from { to } else { from });
        }
    }
}
