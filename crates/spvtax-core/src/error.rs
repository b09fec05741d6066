//! # Error Types
//!
//! Validation failures for the foundational types. Workflow and engine
//! errors live in their own crates and never flow back down here.

use thiserror::Error;

/// Error raised when a foundational value fails validation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// An identifier was empty or contained whitespace.
    #[error("invalid {kind} identifier {value:?}: {reason}")]
    InvalidIdentifier {
        /// Identifier namespace (e.g. "spv", "investor").
        kind: &'static str,
        /// The rejected raw value.
        value: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// A tax year outside the supported range.
    #[error("tax year {0} is outside the supported range {min}..={max}", min = crate::temporal::TaxYear::MIN, max = crate::temporal::TaxYear::MAX)]
    TaxYearOutOfRange(i32),
}
