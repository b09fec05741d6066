//! # spvtax-core: Foundational Types for the SPV Tax Workflow
//!
//! Defines the primitives every other crate in the workspace builds on.
//! It depends on nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype wrappers for identifiers.** `SpvId`, `InvestorId`, `FormId`
//!    and `RunId` are distinct types with validated constructors. You cannot
//!    pass an investor identifier where a form identifier is expected.
//!
//! 2. **UTC-only timestamps.** `Timestamp` is always UTC with seconds
//!    precision, so completion logs render identically everywhere.
//!
//! 3. **Validated tax years.** `TaxYear` rejects values outside the range a
//!    filing can plausibly cover.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `spvtax-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod error;
pub mod identity;
pub mod temporal;

pub use error::CoreError;
pub use identity::{FormId, InvestorId, RunId, SpvId};
pub use temporal::{TaxYear, Timestamp};
