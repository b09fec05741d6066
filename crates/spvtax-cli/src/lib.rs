//! # spvtax-cli
//!
//! Command-line driver for the SPV tax workflow.
//!
//! ## Subcommands
//!
//! - `entities`: list the SPVs available for filing
//! - `run`: drive one SPV's filing through every stage with the mock
//!   collaborators, printing progress as it goes
//! - `stages`: print the stage table and each stage's requirements
//!
//! Handlers return the process exit code; argument parsing lives in
//! `main.rs`.

pub mod console;
pub mod entities;
pub mod run;
pub mod stages;
