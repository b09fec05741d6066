//! # Identifier Newtypes
//!
//! Source-system identifiers (`spv-001`, `inv-100`, `form-1`) are opaque
//! strings; each namespace gets its own type so they cannot be confused.
//! Stage runs are identified by a random UUID.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CoreError;

/// Identifier of a source SPV entity. A filing is keyed by the SPV it was
/// loaded from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SpvId(String);

/// Identifier of an investor within a filing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InvestorId(String);

/// Identifier of a tax form within a filing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FormId(String);

/// Identifier of a single stage execution, used to correlate log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub Uuid);

fn validate(kind: &'static str, raw: String) -> Result<String, CoreError> {
    if raw.is_empty() {
        return Err(CoreError::InvalidIdentifier {
            kind,
            value: raw,
            reason: "must not be empty",
        });
    }
    if raw.chars().any(char::is_whitespace) {
        return Err(CoreError::InvalidIdentifier {
            kind,
            value: raw,
            reason: "must not contain whitespace",
        });
    }
    Ok(raw)
}

macro_rules! string_id {
    ($ty:ident, $kind:literal) => {
        impl $ty {
            /// Construct a validated identifier.
            pub fn new(raw: impl Into<String>) -> Result<Self, CoreError> {
                validate($kind, raw.into()).map(Self)
            }

            /// Borrow the raw identifier string.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.pad(&self.0)
            }
        }

        impl std::str::FromStr for $ty {
            type Err = CoreError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }
    };
}

string_id!(SpvId, "spv");
string_id!(InvestorId, "investor");
string_id!(FormId, "form");

impl RunId {
    /// Generate a new random run identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "run:{}", self.0)
    }
}
