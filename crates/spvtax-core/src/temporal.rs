//! # Temporal Types: UTC Timestamps and Tax Years
//!
//! `Timestamp` is a UTC-only instant truncated to seconds; it stamps stage
//! completion records so a workflow log renders as `YYYY-MM-DDTHH:MM:SSZ`
//! regardless of the host timezone.
//!
//! `TaxYear` is the calendar year a filing covers.

use chrono::{DateTime, Datelike, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// A UTC-only timestamp, truncated to seconds precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Current UTC time, truncated to seconds.
    pub fn now() -> Self {
        Self(truncate_to_seconds(Utc::now()))
    }

    /// Render as ISO8601 with Z suffix (e.g. `2026-01-15T12:00:00Z`).
    pub fn to_iso8601(&self) -> String {
        self.0.format("%Y-%m-%dT%H:%M:%SZ").to_string()
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_iso8601())
    }
}

fn truncate_to_seconds(dt: DateTime<Utc>) -> DateTime<Utc> {
    dt.with_nanosecond(0).unwrap_or(dt)
}

/// The calendar year a filing reports on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TaxYear(i32);

impl TaxYear {
    /// Earliest accepted tax year.
    pub const MIN: i32 = 1900;
    /// Latest accepted tax year.
    pub const MAX: i32 = 2200;

    /// Construct a validated tax year.
    pub fn new(year: i32) -> Result<Self, CoreError> {
        if (Self::MIN..=Self::MAX).contains(&year) {
            Ok(Self(year))
        } else {
            Err(CoreError::TaxYearOutOfRange(year))
        }
    }

    /// The year of the current UTC date.
    pub fn current() -> Self {
        Self(Utc::now().year())
    }

    /// The numeric year.
    pub fn value(&self) -> i32 {
        self.0
    }
}

impl std::fmt::Display for TaxYear {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
