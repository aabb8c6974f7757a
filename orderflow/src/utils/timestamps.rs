//! Timestamp utilities.
//!
//! All persisted timestamps in orderflow are UTC. Records carry
//! `chrono::DateTime<Utc>` and serialize through serde as RFC 3339.

use chrono::{DateTime, Duration, Utc};

/// Timestamp type used across the crate.
pub type Timestamp = DateTime<Utc>;

/// Returns the current UTC timestamp.
#[must_use]
pub fn now_utc() -> Timestamp {
    Utc::now()
}

/// Returns the UTC timestamp `days` days before now.
///
/// Used to compute dead-letter cleanup cutoffs.
#[must_use]
pub fn days_ago(days: i64) -> Timestamp {
    Utc::now() - Duration::days(days)
}
