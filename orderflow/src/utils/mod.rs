//! Shared utilities: timestamps and identifier generation.

pub mod ids;
pub mod timestamps;

pub use ids::generate_uuid;
pub use timestamps::{days_ago, now_utc, Timestamp};
