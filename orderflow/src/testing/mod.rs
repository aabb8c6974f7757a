//! Test doubles and fixtures shared across the crate's tests.
//!
//! Exposed as a normal module so downstream crates can reuse the mocks in
//! their own integration tests.

pub mod fixtures;
pub mod mocks;
