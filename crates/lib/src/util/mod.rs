//! Shared utilities.
//!
//! CI log grouping and test helpers.

pub mod group;

#[cfg(test)]
pub mod testutil;
