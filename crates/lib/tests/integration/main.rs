//! End-to-end tests of the build pipeline with fake tools and downloads.

mod builder_tests;
mod common;
