//! cibuild-lib: build orchestration for native dependency trees.
//!
//! This crate drives source tarballs through extraction, patching and one of
//! three build backends, installing into a target prefix (and a separate
//! host-tool prefix when cross-compiling):
//! - `Package`: immutable description of one native library or tool
//! - `Builder`: sequences staging, environment derivation and backend runs
//! - `Ledger`: per-prefix markers that make the pipeline re-entrant
//! - `Manifest`: the ordered package list and the final artifact's arguments

pub mod backend;
pub mod builder;
pub mod config;
pub mod consts;
pub mod dist;
pub mod env;
pub mod error;
pub mod execute;
pub mod layout;
pub mod ledger;
pub mod manifest;
pub mod package;
pub mod platform;
pub mod prefix;
pub mod stage;
pub mod util;

pub use builder::Builder;
pub use error::BuildError;
pub use package::{BuildSystem, License, Package};
pub use prefix::{Prefix, PrefixRole};
