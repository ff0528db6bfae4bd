//! Package descriptions.
//!
//! A [`Package`] is the declarative description of one native library or tool:
//! where its source lives, which backend builds it and with what arguments.
//! Packages are immutable once handed to the builder; per-pass variations are
//! derived copies.

mod types;

pub use types::*;
