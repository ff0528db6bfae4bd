//! Error types for the build pipeline.
//!
//! Every failure is fatal to the run. The variants only distinguish where the
//! failure came from so that callers can report it precisely.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while staging or building packages.
#[derive(Debug, Error)]
pub enum BuildError {
  /// A package description violates one of its invariants.
  #[error("invalid package {package}: {message}")]
  InvalidPackage { package: String, message: String },

  /// A strip-1 archive does not have exactly one top-level directory.
  #[error("cannot strip path components of {archive:?}, found prefixes {prefixes:?}")]
  AmbiguousArchivePrefix { archive: PathBuf, prefixes: Vec<String> },

  /// The archive compression could not be recognized.
  #[error("unsupported archive format: {0:?}")]
  UnsupportedArchive(PathBuf),

  /// The host operating system or architecture is not supported.
  #[error("unsupported platform: {os}/{arch}")]
  UnsupportedPlatform { os: &'static str, arch: &'static str },

  /// A required environment variable is not set.
  #[error("environment variable {0} is not set")]
  MissingEnv(&'static str),

  /// Download failed.
  #[error("fetch failed for {url}: {message}")]
  FetchFailed { url: String, message: String },

  /// External command exited unsuccessfully.
  #[error("command failed with exit code {code:?}: {cmd}")]
  CmdFailed { cmd: String, code: Option<i32> },

  /// External command could not be started.
  #[error("failed to spawn {program}: {source}")]
  Spawn {
    program: String,
    #[source]
    source: std::io::Error,
  },

  /// A program needed to locate toolchain files is not on `PATH`.
  #[error("{program} not found on PATH: {source}")]
  ToolNotFound {
    program: String,
    #[source]
    source: which::Error,
  },

  /// I/O error during staging or building.
  #[error("io error: {0}")]
  Io(#[from] std::io::Error),
}

impl BuildError {
  pub(crate) fn invalid_package(package: &str, message: impl Into<String>) -> Self {
    Self::InvalidPackage {
      package: package.to_string(),
      message: message.into(),
    }
  }
}
