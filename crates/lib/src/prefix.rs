//! Install prefixes.
//!
//! Every run has two prefixes: the target prefix receives the (possibly
//! cross-compiled) artifacts, the host-tool prefix receives tools that must
//! execute on the build machine. Each has its own include/lib/pkgconfig trees
//! and its own ledger.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::consts::HOST_PREFIX_SUFFIX;
use crate::ledger::Ledger;

/// Which of the two prefixes an operation applies to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum PrefixRole {
  #[default]
  Target,
  HostTool,
}

impl PrefixRole {
  pub fn from_host_tool(for_host_tool: bool) -> Self {
    if for_host_tool { Self::HostTool } else { Self::Target }
  }

  pub fn is_host_tool(&self) -> bool {
    matches!(self, Self::HostTool)
  }
}

impl fmt::Display for PrefixRole {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Target => f.write_str("target"),
      Self::HostTool => f.write_str("host-tool"),
    }
  }
}

/// An install root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prefix {
  root: PathBuf,
  role: PrefixRole,
}

impl Prefix {
  pub fn new(root: impl Into<PathBuf>, role: PrefixRole) -> Self {
    Self {
      root: root.into(),
      role,
    }
  }

  /// Build both prefixes for a destination directory: the target prefix is
  /// the destination itself, the host-tool prefix sits next to it.
  ///
  /// Trailing separators are dropped first so that `vendor/` yields
  /// `vendor.builder` rather than a directory inside the target prefix.
  pub fn pair(dest_dir: &Path) -> (Self, Self) {
    let dest_dir: PathBuf = dest_dir.components().collect();
    let mut host_root = dest_dir.as_os_str().to_owned();
    host_root.push(HOST_PREFIX_SUFFIX);
    (
      Self::new(dest_dir, PrefixRole::Target),
      Self::new(PathBuf::from(host_root), PrefixRole::HostTool),
    )
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  pub fn role(&self) -> PrefixRole {
    self.role
  }

  pub fn bin_dir(&self) -> PathBuf {
    self.root.join("bin")
  }

  pub fn include_dir(&self) -> PathBuf {
    self.root.join("include")
  }

  pub fn lib_dir(&self) -> PathBuf {
    self.root.join("lib")
  }

  pub fn pkgconfig_dir(&self) -> PathBuf {
    self.lib_dir().join("pkgconfig")
  }

  pub fn ledger(&self) -> Ledger {
    Ledger::for_prefix(&self.root)
  }
}
