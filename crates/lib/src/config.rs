//! Builder configuration.
//!
//! Everything the builder needs to know about where it runs: the working root,
//! the destination prefix, the host platform and whether it runs inside CI.
//! [`BuilderConfig::from_env`] reads the process environment once; after that
//! the configuration is an explicit value threaded through the builder.

use std::path::{Path, PathBuf};

use crate::consts::vars;
use crate::error::BuildError;
use crate::platform::Platform;
use crate::platform::os::Os;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuilderConfig {
  /// Working root holding `build/`, `source/` and `patches/`.
  pub root: PathBuf,
  /// Target prefix; the host-tool prefix is derived from it.
  pub dest_dir: PathBuf,
  pub platform: Platform,
  /// Set when running inside the wheel-building CI (`CIBUILDWHEEL=1`).
  pub ci: bool,
}

impl BuilderConfig {
  pub fn new(root: impl Into<PathBuf>, dest_dir: impl Into<PathBuf>, platform: Platform) -> Self {
    Self {
      root: root.into(),
      dest_dir: dest_dir.into(),
      platform,
      ci: false,
    }
  }

  /// Detect the host platform and CI marker from the process environment.
  pub fn from_env(root: &Path, dest_dir: &Path) -> Result<Self, BuildError> {
    let platform = Platform::current().ok_or(BuildError::UnsupportedPlatform {
      os: std::env::consts::OS,
      arch: std::env::consts::ARCH,
    })?;
    let ci = std::env::var(vars::CI_MARKER).is_ok_and(|value| value == "1");
    Ok(Self {
      ci,
      ..Self::new(root, dest_dir, platform)
    })
  }

  pub fn with_ci(mut self, ci: bool) -> Self {
    self.ci = ci;
    self
  }

  pub fn os(&self) -> Os {
    self.platform.os
  }

  /// Whether prerequisite system packages should be installed before building.
  pub fn installs_prerequisites(&self) -> bool {
    self.ci && self.platform.os == Os::Linux
  }
}
