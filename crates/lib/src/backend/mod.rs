//! Build backend adapters.
//!
//! Each backend turns a package plus a derived environment into a fixed
//! sequence of external invocations run inside the package's build directory:
//!
//! - [`autoconf`]: `sh configure`, `make`, `make install`
//! - [`cmake`]: `cmake <source>`, `cmake --build .`, `cmake --install .`
//! - [`meson`]: `meson setup`, `ninja`, `ninja install`
//! - [`multipass`]: three cmake runs for the package whose shared library
//!   embeds two static high-bit-depth variants
//!
//! The first failing invocation aborts the package; partially built trees are
//! never resumed.

pub mod autoconf;
pub mod cmake;
pub mod config_scripts;
pub mod meson;
pub mod multipass;

use std::fs;
use std::path::{Path, PathBuf};

use crate::env::{self, BuildEnv};
use crate::error::BuildError;
use crate::execute::{CommandRunner, Invocation};
use crate::layout::WorkLayout;
use crate::package::Package;
use crate::platform::arch::Arch;
use crate::platform::os::Os;
use crate::platform::{Platform, mangle_path};
use crate::prefix::Prefix;

pub use config_scripts::ConfigScripts;

/// Everything an adapter needs besides the package itself.
pub struct BackendContext<'a, R> {
  pub platform: Platform,
  pub layout: &'a WorkLayout,
  pub prefix: &'a Prefix,
  /// Snapshot of the builder's environment; derived per package, never mutated.
  pub ambient: &'a BuildEnv,
  pub runner: &'a R,
}

/// Resolved directories of one package inside the scratch tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackagePaths {
  /// `build/<package>`
  pub root: PathBuf,
  /// `build/<package>/<source_dir>`
  pub source: PathBuf,
  /// `build/<package>/<build_dir>`
  pub build: PathBuf,
}

impl PackagePaths {
  pub fn resolve(layout: &WorkLayout, package: &Package) -> Self {
    let root = layout.package_path(&package.name);
    Self {
      source: join_relative(&root, &package.source_dir),
      build: join_relative(&root, &package.build_dir),
      root,
    }
  }
}

fn join_relative(root: &Path, relative: &str) -> PathBuf {
  match relative {
    "" | "." => root.to_path_buf(),
    _ => root.join(relative),
  }
}

impl<R: CommandRunner> BackendContext<'_, R> {
  pub fn os(&self) -> Os {
    self.platform.os
  }

  pub fn mangle(&self, path: &Path) -> String {
    mangle_path(self.platform.os, path)
  }

  /// Whether this build cross-compiles for arm64 on macOS.
  pub fn is_cross_arm64(&self) -> Result<bool, BuildError> {
    env::is_cross_arm64(self.platform.os, self.ambient, self.prefix.role())
  }

  pub fn derive_env(&self) -> Result<BuildEnv, BuildError> {
    env::derive_env(self.platform.os, self.ambient, self.prefix)
  }

  /// Run `invocations` in order inside `dir`, creating it first.
  pub async fn run_in(&self, dir: &Path, invocations: Vec<Invocation>) -> Result<(), BuildError> {
    fs::create_dir_all(dir)?;
    for invocation in invocations {
      self.runner.run(&invocation.cwd(dir)).await?;
    }
    Ok(())
  }
}

/// Parallelism arguments for make-style tools.
///
/// Builds stay serial when the package forbids parallelism or when the host
/// architecture is one CI emulates.
pub fn make_args(parallel: bool, host: Arch) -> Vec<String> {
  if parallel && !host.is_emulated() {
    vec!["-j".to_string()]
  } else {
    Vec::new()
  }
}
