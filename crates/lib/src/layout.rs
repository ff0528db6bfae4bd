//! Working tree layout.
//!
//! - `build/<package>/`: scratch extraction and build tree, reset every run
//! - `source/`: download cache keyed by filename, kept across runs
//! - `patches/<package>.patch`: optional patch applied right after extraction

use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkLayout {
  pub build_dir: PathBuf,
  pub source_dir: PathBuf,
  pub patch_dir: PathBuf,
}

impl WorkLayout {
  pub fn new(root: &Path) -> Self {
    Self {
      build_dir: root.join("build"),
      source_dir: root.join("source"),
      patch_dir: root.join("patches"),
    }
  }

  /// Canonical extraction path of a package.
  pub fn package_path(&self, package: &str) -> PathBuf {
    self.build_dir.join(package)
  }

  pub fn patch_path(&self, package: &str) -> PathBuf {
    self.patch_dir.join(format!("{}.patch", package))
  }

  pub fn archive_path(&self, filename: &str) -> PathBuf {
    self.source_dir.join(filename)
  }
}
