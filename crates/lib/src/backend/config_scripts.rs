//! `config.guess` / `config.sub` refresh.
//!
//! Tarballs ship copies of these scripts that predate newer host triples and
//! make `configure` fail to detect the machine. Before configuring, every copy
//! in the package tree is replaced with the canonical upstream script, which
//! is fetched once into the source cache and reused from there.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use crate::consts::CONFIG_SCRIPTS_URL;
use crate::error::BuildError;
use crate::execute::Fetcher;

pub const CONFIG_SCRIPT_NAMES: [&str; 2] = ["config.guess", "config.sub"];

/// Cache of canonical config scripts, keyed by filename.
pub struct ConfigScripts<F> {
  cache_dir: PathBuf,
  fetcher: F,
}

impl<F: Fetcher> ConfigScripts<F> {
  pub fn new(cache_dir: impl Into<PathBuf>, fetcher: F) -> Self {
    Self {
      cache_dir: cache_dir.into(),
      fetcher,
    }
  }

  /// Path of the cached script, downloading it on first use.
  pub async fn cached(&self, name: &str) -> Result<PathBuf, BuildError> {
    let path = self.cache_dir.join(name);
    if !path.is_file() {
      fs::create_dir_all(&self.cache_dir)?;
      let url = format!("{}{}", CONFIG_SCRIPTS_URL, name);
      self.fetcher.fetch(&url, &path).await?;
    }
    Ok(path)
  }

  /// Replace every config script below `root`; returns how many were replaced.
  pub async fn refresh_tree(&self, root: &Path) -> Result<usize, BuildError> {
    let mut stale = Vec::new();
    for entry in WalkDir::new(root) {
      let entry = entry.map_err(std::io::Error::from)?;
      let is_script = CONFIG_SCRIPT_NAMES
        .iter()
        .any(|name| entry.file_name().to_str() == Some(*name));
      if is_script && entry.file_type().is_file() {
        stale.push(entry.into_path());
      }
    }

    for script in &stale {
      let name = script
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or_default();
      let cached = self.cached(name).await?;
      fs::copy(&cached, script)?;
      make_executable(script)?;
      debug!(script = %script.display(), "refreshed config script");
    }

    Ok(stale.len())
  }
}

#[cfg(unix)]
fn make_executable(path: &Path) -> std::io::Result<()> {
  use std::os::unix::fs::PermissionsExt;
  fs::set_permissions(path, fs::Permissions::from_mode(0o755))
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> std::io::Result<()> {
  Ok(())
}
