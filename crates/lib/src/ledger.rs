//! Installation ledger.
//!
//! One marker file per installed package under `<prefix>/var/lib/cibuild/`.
//! A marker is written only after a package installed successfully and is
//! never removed here; deleting the prefix is the way to force a rebuild.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::consts::{APP_NAME, LEDGER_MARKER_CONTENT};
use crate::package::is_single_component;

/// Marker store for one prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ledger {
  dir: PathBuf,
}

impl Ledger {
  pub fn for_prefix(prefix_root: &Path) -> Self {
    Self {
      dir: prefix_root.join("var").join("lib").join(APP_NAME),
    }
  }

  pub fn dir(&self) -> &Path {
    &self.dir
  }

  pub fn marker_path(&self, package: &str) -> PathBuf {
    self.dir.join(package)
  }

  pub fn is_installed(&self, package: &str) -> bool {
    is_single_component(package) && self.marker_path(package).is_file()
  }

  pub fn mark_installed(&self, package: &str) -> io::Result<()> {
    if !is_single_component(package) {
      return Err(io::Error::new(
        io::ErrorKind::InvalidInput,
        format!("invalid ledger entry {:?}", package),
      ));
    }
    fs::create_dir_all(&self.dir)?;
    let marker = self.marker_path(package);
    fs::write(&marker, LEDGER_MARKER_CONTENT)?;
    debug!(marker = %marker.display(), "ledger marker written");
    Ok(())
  }

  /// Names of all packages recorded as installed, sorted.
  pub fn installed(&self) -> io::Result<Vec<String>> {
    let entries = match fs::read_dir(&self.dir) {
      Ok(entries) => entries,
      Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
      Err(e) => return Err(e),
    };

    let mut names = Vec::new();
    for entry in entries {
      let entry = entry?;
      if entry.file_type()?.is_file() {
        names.push(entry.file_name().to_string_lossy().into_owned());
      }
    }
    names.sort();
    Ok(names)
  }
}
