use std::fmt;
use std::path::{Component, Path};

use serde::{Deserialize, Serialize};

use crate::error::BuildError;

/// Build description system used by a package.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildSystem {
  /// `configure` + `make`
  #[default]
  Autoconf,
  /// `cmake` with the Unix Makefiles generator
  Cmake,
  /// `meson setup` + `ninja`
  Meson,
}

impl BuildSystem {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Autoconf => "autoconf",
      Self::Cmake => "cmake",
      Self::Meson => "meson",
    }
  }
}

impl fmt::Display for BuildSystem {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// License classification of a package.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum License {
  /// LGPL or more permissive.
  #[default]
  Lgpl,
  /// GPL; excluded when restrictive licenses are disabled.
  Gpl,
}

/// Declarative description of one package to build from source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Package {
  pub name: String,
  pub source_url: String,
  /// Cache filename; defaults to the last segment of `source_url`.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub source_filename: Option<String>,
  #[serde(default)]
  pub build_system: BuildSystem,
  #[serde(default)]
  pub build_arguments: Vec<String>,
  #[serde(default = "default_build_dir")]
  pub build_dir: String,
  #[serde(default)]
  pub source_dir: String,
  #[serde(default = "default_true")]
  pub build_parallel: bool,
  /// Documentation only; build order is given by the caller.
  #[serde(default)]
  pub requires: Vec<String>,
  /// Flag added to the final artifact's arguments when this package is built.
  #[serde(default)]
  pub fflags: String,
  #[serde(default)]
  pub license: License,
  #[serde(default = "default_strip_components")]
  pub source_strip_components: u8,
}

fn default_build_dir() -> String {
  "build".to_string()
}

fn default_true() -> bool {
  true
}

fn default_strip_components() -> u8 {
  1
}

impl Package {
  /// Create an autoconf package with default settings.
  pub fn new(name: impl Into<String>, source_url: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      source_url: source_url.into(),
      source_filename: None,
      build_system: BuildSystem::default(),
      build_arguments: Vec::new(),
      build_dir: default_build_dir(),
      source_dir: String::new(),
      build_parallel: true,
      requires: Vec::new(),
      fflags: String::new(),
      license: License::default(),
      source_strip_components: default_strip_components(),
    }
  }

  pub fn build_system(mut self, build_system: BuildSystem) -> Self {
    self.build_system = build_system;
    self
  }

  pub fn source_filename(mut self, filename: impl Into<String>) -> Self {
    self.source_filename = Some(filename.into());
    self
  }

  pub fn source_dir(mut self, dir: impl Into<String>) -> Self {
    self.source_dir = dir.into();
    self
  }

  pub fn build_parallel(mut self, parallel: bool) -> Self {
    self.build_parallel = parallel;
    self
  }

  pub fn fflags(mut self, fflags: impl Into<String>) -> Self {
    self.fflags = fflags.into();
    self
  }

  pub fn license(mut self, license: License) -> Self {
    self.license = license;
    self
  }

  pub fn strip_components(mut self, count: u8) -> Self {
    self.source_strip_components = count;
    self
  }

  pub fn requires<I, S>(mut self, names: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.requires = names.into_iter().map(Into::into).collect();
    self
  }

  /// Derived copy with a different build directory.
  pub fn with_build_dir(&self, build_dir: impl Into<String>) -> Self {
    Self {
      build_dir: build_dir.into(),
      ..self.clone()
    }
  }

  /// Derived copy with different build arguments.
  pub fn with_build_arguments<I, S>(&self, arguments: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    Self {
      build_arguments: arguments.into_iter().map(Into::into).collect(),
      ..self.clone()
    }
  }

  /// Filename of the source archive in the download cache.
  pub fn archive_filename(&self) -> &str {
    match self.source_filename.as_deref() {
      Some(name) if !name.is_empty() => name,
      _ => self.source_url.rsplit('/').next().unwrap_or(&self.source_url),
    }
  }

  pub fn is_gpl(&self) -> bool {
    self.license == License::Gpl
  }

  /// Check the invariants that must hold before anything is run for this package.
  pub fn validate(&self) -> Result<(), BuildError> {
    if !is_single_component(&self.name) {
      return Err(BuildError::invalid_package(
        &self.name,
        "name must be a single path component",
      ));
    }
    if self.source_strip_components > 1 {
      return Err(BuildError::invalid_package(
        &self.name,
        "source_strip_components must be 0 or 1",
      ));
    }
    if !is_single_component(self.archive_filename()) {
      return Err(BuildError::invalid_package(
        &self.name,
        format!("invalid archive filename {:?}", self.archive_filename()),
      ));
    }
    if self.build_system != BuildSystem::Autoconf {
      let synthesized = ["--prefix", "--libdir"];
      if let Some(arg) = self
        .build_arguments
        .iter()
        .find(|arg| synthesized.iter().any(|flag| arg.starts_with(flag)))
      {
        return Err(BuildError::invalid_package(
          &self.name,
          format!("{} is set by the {} backend, not by build arguments", arg, self.build_system),
        ));
      }
    }
    Ok(())
  }
}

/// Names end up joined onto `build/`, `patches/` and the ledger directory,
/// so they must never resolve outside of them.
pub(crate) fn is_single_component(name: &str) -> bool {
  if name.contains(['/', '\\']) {
    return false;
  }
  let mut components = Path::new(name).components();
  matches!(
    (components.next(), components.next()),
    (Some(Component::Normal(_)), None)
  )
}
