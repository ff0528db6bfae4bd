//! Package manifests.
//!
//! A manifest lists the packages of one dependency tree in build order, the
//! final artifact, and the license-dependent arguments of that artifact. It is
//! loaded from JSON and resolved into a [`BuildPlan`] for one license mode.

mod types;

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::error::BuildError;
use crate::platform::os::Os;
use crate::prefix::PrefixRole;

pub use types::*;

#[derive(Debug, Error)]
pub enum ManifestError {
  #[error("failed to read manifest {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to parse manifest: {0}")]
  Parse(#[from] serde_json::Error),

  #[error("duplicate package name: {0}")]
  DuplicatePackage(String),

  #[error("host tool {0} is not a listed package")]
  UnknownHostTool(String),

  #[error(transparent)]
  Package(#[from] BuildError),
}

impl Manifest {
  /// Read and validate a manifest file.
  pub fn load(path: &Path) -> Result<Self, ManifestError> {
    let content = std::fs::read_to_string(path).map_err(|source| ManifestError::Read {
      path: path.to_path_buf(),
      source,
    })?;
    let manifest = Self::from_json(&content)?;
    debug!(path = %path.display(), packages = manifest.packages.len(), "loaded manifest");
    Ok(manifest)
  }

  pub fn from_json(content: &str) -> Result<Self, ManifestError> {
    let manifest: Self = serde_json::from_str(content)?;
    manifest.validate()?;
    Ok(manifest)
  }

  /// Names are unique (the artifact included), every package is valid,
  /// every host tool is one of the listed packages and platforms only
  /// provide host tools.
  pub fn validate(&self) -> Result<(), ManifestError> {
    let mut seen = HashSet::new();
    for package in self.packages.iter().chain(std::iter::once(&self.artifact)) {
      if !seen.insert(package.name.as_str()) {
        return Err(ManifestError::DuplicatePackage(package.name.clone()));
      }
      package.validate()?;
    }
    if let Some(tool) = self.host_tools.iter().find(|tool| !seen.contains(tool.as_str())) {
      return Err(ManifestError::UnknownHostTool(tool.clone()));
    }
    let mut provided = self.platforms.values().flat_map(|settings| settings.provides.iter());
    if let Some(tool) = provided.find(|tool| !self.is_host_tool(tool)) {
      return Err(ManifestError::UnknownHostTool(tool.clone()));
    }
    Ok(())
  }

  pub fn platform(&self, os: Os) -> Option<&PlatformSettings> {
    self.platforms.get(&os)
  }

  pub fn is_host_tool(&self, name: &str) -> bool {
    self.host_tools.iter().any(|tool| tool == name)
  }

  fn provided_by_prerequisites(&self, name: &str) -> bool {
    self
      .prerequisites
      .as_ref()
      .is_some_and(|prereq| prereq.provides.iter().any(|tool| tool == name))
  }

  /// Resolve the ordered build plan.
  ///
  /// The artifact's arguments are its own, then the license-mode arguments,
  /// then the `fflags` of every package that stays in the plan.
  pub fn plan(&self, options: PlanOptions) -> BuildPlan {
    let license_arguments = if options.disable_gpl {
      &self.lgpl_arguments
    } else {
      &self.gpl_arguments
    };
    let mut artifact_arguments: Vec<String> = self
      .artifact
      .build_arguments
      .iter()
      .chain(license_arguments)
      .cloned()
      .collect();

    let mut entries = Vec::with_capacity(self.packages.len() + 1);
    for package in &self.packages {
      if options.disable_gpl && package.is_gpl() {
        debug!(package = %package.name, "GPL disabled, skipping");
        continue;
      }
      let host_tool = self.is_host_tool(&package.name);
      if host_tool && options.prerequisites_installed && self.provided_by_prerequisites(&package.name) {
        debug!(package = %package.name, "provided by prerequisites, skipping");
        continue;
      }
      let provided_by_host = options
        .os
        .and_then(|os| self.platform(os))
        .is_some_and(|settings| settings.provides.contains(&package.name));
      if host_tool && provided_by_host {
        debug!(package = %package.name, "available on the build host, skipping");
        continue;
      }
      if !package.fflags.is_empty() {
        artifact_arguments.push(package.fflags.clone());
      }
      entries.push(PlanEntry {
        package: package.clone(),
        role: PrefixRole::from_host_tool(host_tool),
      });
    }

    entries.push(PlanEntry {
      package: self.artifact.with_build_arguments(artifact_arguments),
      role: PrefixRole::Target,
    });
    BuildPlan { entries }
  }
}
