use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::package::Package;
use crate::platform::os::Os;
use crate::prefix::PrefixRole;

/// System packages installed before building on Linux CI images.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Prerequisites {
  /// Installer command, e.g. `["yum", "-y", "install"]`.
  pub command: Vec<String>,
  /// Package names appended to `command`.
  #[serde(default)]
  pub packages: Vec<String>,
  /// Host tools made available by the installed packages.
  #[serde(default)]
  pub provides: Vec<String>,
}

impl Prerequisites {
  pub fn command_line(&self) -> Vec<String> {
    self.command.iter().chain(self.packages.iter()).cloned().collect()
  }
}

/// Settings that only apply when building on one operating system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlatformSettings {
  /// Host tools the build machine already has; they are never built.
  #[serde(default)]
  pub provides: Vec<String>,
  /// Toolchain runtime libraries copied into the prefix's `bin/` before
  /// packaging, from the directory holding `runtime_provider`.
  #[serde(default)]
  pub bundled_runtime: Vec<String>,
  #[serde(default = "default_runtime_provider")]
  pub runtime_provider: String,
}

fn default_runtime_provider() -> String {
  "gcc".to_string()
}

/// Ordered list of packages to build plus the final artifact.
///
/// ```json
/// {
///   "host_tools": ["gperf", "nasm"],
///   "packages": [
///     { "name": "gperf", "source_url": "http://ftp.gnu.org/pub/gnu/gperf/gperf-3.1.tar.gz" },
///     { "name": "lame", "source_url": "...", "fflags": "--enable-libmp3lame" }
///   ],
///   "artifact": { "name": "ffmpeg", "source_url": "...", "build_arguments": ["--disable-doc"] },
///   "gpl_arguments": ["--enable-gpl"],
///   "platforms": {
///     "windows": { "provides": ["gperf", "nasm"], "bundled_runtime": ["zlib1.dll"] }
///   }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
  /// Dependencies in build order.
  pub packages: Vec<Package>,
  /// Built last, with the collected `fflags` of every enabled package.
  pub artifact: Package,
  /// Appended to the artifact's arguments when GPL packages are enabled.
  #[serde(default)]
  pub gpl_arguments: Vec<String>,
  /// Appended to the artifact's arguments when GPL packages are disabled.
  #[serde(default)]
  pub lgpl_arguments: Vec<String>,
  /// Packages installed into the host-tool prefix.
  #[serde(default)]
  pub host_tools: Vec<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub prerequisites: Option<Prerequisites>,
  #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
  pub platforms: BTreeMap<Os, PlatformSettings>,
}

/// How a manifest is resolved into a build plan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlanOptions {
  /// Drop GPL packages and use `lgpl_arguments`.
  pub disable_gpl: bool,
  /// The prerequisites were installed, so the host tools they provide are
  /// not built.
  pub prerequisites_installed: bool,
  /// Build host, selecting the matching `platforms` entry.
  pub os: Option<Os>,
}

/// One package scheduled for a prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanEntry {
  pub package: Package,
  pub role: PrefixRole,
}

/// Resolved, ordered build plan. The final artifact is the last entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildPlan {
  pub entries: Vec<PlanEntry>,
}

impl BuildPlan {
  pub fn iter(&self) -> impl Iterator<Item = &PlanEntry> {
    self.entries.iter()
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn artifact(&self) -> Option<&Package> {
    self.entries.last().map(|entry| &entry.package)
  }
}
