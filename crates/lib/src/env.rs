//! Build environment derivation.
//!
//! A [`BuildEnv`] is an owned snapshot of environment variables. The builder
//! takes one snapshot of the process environment at startup and derives a
//! fresh copy per backend invocation, so the real process environment is
//! never modified.

use std::collections::BTreeMap;
use std::ffi::{OsStr, OsString};

use tracing::debug;

use crate::consts::{ARM64_ARCHFLAGS, vars};
use crate::error::BuildError;
use crate::platform::mangle_path;
use crate::platform::os::Os;
use crate::prefix::{Prefix, PrefixRole};

/// An owned set of environment variables handed to child processes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildEnv {
  vars: BTreeMap<String, String>,
  /// Variables that are not valid UTF-8, handed to children verbatim.
  raw: BTreeMap<OsString, OsString>,
}

impl BuildEnv {
  pub fn new() -> Self {
    Self::default()
  }

  /// Snapshot the current process environment. Variables that are not valid
  /// UTF-8 cannot be read through [`BuildEnv::get`] but still reach children.
  pub fn from_process() -> Self {
    Self::from_os_vars(std::env::vars_os())
  }

  pub(crate) fn from_os_vars(vars: impl IntoIterator<Item = (OsString, OsString)>) -> Self {
    let mut env = Self::new();
    for (key, value) in vars {
      if let (Some(name), Some(text)) = (key.to_str(), value.to_str()) {
        env.vars.insert(name.to_string(), text.to_string());
        continue;
      }
      debug!(name = %key.to_string_lossy(), "variable is not UTF-8, passing it through as is");
      env.raw.insert(key, value);
    }
    env
  }

  pub fn get(&self, name: &str) -> Option<&str> {
    self.vars.get(name).map(String::as_str)
  }

  pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
    let name = name.into();
    self.raw.remove(OsStr::new(&name));
    self.vars.insert(name, value.into());
  }

  /// Prepend `value` to the variable `name`, keeping any existing value
  /// after `separator`.
  pub fn prepend(&mut self, name: &str, value: &str, separator: &str) {
    if let Some(old) = self.raw.get_mut(OsStr::new(name)) {
      let mut joined = OsString::from(value);
      joined.push(separator);
      joined.push(&*old);
      *old = joined;
      return;
    }
    let joined = match self.vars.get(name) {
      Some(old) if !old.is_empty() => format!("{}{}{}", value, separator, old),
      _ => value.to_string(),
    };
    self.vars.insert(name.to_string(), joined);
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
    self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
  }

  /// Every variable, including the ones that are not valid UTF-8.
  pub fn iter_os(&self) -> impl Iterator<Item = (&OsStr, &OsStr)> {
    self
      .iter()
      .map(|(k, v)| (OsStr::new(k), OsStr::new(v)))
      .chain(self.raw.iter().map(|(k, v)| (k.as_os_str(), v.as_os_str())))
  }

  /// The `ARCHFLAGS` directive, required on macOS.
  pub fn arch_flags(&self) -> Result<&str, BuildError> {
    self.get(vars::ARCHFLAGS).ok_or(BuildError::MissingEnv(vars::ARCHFLAGS))
  }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for BuildEnv {
  fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
    Self {
      vars: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
      raw: BTreeMap::new(),
    }
  }
}

/// Whether builds for `role` cross-compile to arm64 on an x86_64 macOS host.
///
/// Only the target prefix is cross-compiled; host tools always build for the
/// machine running the build.
pub fn is_cross_arm64(os: Os, ambient: &BuildEnv, role: PrefixRole) -> Result<bool, BuildError> {
  if os != Os::MacOs || role.is_host_tool() {
    return Ok(false);
  }
  Ok(ambient.arch_flags()? == ARM64_ARCHFLAGS)
}

/// Derive the environment for building against `prefix`.
///
/// Include, library and pkg-config paths of the prefix are prepended so that
/// freshly installed packages win over anything supplied externally. On macOS
/// the target prefix additionally gets the `ARCHFLAGS` directive in the
/// compiler and linker flags.
pub fn derive_env(os: Os, ambient: &BuildEnv, prefix: &Prefix) -> Result<BuildEnv, BuildError> {
  let mut env = ambient.clone();

  env.prepend("CPPFLAGS", &format!("-I{}", mangle_path(os, &prefix.include_dir())), " ");
  env.prepend("LDFLAGS", &format!("-L{}", mangle_path(os, &prefix.lib_dir())), " ");
  env.prepend("PKG_CONFIG_PATH", &mangle_path(os, &prefix.pkgconfig_dir()), ":");

  if os == Os::MacOs && !prefix.role().is_host_tool() {
    let arch_flags = ambient.arch_flags()?;
    if arch_flags == ARM64_ARCHFLAGS {
      env.prepend("ASFLAGS", arch_flags, " ");
    }
    for var in ["CFLAGS", "CXXFLAGS", "LDFLAGS"] {
      env.prepend(var, arch_flags, " ");
    }
  }

  debug!(prefix = %prefix.root().display(), role = %prefix.role(), "derived build environment");
  Ok(env)
}
