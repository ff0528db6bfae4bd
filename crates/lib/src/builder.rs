//! Build orchestration.
//!
//! The [`Builder`] owns the run configuration, both prefixes, a snapshot of
//! the ambient environment and the injected runner and fetcher. Callers drive
//! it package by package in dependency order:
//!
//! 1. [`Builder::create_directories`] once per run
//! 2. [`Builder::extract`] for every package
//! 3. [`Builder::build`] for every package
//!
//! Every step consults the ledger of the prefix it targets first, so a run
//! that failed halfway can simply be started again.

use std::fs;

use tracing::{debug, info};

use crate::backend::{self, BackendContext, ConfigScripts};
use crate::config::BuilderConfig;
use crate::consts::{MULTI_PASS_PACKAGE, vars};
use crate::env::BuildEnv;
use crate::error::BuildError;
use crate::execute::{CommandRunner, Fetcher};
use crate::layout::WorkLayout;
use crate::ledger::Ledger;
use crate::package::{BuildSystem, Package};
use crate::platform::os::Os;
use crate::prefix::{Prefix, PrefixRole};
use crate::stage;
use crate::util::group::LogGroup;

pub struct Builder<R, F> {
  config: BuilderConfig,
  layout: WorkLayout,
  target: Prefix,
  host: Prefix,
  ambient: BuildEnv,
  runner: R,
  fetcher: F,
}

impl<R: CommandRunner, F: Fetcher> Builder<R, F> {
  /// Create a builder whose ambient environment is a snapshot of the process
  /// environment.
  pub fn new(config: BuilderConfig, runner: R, fetcher: F) -> Self {
    Self::with_env(config, BuildEnv::from_process(), runner, fetcher)
  }

  pub fn with_env(config: BuilderConfig, ambient: BuildEnv, runner: R, fetcher: F) -> Self {
    let layout = WorkLayout::new(&config.root);
    let (target, host) = Prefix::pair(&config.dest_dir);
    Self {
      config,
      layout,
      target,
      host,
      ambient,
      runner,
      fetcher,
    }
  }

  pub fn config(&self) -> &BuilderConfig {
    &self.config
  }

  pub fn layout(&self) -> &WorkLayout {
    &self.layout
  }

  pub fn prefix(&self, role: PrefixRole) -> &Prefix {
    match role {
      PrefixRole::Target => &self.target,
      PrefixRole::HostTool => &self.host,
    }
  }

  pub fn ledger(&self, role: PrefixRole) -> Ledger {
    self.prefix(role).ledger()
  }

  /// The environment every derivation starts from.
  pub fn ambient(&self) -> &BuildEnv {
    &self.ambient
  }

  pub fn runner(&self) -> &R {
    &self.runner
  }

  pub fn is_installed(&self, package: &Package, role: PrefixRole) -> bool {
    self.ledger(role).is_installed(&package.name)
  }

  /// Reset the scratch tree, ensure the download cache exists and put the
  /// host-tool `bin` directory first on the builder's `PATH`.
  pub fn create_directories(&mut self) -> Result<(), BuildError> {
    if self.config.os() == Os::MacOs {
      info!(
        archflags = self.ambient.get(vars::ARCHFLAGS).unwrap_or("<unset>"),
        deployment_target = self.ambient.get(vars::DEPLOYMENT_TARGET).unwrap_or("<unset>"),
        "macOS build settings"
      );
    }

    if self.layout.build_dir.exists() {
      debug!(dir = %self.layout.build_dir.display(), "removing previous build tree");
      fs::remove_dir_all(&self.layout.build_dir)?;
    }
    fs::create_dir_all(&self.layout.build_dir)?;
    fs::create_dir_all(&self.layout.source_dir)?;

    let host_bin = self.host.bin_dir();
    self.ambient.prepend(
      "PATH",
      &host_bin.to_string_lossy(),
      self.config.os().path_list_separator(),
    );
    Ok(())
  }

  /// Stage the source of `package` unless it is already installed in the
  /// prefix for `role`.
  pub async fn extract(&self, package: &Package, role: PrefixRole) -> Result<(), BuildError> {
    package.validate()?;
    if self.is_installed(package, role) {
      debug!(package = %package.name, role = %role, "already installed, skipping extraction");
      return Ok(());
    }
    stage::stage_package(package, &self.layout, &self.fetcher, &self.runner, &self.ambient).await?;
    Ok(())
  }

  /// Build and install `package` into the prefix for `role`, then record it
  /// in that prefix's ledger. No-op when the ledger already has it.
  pub async fn build(&self, package: &Package, role: PrefixRole) -> Result<(), BuildError> {
    package.validate()?;
    let ledger = self.ledger(role);
    if ledger.is_installed(&package.name) {
      info!(package = %package.name, role = %role, "already installed");
      return Ok(());
    }

    let group = LogGroup::start(format!("Build {}", package.name));
    let ctx = BackendContext {
      platform: self.config.platform,
      layout: &self.layout,
      prefix: self.prefix(role),
      ambient: &self.ambient,
      runner: &self.runner,
    };

    info!(package = %package.name, role = %role, backend = %package.build_system, "building");
    if package.name == MULTI_PASS_PACKAGE {
      backend::multipass::build(&ctx, package).await?;
    } else {
      match package.build_system {
        BuildSystem::Autoconf => {
          let scripts = ConfigScripts::new(&self.layout.source_dir, &self.fetcher);
          backend::autoconf::build(&ctx, &scripts, package).await?;
        }
        BuildSystem::Cmake => backend::cmake::build(&ctx, package).await?,
        BuildSystem::Meson => backend::meson::build(&ctx, package).await?,
      }
    }

    ledger.mark_installed(&package.name)?;
    group.succeed();
    Ok(())
  }
}
