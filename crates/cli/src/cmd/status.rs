//! Status command implementation.
//!
//! Resolves the manifest's build plan and reports, per package, whether the
//! ledger of its prefix records it as installed.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use cibuild_lib::config::BuilderConfig;
use cibuild_lib::manifest::{Manifest, PlanOptions};
use cibuild_lib::prefix::{Prefix, PrefixRole};

use crate::output::{print_info, print_json, print_pending, print_stat, print_success};

#[derive(Debug, Serialize)]
struct PackageStatus {
  name: String,
  prefix: String,
  installed: bool,
}

#[derive(Debug, Serialize)]
struct StatusReport {
  dest: String,
  installed: usize,
  total: usize,
  packages: Vec<PackageStatus>,
}

pub fn cmd_status(dest: &Path, manifest_path: &Path, disable_gpl: bool, json: bool) -> Result<()> {
  let manifest = Manifest::load(manifest_path)
    .with_context(|| format!("Failed to load manifest {}", manifest_path.display()))?;
  let dest = std::path::absolute(dest).context("Failed to resolve destination")?;

  let root = std::env::current_dir().context("Failed to determine current directory")?;
  let config = BuilderConfig::from_env(&root, &dest)?;
  let plan = manifest.plan(PlanOptions {
    disable_gpl,
    prerequisites_installed: config.installs_prerequisites() && manifest.prerequisites.is_some(),
    os: Some(config.os()),
  });

  let (target, host) = Prefix::pair(&dest);
  let packages: Vec<PackageStatus> = plan
    .iter()
    .map(|entry| {
      let prefix = match entry.role {
        PrefixRole::Target => &target,
        PrefixRole::HostTool => &host,
      };
      PackageStatus {
        name: entry.package.name.clone(),
        prefix: prefix.root().display().to_string(),
        installed: prefix.ledger().is_installed(&entry.package.name),
      }
    })
    .collect();

  let report = StatusReport {
    dest: dest.display().to_string(),
    installed: packages.iter().filter(|p| p.installed).count(),
    total: packages.len(),
    packages,
  };

  if json {
    return print_json(&report);
  }

  if report.installed == 0 {
    print_info(&format!("Nothing installed in {} yet.", report.dest));
  }
  for package in &report.packages {
    let line = if package.prefix == report.dest {
      package.name.clone()
    } else {
      format!("{} ({})", package.name, package.prefix)
    };
    if package.installed {
      print_success(&line);
    } else {
      print_pending(&line);
    }
  }
  println!();
  print_stat("Installed", &format!("{}/{}", report.installed, report.total));
  Ok(())
}
