//! Implementation of the `cibuild build` command.
//!
//! Loads a manifest, builds every package of the resolved plan into the
//! destination prefix and packs the result into a distribution tarball.

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use tracing::info;

use cibuild_lib::Builder;
use cibuild_lib::config::BuilderConfig;
use cibuild_lib::consts::vars;
use cibuild_lib::dist;
use cibuild_lib::env::BuildEnv;
use cibuild_lib::execute::{CommandRunner, Fetcher, HttpFetcher, Invocation, ProcessRunner};
use cibuild_lib::manifest::{BuildPlan, Manifest, PlanOptions};
use cibuild_lib::platform::os::Os;
use cibuild_lib::prefix::PrefixRole;
use cibuild_lib::util::group::LogGroup;

use crate::output::{format_duration, print_info, print_stat, print_success, print_warning};

/// Output directory mounted into the Linux CI containers.
const CI_OUTPUT_DIR: &str = "/output";

pub struct BuildOptions {
  pub dest: PathBuf,
  pub manifest: PathBuf,
  pub disable_gpl: bool,
  pub output_dir: Option<PathBuf>,
  pub root: Option<PathBuf>,
  pub skip_dist: bool,
}

fn resolve_output_dir(options: &BuildOptions, config: &BuilderConfig) -> PathBuf {
  match &options.output_dir {
    Some(dir) => dir.clone(),
    None if config.installs_prerequisites() => PathBuf::from(CI_OUTPUT_DIR),
    None => config.root.join("output"),
  }
}

/// Execute the build command.
///
/// - Skips everything when the distribution tarball already exists
/// - Installs CI prerequisites on Linux CI images
/// - Extracts every package, then builds every package, in manifest order
/// - Bundles the toolchain runtime, strips the shared libraries and writes
///   the tarball
pub fn cmd_build(options: BuildOptions) -> Result<()> {
  let start = Instant::now();

  let manifest = Manifest::load(&options.manifest)
    .with_context(|| format!("Failed to load manifest {}", options.manifest.display()))?;

  let root = match &options.root {
    Some(root) => root.clone(),
    None => std::env::current_dir().context("Failed to determine current directory")?,
  };
  let root = std::path::absolute(&root).context("Failed to resolve working root")?;
  let dest = std::path::absolute(&options.dest).context("Failed to resolve destination")?;

  let config = BuilderConfig::from_env(&root, &dest)?;
  let ambient = BuildEnv::from_process();
  let tag = config
    .platform
    .tag(ambient.get(vars::ARCHFLAGS))
    .with_context(|| format!("{} must be set on macOS", vars::ARCHFLAGS))?;

  let tarball = dist::tarball_path(&resolve_output_dir(&options, &config), &manifest.artifact.name, &tag);
  if !options.skip_dist && tarball.exists() {
    print_info(&format!("{} already exists, nothing to do", tarball.display()));
    return Ok(());
  }

  let plan = manifest.plan(PlanOptions {
    disable_gpl: options.disable_gpl,
    prerequisites_installed: config.installs_prerequisites() && manifest.prerequisites.is_some(),
    os: Some(config.os()),
  });
  info!(platform = %config.platform, tag = %tag, packages = plan.len(), "starting build");

  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  let mut builder = Builder::with_env(config, ambient, ProcessRunner, HttpFetcher::new());
  rt.block_on(run_build(&mut builder, &manifest, &plan))
    .context("Build failed")?;

  if options.skip_dist {
    print_warning("Distribution skipped, no tarball written");
  } else {
    rt.block_on(package_distribution(&builder, &manifest, &tarball))
      .context("Packaging failed")?;
  }

  println!();
  print_success("Build complete!");
  print_stat("Packages", &plan.len().to_string());
  print_stat("Prefix", &dest.display().to_string());
  if !options.skip_dist {
    print_stat("Tarball", &tarball.display().to_string());
  }
  print_stat("Elapsed", &format_duration(start.elapsed()));
  Ok(())
}

async fn run_build<R: CommandRunner, F: Fetcher>(
  builder: &mut Builder<R, F>,
  manifest: &Manifest,
  plan: &BuildPlan,
) -> Result<()> {
  builder.create_directories()?;

  if builder.config().installs_prerequisites() {
    if let Some(prerequisites) = &manifest.prerequisites {
      install_prerequisites(builder, &prerequisites.command_line()).await?;
    }
  }

  for entry in plan.iter() {
    builder
      .extract(&entry.package, entry.role)
      .await
      .with_context(|| format!("Failed to extract {}", entry.package.name))?;
  }
  for entry in plan.iter() {
    builder
      .build(&entry.package, entry.role)
      .await
      .with_context(|| format!("Failed to build {}", entry.package.name))?;
  }
  Ok(())
}

async fn install_prerequisites<R: CommandRunner, F: Fetcher>(
  builder: &Builder<R, F>,
  command_line: &[String],
) -> Result<()> {
  let Some((program, args)) = command_line.split_first() else {
    return Ok(());
  };
  let group = LogGroup::start("install packages");
  let invocation = Invocation::new(program.as_str(), builder.ambient()).args(args.iter().cloned());
  builder
    .runner()
    .run(&invocation)
    .await
    .context("Failed to install prerequisites")?;
  group.succeed();
  Ok(())
}

async fn package_distribution<R: CommandRunner, F: Fetcher>(
  builder: &Builder<R, F>,
  manifest: &Manifest,
  tarball: &Path,
) -> Result<()> {
  let os = builder.config().os();
  let prefix = builder.prefix(PrefixRole::Target).root();

  if os == Os::Windows {
    let moved = dist::relocate_import_libraries(prefix)?;
    info!(count = moved, "moved import libraries to lib/");
  }
  if let Some(settings) = manifest.platform(os) {
    dist::bundle_runtime(
      &settings.bundled_runtime,
      &settings.runtime_provider,
      builder.ambient(),
      prefix,
    )
    .context("Failed to bundle toolchain runtime")?;
  }

  let libraries = dist::find_libraries(os, prefix)?;
  dist::strip_libraries(os, &libraries, builder.runner(), builder.ambient()).await?;
  dist::write_tarball(prefix, tarball)
    .with_context(|| format!("Failed to write {}", tarball.display()))?;
  Ok(())
}
