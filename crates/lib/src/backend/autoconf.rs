//! Autoconf backend: `sh configure`, `make`, `make install`.

use tracing::info;

use super::{BackendContext, ConfigScripts, PackagePaths, make_args};
use crate::consts::{FINAL_ARTIFACT_PACKAGE, TARGET_TRIPLE_PACKAGE};
use crate::env::BuildEnv;
use crate::error::BuildError;
use crate::execute::{CommandRunner, Fetcher, Invocation};
use crate::package::{BuildSystem, Package};
use crate::platform::os::Os;

/// Configure arguments for `package`, before the package's own arguments.
///
/// When cross-compiling to arm64 this also seeds autoconf cache variables in
/// `env` for checks that cannot run on the build machine.
pub fn configure_arguments<R: CommandRunner>(
  ctx: &BackendContext<'_, R>,
  package: &Package,
  env: &mut BuildEnv,
) -> Result<Vec<String>, BuildError> {
  let prefix = ctx.prefix;
  let mut args = vec![
    "--disable-static".to_string(),
    "--enable-shared".to_string(),
    format!("--libdir={}", ctx.mangle(&prefix.lib_dir())),
    format!("--prefix={}", ctx.mangle(prefix.root())),
  ];

  let cross_arm64 = ctx.is_cross_arm64()?;

  if package.name == TARGET_TRIPLE_PACKAGE {
    // darwin20 is the first darwin with arm64 support, darwin13 matches a 10.9 deployment target
    let target = if cross_arm64 {
      Some("arm64-darwin20-gcc")
    } else {
      match ctx.os() {
        Os::MacOs => Some("x86_64-darwin13-gcc"),
        Os::Windows => Some("x86_64-win64-gcc"),
        Os::Linux => None,
      }
    };
    if let Some(target) = target {
      args.push(format!("--target={}", target));
    }
  } else if cross_arm64 {
    // AC_FUNC_MALLOC and AC_FUNC_REALLOC cannot run their probes when cross-compiling
    env.set("ac_cv_func_malloc_0_nonnull", "yes");
    env.set("ac_cv_func_realloc_0_nonnull", "yes");

    if package.name == FINAL_ARTIFACT_PACKAGE {
      args.extend(["--arch=arm64".to_string(), "--enable-cross-compile".to_string()]);
    } else {
      args.extend([
        "--build=x86_64-apple-darwin".to_string(),
        "--host=aarch64-apple-darwin".to_string(),
      ]);
    }
  }

  args.extend(package.build_arguments.iter().cloned());
  Ok(args)
}

pub async fn build<R: CommandRunner, F: Fetcher>(
  ctx: &BackendContext<'_, R>,
  scripts: &ConfigScripts<F>,
  package: &Package,
) -> Result<(), BuildError> {
  debug_assert_eq!(package.build_system, BuildSystem::Autoconf);
  let paths = PackagePaths::resolve(ctx.layout, package);

  let refreshed = scripts.refresh_tree(&paths.root).await?;
  if refreshed > 0 {
    info!(package = %package.name, count = refreshed, "refreshed config.guess/config.sub");
  }

  let mut env = ctx.derive_env()?;
  let configure_args = configure_arguments(ctx, package, &mut env)?;

  let configure = Invocation::new("sh", &env)
    .arg(ctx.mangle(&paths.source.join("configure")))
    .args(configure_args);
  let make = Invocation::new("make", &env)
    .args(make_args(package.build_parallel, ctx.platform.arch))
    .arg("V=1");
  let install = Invocation::new("make", &env).arg("install");

  ctx.run_in(&paths.build, vec![configure, make, install]).await
}
