//! CMake backend: configure, build and install with the Unix Makefiles generator.

use std::path::Path;

use super::{BackendContext, PackagePaths, make_args};
use crate::error::BuildError;
use crate::execute::{CommandRunner, Invocation};
use crate::package::{BuildSystem, Package};
use crate::platform::os::Os;

/// Generate arguments for `package`, installing into `install_prefix`.
pub fn cmake_arguments<R: CommandRunner>(
  ctx: &BackendContext<'_, R>,
  package: &Package,
  install_prefix: &Path,
) -> Result<Vec<String>, BuildError> {
  let mut args = vec![
    "-GUnix Makefiles".to_string(),
    "-DBUILD_SHARED_LIBS=1".to_string(),
    "-DCMAKE_INSTALL_LIBDIR=lib".to_string(),
    format!("-DCMAKE_INSTALL_PREFIX={}", ctx.mangle(install_prefix)),
  ];

  if ctx.os() == Os::MacOs {
    args.push(format!(
      "-DCMAKE_INSTALL_NAME_DIR={}",
      ctx.mangle(&install_prefix.join("lib"))
    ));
    if ctx.is_cross_arm64()? {
      args.extend([
        "-DCMAKE_OSX_ARCHITECTURES=arm64".to_string(),
        "-DCMAKE_SYSTEM_NAME=Darwin".to_string(),
        "-DCMAKE_SYSTEM_PROCESSOR=arm64".to_string(),
      ]);
    }
  }

  args.extend(package.build_arguments.iter().cloned());
  Ok(args)
}

/// Build `package` and install it into the context's prefix.
pub async fn build<R: CommandRunner>(ctx: &BackendContext<'_, R>, package: &Package) -> Result<(), BuildError> {
  build_into(ctx, package, ctx.prefix.root()).await
}

/// Build `package` and install it into `install_prefix`, which may differ from
/// the context's prefix. The environment is still derived from the context's
/// prefix so previously installed dependencies are found.
pub async fn build_into<R: CommandRunner>(
  ctx: &BackendContext<'_, R>,
  package: &Package,
  install_prefix: &Path,
) -> Result<(), BuildError> {
  debug_assert_eq!(package.build_system, BuildSystem::Cmake);
  let paths = PackagePaths::resolve(ctx.layout, package);

  let env = ctx.derive_env()?;
  let args = cmake_arguments(ctx, package, install_prefix)?;

  let configure = Invocation::new("cmake", &env)
    .arg(ctx.mangle(&paths.source))
    .args(args);
  let compile = Invocation::new("cmake", &env)
    .args(["--build", ".", "--verbose"])
    .args(make_args(package.build_parallel, ctx.platform.arch));
  let install = Invocation::new("cmake", &env).args(["--install", "."]);

  ctx.run_in(&paths.build, vec![configure, compile, install]).await
}
