//! Meson backend: `meson setup`, `ninja`, `ninja install`.

use std::fs;
use std::path::Path;

use super::{BackendContext, PackagePaths};
use crate::error::BuildError;
use crate::execute::{CommandRunner, Invocation};
use crate::package::{BuildSystem, Package};

pub const CROSS_FILE_NAME: &str = "meson.cross";

/// Cross file describing an arm64 macOS host machine.
pub const DARWIN_ARM64_CROSS_FILE: &str = "[binaries]
c = 'cc'
cpp = 'c++'

[host_machine]
system = 'darwin'
cpu_family = 'aarch64'
cpu = 'aarch64'
endian = 'little'
";

/// Setup arguments; writes the cross file into `package_root` when needed.
pub fn setup_arguments<R: CommandRunner>(
  ctx: &BackendContext<'_, R>,
  package: &Package,
  package_root: &Path,
) -> Result<Vec<String>, BuildError> {
  let mut args = vec![
    "--libdir=lib".to_string(),
    format!("--prefix={}", ctx.mangle(ctx.prefix.root())),
  ];

  if ctx.is_cross_arm64()? {
    let cross_file = package_root.join(CROSS_FILE_NAME);
    fs::create_dir_all(package_root)?;
    fs::write(&cross_file, DARWIN_ARM64_CROSS_FILE)?;
    args.push(format!("--cross-file={}", ctx.mangle(&cross_file)));
  }

  args.extend(package.build_arguments.iter().cloned());
  Ok(args)
}

pub async fn build<R: CommandRunner>(ctx: &BackendContext<'_, R>, package: &Package) -> Result<(), BuildError> {
  debug_assert_eq!(package.build_system, BuildSystem::Meson);
  let paths = PackagePaths::resolve(ctx.layout, package);

  let env = ctx.derive_env()?;
  let args = setup_arguments(ctx, package, &paths.root)?;

  let setup = Invocation::new("meson", &env)
    .arg("setup")
    .arg(ctx.mangle(&paths.build))
    .arg(ctx.mangle(&paths.source))
    .args(args);

  // ninja parallelizes by default
  let mut compile = Invocation::new("ninja", &env).arg("--verbose");
  if !package.build_parallel || ctx.platform.arch.is_emulated() {
    compile = compile.arg("-j1");
  }
  let install = Invocation::new("ninja", &env).arg("install");

  ctx.run_in(&paths.build, vec![setup, compile, install]).await
}
