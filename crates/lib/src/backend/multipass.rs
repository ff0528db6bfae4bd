//! Three-pass build for x265.
//!
//! x265 cannot produce one shared library supporting 8, 10 and 12 bit pixel
//! depths in a single CMake run. The documented workaround:
//!
//! 1. build a 12 bit static library into a throwaway install path
//! 2. build a 10 bit static library into the same throwaway path
//! 3. rename both archives so they do not collide
//! 4. build the 8 bit shared library, linking both archives in
//!
//! Getting the rename or the link arguments wrong produces a library that
//! claims high bit depth support it does not contain.

use std::fs;

use tracing::info;

use super::{BackendContext, cmake};
use crate::consts::vars;
use crate::error::BuildError;
use crate::execute::CommandRunner;
use crate::package::{BuildSystem, Package};

pub const DUMMY_INSTALL_DIR: &str = "dummy_install_path";
pub const STATIC_ARCHIVE: &str = "libx265.a";

/// One static high-bit-depth pass.
struct StaticPass {
  build_dir: &'static str,
  archive: &'static str,
  flags: &'static [&'static str],
}

const PASS_12BIT: StaticPass = StaticPass {
  build_dir: "x265-12bits",
  archive: "libx265-12bits.a",
  flags: &[
    "-DHIGH_BIT_DEPTH=1",
    "-DMAIN12=1",
    "-DEXPORT_C_API=0",
    "-DENABLE_CLI=0",
    "-DENABLE_SHARED=0",
  ],
};

const PASS_10BIT: StaticPass = StaticPass {
  build_dir: "x265-10bits",
  archive: "libx265-10bits.a",
  flags: &["-DHIGH_BIT_DEPTH=1", "-DEXPORT_C_API=0", "-DENABLE_CLI=0", "-DENABLE_SHARED=0"],
};

/// Only x86_64 has hand-written assembly for the high bit depth code paths.
const NO_ASSEMBLY_FLAGS: &[&str] = &["-DENABLE_ASSEMBLY=0", "-DENABLE_ALTIVEC=0"];

const FINAL_PASS_FLAGS: &[&str] = &[
  "-DEXTRA_LIB=x265-10bits.a;x265-12bits.a",
  "-DLINKED_10BIT=1",
  "-DLINKED_12BIT=1",
  "-DEXTRA_LINK_FLAGS=-L../x265-10bits -L../x265-12bits",
];

fn validate(package: &Package) -> Result<(), BuildError> {
  if !package.build_arguments.is_empty() {
    return Err(BuildError::invalid_package(
      &package.name,
      "multi-pass build arguments are fixed and must not be set",
    ));
  }
  if package.build_system != BuildSystem::Cmake {
    return Err(BuildError::invalid_package(
      &package.name,
      format!("multi-pass build requires cmake, got {}", package.build_system),
    ));
  }
  Ok(())
}

/// Whether the compiled target architecture has x265 assembly support.
fn target_has_assembly<R: CommandRunner>(ctx: &BackendContext<'_, R>) -> Result<bool, BuildError> {
  let tag = ctx
    .platform
    .tag(ctx.ambient.get(vars::ARCHFLAGS))
    .ok_or(BuildError::MissingEnv(vars::ARCHFLAGS))?;
  Ok(tag.contains("x86_64") || tag.contains("amd64"))
}

pub async fn build<R: CommandRunner>(ctx: &BackendContext<'_, R>, package: &Package) -> Result<(), BuildError> {
  validate(package)?;

  let package_path = ctx.layout.package_path(&package.name);
  let dummy_install = package_path.join(DUMMY_INSTALL_DIR);
  let has_assembly = target_has_assembly(ctx)?;

  for pass in [&PASS_12BIT, &PASS_10BIT] {
    info!(package = %package.name, pass = pass.build_dir, "building static variant");
    let mut flags: Vec<&str> = pass.flags.to_vec();
    if !has_assembly {
      flags.extend_from_slice(NO_ASSEMBLY_FLAGS);
    }
    let variant = package.with_build_dir(pass.build_dir).with_build_arguments(flags);
    cmake::build_into(ctx, &variant, &dummy_install).await?;
  }

  for pass in [&PASS_12BIT, &PASS_10BIT] {
    let dir = package_path.join(pass.build_dir);
    fs::rename(dir.join(STATIC_ARCHIVE), dir.join(pass.archive))?;
  }

  info!(package = %package.name, "building shared library with linked static variants");
  let shared = package.with_build_arguments(FINAL_PASS_FLAGS.iter().copied());
  cmake::build(ctx, &shared).await
}
