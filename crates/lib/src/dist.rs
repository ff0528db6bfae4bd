//! Distribution tarball.
//!
//! After the final artifact is installed, toolchain runtime libraries are
//! bundled, its shared libraries are stripped and `bin/`, `include/` and
//! `lib/` of the target prefix are packed into
//! `<output>/<artifact>-<platform tag>.tar.gz`.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use flate2::Compression;
use flate2::write::GzEncoder;
use tracing::{debug, info, warn};

use crate::env::BuildEnv;
use crate::error::BuildError;
use crate::execute::{CommandRunner, Invocation};
use crate::package::is_single_component;
use crate::platform::os::Os;

pub const TARBALL_DIRS: &[&str] = &["bin", "include", "lib"];

pub fn tarball_path(output_dir: &Path, artifact: &str, tag: &str) -> PathBuf {
  output_dir.join(format!("{}-{}.tar.gz", artifact, tag))
}

/// Shared libraries installed in `prefix`, sorted.
pub fn find_libraries(os: Os, prefix: &Path) -> io::Result<Vec<PathBuf>> {
  let (dir, extension) = match os {
    Os::Linux => ("lib", "so"),
    Os::MacOs => ("lib", "dylib"),
    Os::Windows => ("bin", "dll"),
  };
  let dir = prefix.join(dir);
  if !dir.is_dir() {
    return Ok(Vec::new());
  }

  let mut libraries = Vec::new();
  for entry in fs::read_dir(&dir)? {
    let path = entry?.path();
    if path.is_file() && path.extension().is_some_and(|ext| ext == extension) {
      libraries.push(path);
    }
  }
  libraries.sort();
  Ok(libraries)
}

/// Windows toolchains install import libraries next to the DLLs; move them
/// into `lib/`.
pub fn relocate_import_libraries(prefix: &Path) -> io::Result<usize> {
  let bin = prefix.join("bin");
  if !bin.is_dir() {
    return Ok(0);
  }
  let lib = prefix.join("lib");
  fs::create_dir_all(&lib)?;

  let mut moved = 0;
  for entry in fs::read_dir(&bin)? {
    let path = entry?.path();
    if path.extension().is_some_and(|ext| ext == "lib") {
      if let Some(name) = path.file_name() {
        fs::rename(&path, lib.join(name))?;
        moved += 1;
      }
    }
  }
  Ok(moved)
}

/// Copy the toolchain runtime libraries `names` into `<prefix>/bin`.
///
/// They are taken from the directory holding `provider` (usually the C
/// compiler) as found on the `PATH` of `env`. A missing library is an error.
pub fn bundle_runtime(names: &[String], provider: &str, env: &BuildEnv, prefix: &Path) -> Result<usize, BuildError> {
  if names.is_empty() {
    return Ok(0);
  }
  if let Some(name) = names.iter().find(|name| !is_single_component(name)) {
    return Err(BuildError::Io(io::Error::new(
      io::ErrorKind::InvalidInput,
      format!("invalid runtime library name {:?}", name),
    )));
  }

  let runtime_dir = locate_program_dir(provider, env)?;
  let bin = prefix.join("bin");
  fs::create_dir_all(&bin)?;
  for name in names {
    let source = runtime_dir.join(name);
    fs::copy(&source, bin.join(name))
      .map_err(|e| io::Error::new(e.kind(), format!("cannot copy {}: {}", source.display(), e)))?;
    debug!(library = %source.display(), "bundled runtime library");
  }
  info!(count = names.len(), from = %runtime_dir.display(), "bundled toolchain runtime");
  Ok(names.len())
}

fn locate_program_dir(program: &str, env: &BuildEnv) -> Result<PathBuf, BuildError> {
  let cwd = std::env::current_dir()?;
  let found = which::which_in(program, Some(env.get("PATH").unwrap_or_default()), cwd).map_err(|source| {
    BuildError::ToolNotFound {
      program: program.to_string(),
      source,
    }
  })?;
  match found.parent() {
    Some(dir) => Ok(dir.to_path_buf()),
    None => Err(BuildError::Io(io::Error::new(
      io::ErrorKind::NotFound,
      format!("{} has no parent directory", found.display()),
    ))),
  }
}

/// Strip debug symbols from `libraries`. On macOS the install names are
/// printed afterwards so they end up in the CI log.
pub async fn strip_libraries<R: CommandRunner>(
  os: Os,
  libraries: &[PathBuf],
  runner: &R,
  env: &BuildEnv,
) -> Result<(), BuildError> {
  if libraries.is_empty() {
    warn!("no shared libraries to strip");
    return Ok(());
  }
  let paths = libraries.iter().map(|path| path.to_string_lossy().into_owned());

  let invocations = match os {
    Os::MacOs => vec![
      Invocation::new("strip", env).arg("-S").args(paths.clone()),
      Invocation::new("otool", env).arg("-L").args(paths),
    ],
    Os::Linux | Os::Windows => vec![Invocation::new("strip", env).arg("-s").args(paths)],
  };
  for invocation in invocations {
    runner.run(&invocation).await?;
  }
  Ok(())
}

/// Pack the distribution directories of `prefix` into a gzip tarball at
/// `dest`. The tarball only appears once it was written completely.
pub fn write_tarball(prefix: &Path, dest: &Path) -> io::Result<()> {
  let parent = dest.parent().unwrap_or(Path::new("."));
  fs::create_dir_all(parent)?;
  let staging = tempfile::NamedTempFile::new_in(parent)?;

  {
    let encoder = GzEncoder::new(staging.as_file(), Compression::default());
    let mut builder = tar::Builder::new(encoder);
    for dir in TARBALL_DIRS {
      let path = prefix.join(dir);
      if path.is_dir() {
        builder.append_dir_all(dir, &path)?;
      } else {
        warn!(dir = %path.display(), "missing from prefix, not packed");
      }
    }
    builder.into_inner()?.finish()?;
  }

  staging.persist(dest).map_err(|e| e.error)?;
  info!(tarball = %dest.display(), "wrote distribution tarball");
  Ok(())
}
