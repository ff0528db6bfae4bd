//! Archive staging.
//!
//! Makes a package's source available at `build/<package>/`: the archive is
//! downloaded into the cache if missing, unpacked with its single top-level
//! directory stripped (or as-is), and an optional patch is applied.

pub mod archive;

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::env::BuildEnv;
use crate::error::BuildError;
use crate::execute::{CommandRunner, Fetcher, Invocation};
use crate::layout::WorkLayout;
use crate::package::Package;

/// Return the cached archive for `package`, downloading it first if needed.
pub async fn ensure_archive(
  package: &Package,
  layout: &WorkLayout,
  fetcher: &impl Fetcher,
) -> Result<PathBuf, BuildError> {
  let archive = layout.archive_path(package.archive_filename());
  if archive.is_file() {
    debug!(archive = %archive.display(), "using cached archive");
    return Ok(archive);
  }
  fs::create_dir_all(&layout.source_dir)?;
  fetcher.fetch(&package.source_url, &archive).await?;
  Ok(archive)
}

/// Unpack `archive` to `dest`, stripping `strip_components` (0 or 1) leading
/// segments.
///
/// With one segment to strip, the archive must have exactly one top-level
/// directory; this is checked before anything is unpacked. Unpacking goes
/// through a temporary directory inside `scratch_dir` so that `dest` only
/// appears once the archive was read completely.
pub fn extract_archive(
  archive: &Path,
  scratch_dir: &Path,
  dest: &Path,
  strip_components: u8,
) -> Result<(), BuildError> {
  let prefix = match strip_components {
    0 => None,
    1 => {
      let prefixes = archive::top_level_prefixes(archive)?;
      if prefixes.len() != 1 {
        return Err(BuildError::AmbiguousArchivePrefix {
          archive: archive.to_path_buf(),
          prefixes: prefixes.into_iter().collect(),
        });
      }
      prefixes.into_iter().next()
    }
    _ => {
      return Err(BuildError::invalid_package(
        &dest.to_string_lossy(),
        "source_strip_components must be 0 or 1",
      ));
    }
  };

  fs::create_dir_all(scratch_dir)?;
  let staging = tempfile::Builder::new().prefix(".extract-").tempdir_in(scratch_dir)?;
  archive::unpack(archive, staging.path())?;

  let subtree = match &prefix {
    Some(prefix) => staging.path().join(prefix),
    None => staging.path().to_path_buf(),
  };

  if dest.exists() {
    fs::remove_dir_all(dest)?;
  }
  fs::rename(&subtree, dest)?;
  Ok(())
}

/// Stage one package: fetch, extract and patch.
pub async fn stage_package(
  package: &Package,
  layout: &WorkLayout,
  fetcher: &impl Fetcher,
  runner: &impl CommandRunner,
  env: &BuildEnv,
) -> Result<PathBuf, BuildError> {
  package.validate()?;

  let archive = ensure_archive(package, layout, fetcher).await?;
  let path = layout.package_path(&package.name);

  info!(package = %package.name, archive = %archive.display(), "extracting");
  extract_archive(&archive, &layout.build_dir, &path, package.source_strip_components)?;

  let patch = layout.patch_path(&package.name);
  if patch.is_file() {
    info!(package = %package.name, patch = %patch.display(), "applying patch");
    let invocation = Invocation::new("patch", env)
      .arg("-d")
      .arg(path.to_string_lossy())
      .arg("-i")
      .arg(patch.to_string_lossy())
      .arg("-p1")
      .cwd(&layout.build_dir);
    runner.run(&invocation).await?;
  }

  Ok(path)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::util::testutil::{FailingRunner, RecordingRunner, StaticFetcher, write_tar_gz};
  use tempfile::TempDir;

  fn setup() -> (TempDir, WorkLayout) {
    let temp = TempDir::new().unwrap();
    let layout = WorkLayout::new(temp.path());
    fs::create_dir_all(&layout.build_dir).unwrap();
    (temp, layout)
  }

  fn archive_bytes(entries: &[(&str, &str)]) -> Vec<u8> {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("a.tar.gz");
    write_tar_gz(&path, entries);
    fs::read(path).unwrap()
  }

  #[tokio::test]
  async fn stages_strip_one_archive_under_package_name() {
    let (_temp, layout) = setup();
    let fetcher = StaticFetcher::new(archive_bytes(&[("lame-3.100/configure", "#!/bin/sh\n")]));
    let package = Package::new("lame", "http://example.com/lame_3.100.orig.tar.gz");

    let path = stage_package(&package, &layout, &fetcher, &RecordingRunner::new(), &BuildEnv::new())
      .await
      .unwrap();

    assert_eq!(path, layout.package_path("lame"));
    assert!(path.join("configure").is_file());
    assert!(layout.archive_path("lame_3.100.orig.tar.gz").is_file());
    assert_eq!(fetcher.urls(), vec!["http://example.com/lame_3.100.orig.tar.gz"]);
  }

  #[tokio::test]
  async fn strip_zero_keeps_archive_layout() {
    let (_temp, layout) = setup();
    let fetcher = StaticFetcher::new(archive_bytes(&[("CMakeLists.txt", ""), ("src/aom.c", "")]));
    let package = Package::new("aom", "https://example.com/libaom-3.2.0.tar.gz").strip_components(0);

    let path = stage_package(&package, &layout, &fetcher, &RecordingRunner::new(), &BuildEnv::new())
      .await
      .unwrap();

    assert!(path.join("CMakeLists.txt").is_file());
    assert!(path.join("src/aom.c").is_file());
  }

  #[tokio::test]
  async fn cached_archive_is_not_fetched_again() {
    let (_temp, layout) = setup();
    fs::create_dir_all(&layout.source_dir).unwrap();
    fs::write(
      layout.archive_path("xz-5.6.0.tar.gz"),
      archive_bytes(&[("xz-5.6.0/configure", "")]),
    )
    .unwrap();
    let fetcher = StaticFetcher::new(Vec::new());
    let package = Package::new("xz", "https://example.com/xz-5.6.0.tar.gz");

    stage_package(&package, &layout, &fetcher, &RecordingRunner::new(), &BuildEnv::new())
      .await
      .unwrap();

    assert!(fetcher.urls().is_empty());
  }

  #[tokio::test]
  async fn multiple_prefixes_fail_before_extraction() {
    let (_temp, layout) = setup();
    let fetcher = StaticFetcher::new(archive_bytes(&[("a-1.0/configure", ""), ("b-1.0/configure", "")]));
    let package = Package::new("ab", "https://example.com/ab.tar.gz");

    let result = stage_package(&package, &layout, &fetcher, &RecordingRunner::new(), &BuildEnv::new()).await;

    match result {
      Err(BuildError::AmbiguousArchivePrefix { prefixes, .. }) => {
        assert_eq!(prefixes, vec!["a-1.0", "b-1.0"]);
      }
      other => panic!("expected AmbiguousArchivePrefix, got {:?}", other),
    }
    assert!(!layout.package_path("ab").exists());
    assert_eq!(fs::read_dir(&layout.build_dir).unwrap().count(), 0);
  }

  #[tokio::test]
  async fn path_like_name_leaves_working_root_untouched() {
    let (_temp, layout) = setup();
    fs::create_dir_all(&layout.patch_dir).unwrap();
    fs::write(layout.patch_dir.join("keep.patch"), "").unwrap();
    fs::create_dir_all(&layout.source_dir).unwrap();
    fs::write(layout.archive_path("keep.tar.gz"), "").unwrap();
    let fetcher = StaticFetcher::new(archive_bytes(&[("x-1.0/configure", "")]));

    for name in ["..", ".", "nested/dir"] {
      let package = Package::new(name, "https://example.com/x-1.0.tar.gz");
      let result = stage_package(&package, &layout, &fetcher, &RecordingRunner::new(), &BuildEnv::new()).await;
      assert!(matches!(result, Err(BuildError::InvalidPackage { .. })), "{:?}", name);
    }

    assert!(layout.patch_dir.join("keep.patch").is_file());
    assert!(layout.archive_path("keep.tar.gz").is_file());
    assert!(layout.build_dir.is_dir());
    assert!(fetcher.urls().is_empty());
  }

  #[tokio::test]
  async fn fetch_failure_is_fatal() {
    let (_temp, layout) = setup();
    let fetcher = StaticFetcher::failing();
    let package = Package::new("png", "http://example.com/libpng.tar.gz");

    let result = stage_package(&package, &layout, &fetcher, &RecordingRunner::new(), &BuildEnv::new()).await;

    assert!(matches!(result, Err(BuildError::FetchFailed { .. })));
    assert!(!layout.package_path("png").exists());
  }

  #[tokio::test]
  async fn patch_is_applied_when_present() {
    let (_temp, layout) = setup();
    fs::create_dir_all(&layout.patch_dir).unwrap();
    fs::write(layout.patch_path("gmp"), "--- a/x\n+++ b/x\n").unwrap();
    let fetcher = StaticFetcher::new(archive_bytes(&[("gmp-6.3.0/configure", "")]));
    let runner = RecordingRunner::new();
    let package = Package::new("gmp", "https://example.com/gmp-6.3.0.tar.gz");

    stage_package(&package, &layout, &fetcher, &runner, &BuildEnv::new())
      .await
      .unwrap();

    let calls = runner.invocations();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].program, "patch");
    assert_eq!(
      calls[0].args,
      vec![
        "-d".to_string(),
        layout.package_path("gmp").to_string_lossy().into_owned(),
        "-i".to_string(),
        layout.patch_path("gmp").to_string_lossy().into_owned(),
        "-p1".to_string(),
      ]
    );
  }

  #[tokio::test]
  async fn patch_failure_is_fatal() {
    let (_temp, layout) = setup();
    fs::create_dir_all(&layout.patch_dir).unwrap();
    fs::write(layout.patch_path("gmp"), "bogus").unwrap();
    let fetcher = StaticFetcher::new(archive_bytes(&[("gmp-6.3.0/configure", "")]));
    let package = Package::new("gmp", "https://example.com/gmp-6.3.0.tar.gz");

    let result = stage_package(&package, &layout, &fetcher, &FailingRunner::new("patch"), &BuildEnv::new()).await;

    assert!(matches!(result, Err(BuildError::CmdFailed { .. })));
  }

  #[tokio::test]
  async fn no_patch_means_no_commands() {
    let (_temp, layout) = setup();
    let fetcher = StaticFetcher::new(archive_bytes(&[("xz-5.6.0/configure", "")]));
    let runner = RecordingRunner::new();
    let package = Package::new("xz", "https://example.com/xz-5.6.0.tar.gz");

    stage_package(&package, &layout, &fetcher, &runner, &BuildEnv::new())
      .await
      .unwrap();

    assert!(runner.invocations().is_empty());
  }

  #[test]
  fn reextract_replaces_stale_tree() {
    let (temp, layout) = setup();
    let archive = temp.path().join("x.tar.gz");
    write_tar_gz(&archive, &[("x-1/new.txt", "")]);
    let dest = layout.package_path("x");
    fs::create_dir_all(&dest).unwrap();
    fs::write(dest.join("stale.txt"), "").unwrap();

    extract_archive(&archive, &layout.build_dir, &dest, 1).unwrap();

    assert!(dest.join("new.txt").exists());
    assert!(!dest.join("stale.txt").exists());
  }
}
