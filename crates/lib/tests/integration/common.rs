//! Shared fakes for pipeline tests.

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use cibuild_lib::BuildError;
use cibuild_lib::config::BuilderConfig;
use cibuild_lib::env::BuildEnv;
use cibuild_lib::execute::{CommandRunner, Fetcher, Invocation};
use cibuild_lib::manifest::Manifest;
use cibuild_lib::platform::Platform;
use cibuild_lib::platform::arch::Arch;
use cibuild_lib::platform::os::Os;
use cibuild_lib::{Builder, PrefixRole};
use tempfile::TempDir;

/// Records every invocation; fails the first one whose command line contains
/// `fail_on`. Pretends `cmake --build` produced `libx265.a`.
#[derive(Default)]
pub struct FakeTools {
  calls: Mutex<Vec<Invocation>>,
  fail_on: Option<String>,
}

impl FakeTools {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn failing_on(needle: &str) -> Self {
    Self {
      calls: Mutex::new(Vec::new()),
      fail_on: Some(needle.to_string()),
    }
  }

  pub fn invocations(&self) -> Vec<Invocation> {
    self.calls.lock().unwrap().clone()
  }

  pub fn programs(&self) -> Vec<String> {
    self.invocations().into_iter().map(|call| call.program).collect()
  }
}

impl CommandRunner for FakeTools {
  async fn run(&self, invocation: &Invocation) -> Result<(), BuildError> {
    self.calls.lock().unwrap().push(invocation.clone());
    let cmd = invocation.command_line();
    if self.fail_on.as_deref().is_some_and(|needle| cmd.contains(needle)) {
      return Err(BuildError::CmdFailed { cmd, code: Some(1) });
    }
    if invocation.program == "cmake" && invocation.args.first().map(String::as_str) == Some("--build") {
      if let Some(cwd) = &invocation.cwd {
        std::fs::write(cwd.join("libx265.a"), b"!<arch>\n")?;
      }
    }
    Ok(())
  }
}

/// Serves a generated tarball per URL.
#[derive(Default)]
pub struct FakeMirror {
  archives: HashMap<String, Vec<u8>>,
  fetched: Mutex<Vec<String>>,
}

impl FakeMirror {
  /// Serve a gzip tarball with one top-level directory per package URL.
  pub fn for_manifest(manifest: &Manifest) -> Self {
    let mut archives = HashMap::new();
    for package in manifest.packages.iter().chain(std::iter::once(&manifest.artifact)) {
      let top = format!("{}-1.0", package.name);
      archives.insert(package.source_url.clone(), tar_gz(&top));
    }
    Self {
      archives,
      fetched: Mutex::new(Vec::new()),
    }
  }

  pub fn fetched(&self) -> Vec<String> {
    self.fetched.lock().unwrap().clone()
  }
}

impl Fetcher for FakeMirror {
  async fn fetch(&self, url: &str, dest: &Path) -> Result<(), BuildError> {
    self.fetched.lock().unwrap().push(url.to_string());
    match self.archives.get(url) {
      Some(bytes) => {
        std::fs::write(dest, bytes)?;
        Ok(())
      }
      None => Err(BuildError::FetchFailed {
        url: url.to_string(),
        message: "HTTP 404 Not Found".to_string(),
      }),
    }
  }
}

fn tar_gz(top: &str) -> Vec<u8> {
  let mut builder = tar::Builder::new(Vec::new());
  for (name, content) in [("configure", "#!/bin/sh\n"), ("CMakeLists.txt", ""), ("meson.build", "")] {
    let mut header = tar::Header::new_gnu();
    header.set_size(content.len() as u64);
    header.set_mode(0o755);
    header.set_cksum();
    builder
      .append_data(&mut header, format!("{}/{}", top, name), content.as_bytes())
      .unwrap();
  }
  let tar = builder.into_inner().unwrap();
  let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
  encoder.write_all(&tar).unwrap();
  encoder.finish().unwrap()
}

pub const MANIFEST: &str = r#"{
  "host_tools": ["nasm"],
  "packages": [
    { "name": "nasm", "source_url": "https://www.nasm.us/pub/nasm/releasebuilds/2.14.02/nasm-2.14.02.tar.gz" },
    { "name": "lame", "source_url": "http://deb.debian.org/debian/pool/main/l/lame/lame_3.100.orig.tar.gz",
      "build_arguments": ["--disable-frontend"], "fflags": "--enable-libmp3lame" },
    { "name": "openjpeg", "source_url": "https://github.com/uclouvain/openjpeg/archive/v2.5.2.tar.gz",
      "source_filename": "openjpeg-2.5.2.tar.gz", "build_system": "cmake", "fflags": "--enable-libopenjpeg" },
    { "name": "dav1d", "source_url": "https://code.videolan.org/videolan/dav1d/-/archive/1.4.0/dav1d-1.4.0.tar.gz",
      "build_system": "meson", "fflags": "--enable-libdav1d" },
    { "name": "x265", "source_url": "https://bitbucket.org/multicoreware/x265_git/downloads/x265_3.5.tar.gz",
      "build_system": "cmake", "source_dir": "source", "fflags": "--enable-libx265", "license": "gpl" }
  ],
  "artifact": {
    "name": "ffmpeg",
    "source_url": "https://ffmpeg.org/releases/ffmpeg-6.1.1.tar.gz",
    "build_arguments": ["--disable-doc"]
  },
  "gpl_arguments": ["--enable-gpl"],
  "lgpl_arguments": ["--disable-libx265"]
}"#;

pub struct Workspace {
  pub temp: TempDir,
  pub manifest: Manifest,
}

impl Workspace {
  pub fn new() -> Self {
    Self {
      temp: TempDir::new().unwrap(),
      manifest: Manifest::from_json(MANIFEST).unwrap(),
    }
  }

  pub fn root(&self) -> &Path {
    self.temp.path()
  }

  pub fn dest(&self) -> PathBuf {
    self.root().join("dest")
  }

  pub fn host_dest(&self) -> PathBuf {
    self.root().join("dest.builder")
  }

  pub fn builder<R: CommandRunner, F: Fetcher>(&self, runner: R, fetcher: F) -> Builder<R, F> {
    let config = BuilderConfig::new(self.root(), self.dest(), Platform::new(Arch::X86_64, Os::Linux));
    let ambient = BuildEnv::from_iter([("PATH", "/usr/bin")]);
    Builder::with_env(config, ambient, runner, fetcher)
  }

  pub fn write_patch(&self, package: &str) {
    let dir = self.root().join("patches");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join(format!("{}.patch", package)), "--- a/configure\n+++ b/configure\n").unwrap();
  }

  pub fn is_installed(&self, package: &str, role: PrefixRole) -> bool {
    let root = match role {
      PrefixRole::Target => self.dest(),
      PrefixRole::HostTool => self.host_dest(),
    };
    root.join("var/lib/cibuild").join(package).is_file()
  }
}

/// Create directories, extract everything, then build everything.
pub async fn run_plan<R: CommandRunner, F: Fetcher>(
  builder: &mut Builder<R, F>,
  plan: &cibuild_lib::manifest::BuildPlan,
) -> Result<(), BuildError> {
  builder.create_directories()?;
  for entry in plan.iter() {
    builder.extract(&entry.package, entry.role).await?;
  }
  for entry in plan.iter() {
    builder.build(&entry.package, entry.role).await?;
  }
  Ok(())
}
