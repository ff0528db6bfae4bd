//! Test utilities for cibuild-lib.
//!
//! Fake command runners and fetchers, plus helpers to write small tarballs.

use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use crate::error::BuildError;
use crate::execute::{CommandRunner, Fetcher, Invocation};

type Hook = Box<dyn Fn(&Invocation) -> Result<(), BuildError> + Send + Sync>;

/// Records every invocation and succeeds, optionally running a hook first.
#[derive(Default)]
pub struct RecordingRunner {
  calls: Mutex<Vec<Invocation>>,
  hook: Option<Hook>,
}

impl RecordingRunner {
  pub fn new() -> Self {
    Self::default()
  }

  /// Run `hook` for each invocation; its error is returned from `run`.
  pub fn with_hook(hook: impl Fn(&Invocation) -> Result<(), BuildError> + Send + Sync + 'static) -> Self {
    Self {
      calls: Mutex::new(Vec::new()),
      hook: Some(Box::new(hook)),
    }
  }

  pub fn invocations(&self) -> Vec<Invocation> {
    self.calls.lock().unwrap().clone()
  }

  pub fn command_lines(&self) -> Vec<String> {
    self.invocations().iter().map(Invocation::command_line).collect()
  }
}

impl CommandRunner for RecordingRunner {
  async fn run(&self, invocation: &Invocation) -> Result<(), BuildError> {
    self.calls.lock().unwrap().push(invocation.clone());
    match &self.hook {
      Some(hook) => hook(invocation),
      None => Ok(()),
    }
  }
}

/// Fails every invocation whose command line contains `needle`.
pub struct FailingRunner {
  needle: String,
  inner: RecordingRunner,
}

impl FailingRunner {
  pub fn new(needle: &str) -> Self {
    Self {
      needle: needle.to_string(),
      inner: RecordingRunner::new(),
    }
  }

  pub fn invocations(&self) -> Vec<Invocation> {
    self.inner.invocations()
  }
}

impl CommandRunner for FailingRunner {
  async fn run(&self, invocation: &Invocation) -> Result<(), BuildError> {
    self.inner.run(invocation).await?;
    let cmd = invocation.command_line();
    if cmd.contains(&self.needle) {
      return Err(BuildError::CmdFailed { cmd, code: Some(2) });
    }
    Ok(())
  }
}

/// Serves the same bytes for every URL, or fails every fetch.
pub struct StaticFetcher {
  body: Option<Vec<u8>>,
  urls: Mutex<Vec<String>>,
}

impl StaticFetcher {
  pub fn new(body: Vec<u8>) -> Self {
    Self {
      body: Some(body),
      urls: Mutex::new(Vec::new()),
    }
  }

  pub fn failing() -> Self {
    Self {
      body: None,
      urls: Mutex::new(Vec::new()),
    }
  }

  pub fn urls(&self) -> Vec<String> {
    self.urls.lock().unwrap().clone()
  }
}

impl Fetcher for StaticFetcher {
  async fn fetch(&self, url: &str, dest: &Path) -> Result<(), BuildError> {
    self.urls.lock().unwrap().push(url.to_string());
    match &self.body {
      Some(body) => {
        std::fs::write(dest, body)?;
        Ok(())
      }
      None => Err(BuildError::FetchFailed {
        url: url.to_string(),
        message: "HTTP 404 Not Found".to_string(),
      }),
    }
  }
}

fn tar_bytes(entries: &[(&str, &str)]) -> Vec<u8> {
  let mut builder = tar::Builder::new(Vec::new());
  for (path, content) in entries {
    let mut header = tar::Header::new_gnu();
    header.set_size(content.len() as u64);
    header.set_mode(0o755);
    header.set_cksum();
    builder.append_data(&mut header, path, content.as_bytes()).unwrap();
  }
  builder.into_inner().unwrap()
}

pub fn write_tar(path: &Path, entries: &[(&str, &str)]) {
  std::fs::write(path, tar_bytes(entries)).unwrap();
}

pub fn write_tar_gz(path: &Path, entries: &[(&str, &str)]) {
  let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
  encoder.write_all(&tar_bytes(entries)).unwrap();
  std::fs::write(path, encoder.finish().unwrap()).unwrap();
}

pub fn write_tar_bz2(path: &Path, entries: &[(&str, &str)]) {
  let mut encoder = bzip2::write::BzEncoder::new(Vec::new(), bzip2::Compression::default());
  encoder.write_all(&tar_bytes(entries)).unwrap();
  std::fs::write(path, encoder.finish().unwrap()).unwrap();
}

pub fn write_tar_xz(path: &Path, entries: &[(&str, &str)]) {
  let mut encoder = xz2::write::XzEncoder::new(Vec::new(), 6);
  encoder.write_all(&tar_bytes(entries)).unwrap();
  std::fs::write(path, encoder.finish().unwrap()).unwrap();
}
