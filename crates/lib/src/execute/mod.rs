//! External process execution.
//!
//! Every external tool call (configure, make, cmake, meson, ninja, patch) is
//! described by an [`Invocation`] and executed by a [`CommandRunner`]. The
//! working directory and environment belong to the invocation, so the
//! builder's own process state is never changed.
//!
//! Downloads go through the [`Fetcher`] seam for the same reason: tests inject
//! fakes instead of touching the network.

pub mod cmd;
pub mod fetch;

use std::fmt;
use std::path::{Path, PathBuf};

use crate::env::BuildEnv;
use crate::error::BuildError;

pub use cmd::ProcessRunner;
pub use fetch::{Fetcher, HttpFetcher};

/// One external command: program, arguments, working directory, environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
  pub program: String,
  pub args: Vec<String>,
  pub cwd: Option<PathBuf>,
  pub env: BuildEnv,
}

impl Invocation {
  pub fn new(program: impl Into<String>, env: &BuildEnv) -> Self {
    Self {
      program: program.into(),
      args: Vec::new(),
      cwd: None,
      env: env.clone(),
    }
  }

  pub fn arg(mut self, arg: impl Into<String>) -> Self {
    self.args.push(arg.into());
    self
  }

  pub fn args<I, S>(mut self, args: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.args.extend(args.into_iter().map(Into::into));
    self
  }

  pub fn cwd(mut self, dir: &Path) -> Self {
    self.cwd = Some(dir.to_path_buf());
    self
  }

  /// The command line as a single string, for logs and error messages.
  pub fn command_line(&self) -> String {
    std::iter::once(self.program.as_str())
      .chain(self.args.iter().map(String::as_str))
      .collect::<Vec<_>>()
      .join(" ")
  }
}

impl fmt::Display for Invocation {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.command_line())
  }
}

/// Runs external commands to completion.
///
/// Implementations must return an error for any non-zero exit; callers treat
/// every error as fatal.
#[allow(async_fn_in_trait)]
pub trait CommandRunner {
  async fn run(&self, invocation: &Invocation) -> Result<(), BuildError>;
}

impl<T: CommandRunner> CommandRunner for &T {
  async fn run(&self, invocation: &Invocation) -> Result<(), BuildError> {
    (**self).run(invocation).await
  }
}
