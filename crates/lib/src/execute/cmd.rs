//! Process-backed command runner.

use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, info};

use super::{CommandRunner, Invocation};
use crate::error::BuildError;

/// Runs invocations as child processes.
///
/// The child gets exactly the invocation's environment (the parent's is
/// cleared first) and its working directory; output is streamed to the
/// parent's stdout/stderr so build logs stay visible in CI.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl CommandRunner for ProcessRunner {
  async fn run(&self, invocation: &Invocation) -> Result<(), BuildError> {
    info!(cmd = %invocation, "running");

    let mut command = Command::new(&invocation.program);
    command
      .args(&invocation.args)
      .env_clear()
      .envs(invocation.env.iter_os())
      .stdin(Stdio::null());

    if let Some(cwd) = &invocation.cwd {
      command.current_dir(cwd);
    }

    debug!(program = %invocation.program, cwd = ?invocation.cwd, "spawning process");

    let status = command.status().await.map_err(|source| BuildError::Spawn {
      program: invocation.program.clone(),
      source,
    })?;

    if !status.success() {
      return Err(BuildError::CmdFailed {
        cmd: invocation.command_line(),
        code: status.code(),
      });
    }

    Ok(())
  }
}
