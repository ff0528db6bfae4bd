//! CI log groups.
//!
//! GitHub Actions folds everything between `::group::<title>` and
//! `::endgroup::` into one collapsible section. A [`LogGroup`] opens a section
//! on creation and closes it on drop, followed by a right-aligned outcome line
//! with the elapsed time, so failures are still visible when folded.

use std::io::Write;
use std::time::{Duration, Instant};

use tracing::{info, warn};

const OUTCOME_WIDTH: usize = 78;

pub struct LogGroup {
  title: String,
  start: Instant,
  success: bool,
}

impl LogGroup {
  pub fn start(title: impl Into<String>) -> Self {
    let title = title.into();
    emit(&format!("::group::{}", title));
    Self {
      title,
      start: Instant::now(),
      success: false,
    }
  }

  /// Mark the grouped work as successful. Groups dropped without this are
  /// reported as failed.
  pub fn succeed(mut self) {
    self.success = true;
  }
}

impl Drop for LogGroup {
  fn drop(&mut self) {
    let elapsed = self.start.elapsed();
    emit("::endgroup::");
    emit(&outcome_line(self.success, elapsed));
    if self.success {
      info!(group = %self.title, elapsed = ?elapsed, "ok");
    } else {
      warn!(group = %self.title, elapsed = ?elapsed, "failed");
    }
  }
}

fn outcome_line(success: bool, elapsed: Duration) -> String {
  let (color, outcome) = if success { ("\x1b[32m", "ok") } else { ("\x1b[31m", "failed") };
  let line = format!("{}{}\x1b[0m {:.2}s", color, outcome, elapsed.as_secs_f64());
  format!("{:>width$}", line, width = OUTCOME_WIDTH)
}

fn emit(line: &str) {
  let mut stdout = std::io::stdout().lock();
  let _ = writeln!(stdout, "{}", line);
  let _ = stdout.flush();
}
