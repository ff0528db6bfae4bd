use std::path::Path;

use super::os::Os;

/// Rewrite a path for the MSYS shell tooling used on Windows.
///
/// Backslashes become forward slashes and a leading drive letter becomes a
/// root directory (`C:\foo` -> `/c/foo`). On other systems the path is
/// returned unchanged.
pub fn mangle_path(os: Os, path: &Path) -> String {
  let raw = path.to_string_lossy();
  if os != Os::Windows {
    return raw.into_owned();
  }

  let slashed = raw.replace('\\', "/");
  let mut chars = slashed.chars();
  match (chars.next(), chars.next()) {
    (Some(drive), Some(':')) if drive.is_ascii_alphabetic() => {
      format!("/{}{}", drive.to_ascii_lowercase(), chars.as_str())
    }
    _ => slashed,
  }
}
