pub mod arch;
pub mod os;
pub mod paths;

use arch::Arch;
use os::Os;
use std::fmt;

pub use paths::mangle_path;

/// Host platform: operating system plus CPU architecture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Platform {
  pub arch: Arch,
  pub os: Os,
}

impl Platform {
  /// Create a new platform identifier
  pub fn new(arch: Arch, os: Os) -> Self {
    Self { arch, os }
  }

  /// Detect the current platform at runtime
  ///
  /// Returns `None` if the OS or architecture is not supported
  pub fn current() -> Option<Self> {
    Some(Self {
      arch: Arch::current()?,
      os: Os::current()?,
    })
  }

  /// Returns the distribution tag for artifacts built on this platform.
  ///
  /// On macOS the architecture comes from the `ARCHFLAGS` directive
  /// (`-arch arm64` -> `macosx_arm64`) since that is what gets compiled,
  /// not what the host runs.
  pub fn tag(&self, arch_flags: Option<&str>) -> Option<String> {
    match self.os {
      Os::Linux => Some(format!("manylinux_{}", self.arch)),
      Os::MacOs => {
        let arch = arch_flags?.split_whitespace().nth(1)?;
        Some(format!("macosx_{}", arch))
      }
      Os::Windows => Some(if self.arch.is_64bit() { "win_amd64" } else { "win32" }.to_string()),
    }
  }
}

impl fmt::Display for Platform {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}-{}", self.arch, self.os)
  }
}
