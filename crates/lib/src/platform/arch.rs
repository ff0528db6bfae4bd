use std::fmt;

/// CPU architecture variants of the build host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arch {
  X86_64,
  X86,
  Aarch64,
  PowerPc64Le,
  S390x,
}

impl Arch {
  /// Detect the current CPU architecture at runtime
  pub fn current() -> Option<Self> {
    match std::env::consts::ARCH {
      "x86_64" => Some(Self::X86_64),
      "x86" => Some(Self::X86),
      "aarch64" => Some(Self::Aarch64),
      "powerpc64" => Some(Self::PowerPc64Le),
      "s390x" => Some(Self::S390x),
      _ => None,
    }
  }

  /// Returns the machine name as reported by `uname -m`
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::X86_64 => "x86_64",
      Self::X86 => "i686",
      Self::Aarch64 => "aarch64",
      Self::PowerPc64Le => "ppc64le",
      Self::S390x => "s390x",
    }
  }

  pub fn is_64bit(&self) -> bool {
    !matches!(self, Self::X86)
  }

  /// Whether CI runs this architecture under emulation, where parallel
  /// builds are unreliable.
  pub fn is_emulated(&self) -> bool {
    matches!(self, Self::Aarch64 | Self::PowerPc64Le | Self::S390x)
  }
}

impl fmt::Display for Arch {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}
