/// Application name, used for the ledger directory.
pub const APP_NAME: &str = "cibuild";

/// Suffix appended to the destination directory to form the host-tool prefix.
pub const HOST_PREFIX_SUFFIX: &str = ".builder";

/// Content written into every ledger marker.
pub const LEDGER_MARKER_CONTENT: &str = "installed\n";

/// Upstream location of the canonical `config.guess` / `config.sub` scripts.
pub const CONFIG_SCRIPTS_URL: &str = "https://git.savannah.gnu.org/cgit/config.git/plain/";

/// Package built with the three-pass strategy.
pub const MULTI_PASS_PACKAGE: &str = "x265";

/// Final artifact package; gets architecture flags instead of host triples when cross-compiling.
pub const FINAL_ARTIFACT_PACKAGE: &str = "ffmpeg";

/// Package whose configure script takes a single `--target` triple.
pub const TARGET_TRIPLE_PACKAGE: &str = "vpx";

/// Architecture directive selecting the newer CPU architecture on macOS.
pub const ARM64_ARCHFLAGS: &str = "-arch arm64";

/// Environment variable names read by the builder.
pub mod vars {
  pub const ARCHFLAGS: &str = "ARCHFLAGS";
  pub const DEPLOYMENT_TARGET: &str = "MACOSX_DEPLOYMENT_TARGET";
  pub const CI_MARKER: &str = "CIBUILDWHEEL";
}
