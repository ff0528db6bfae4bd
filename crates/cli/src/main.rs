mod cmd;
mod output;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::cmd::{BuildOptions, cmd_build, cmd_status};
use crate::output::print_error;

/// cibuild - build native dependency trees from source for binary wheels
#[derive(Parser)]
#[command(name = "cibuild")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable debug logging (overridden by RUST_LOG)
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Build every package of a manifest into a destination prefix
  Build {
    /// Target prefix; host tools go to `<dest>.builder`
    dest: PathBuf,

    /// Package manifest (JSON)
    #[arg(short, long)]
    manifest: PathBuf,

    /// Leave out GPL packages
    #[arg(long)]
    disable_gpl: bool,

    /// Directory receiving the distribution tarball
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Working root holding build/, source/ and patches/ (default: current directory)
    #[arg(long)]
    root: Option<PathBuf>,

    /// Build only; do not strip libraries or write the tarball
    #[arg(long)]
    skip_dist: bool,
  },

  /// Show which packages of a manifest are installed in a destination prefix
  Status {
    /// Target prefix
    dest: PathBuf,

    /// Package manifest (JSON)
    #[arg(short, long)]
    manifest: PathBuf,

    /// Resolve the plan without GPL packages
    #[arg(long)]
    disable_gpl: bool,

    /// Output as JSON
    #[arg(long)]
    json: bool,
  },
}

fn init_tracing(verbose: bool) {
  let filter = EnvFilter::try_from_default_env()
    .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "info" }));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .without_time()
    .init();
}

fn run(cli: Cli) -> Result<()> {
  match cli.command {
    Commands::Build {
      dest,
      manifest,
      disable_gpl,
      output_dir,
      root,
      skip_dist,
    } => cmd_build(BuildOptions {
      dest,
      manifest,
      disable_gpl,
      output_dir,
      root,
      skip_dist,
    }),
    Commands::Status {
      dest,
      manifest,
      disable_gpl,
      json,
    } => cmd_status(&dest, &manifest, disable_gpl, json),
  }
}

fn main() {
  let cli = Cli::parse();
  init_tracing(cli.verbose);

  if let Err(err) = run(cli) {
    print_error(&format!("{:#}", err));
    std::process::exit(1);
  }
}
