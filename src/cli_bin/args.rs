//! Command-line argument definitions

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Main CLI application
#[derive(Parser)]
#[command(
    name = "fsprep",
    version,
    about = "Inspect how glob matches are normalized and where they would be written",
    long_about = "fsprep enumerates glob matches, stats them (following symlinks), and either \
                  prints the normalized descriptors or the write targets they would get under \
                  an output folder. It never reads or writes file contents."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Print normalized descriptors for glob matches
    Read(ReadArgs),
    /// Print write targets for glob matches
    Plan(PlanArgs),
}

/// Options shared by every command that enumerates files
#[derive(Args, Debug, Clone)]
pub struct GlobArgs {
    /// Glob patterns; prefix with `!` to exclude
    #[arg(required = true)]
    pub globs: Vec<String>,

    /// Directory relative patterns resolve against
    #[arg(long)]
    pub cwd: Option<PathBuf>,

    /// Override the base of every match
    #[arg(long)]
    pub base: Option<PathBuf>,

    /// Match names starting with a dot
    #[arg(long)]
    pub dot: bool,

    /// Do not fail when a pattern without wildcards matches nothing
    #[arg(long)]
    pub allow_empty: bool,

    /// Report symlinks instead of following them
    #[arg(long)]
    pub no_resolve_symlinks: bool,

    /// Only files modified after this time (RFC 3339 or epoch milliseconds)
    #[arg(long, value_name = "TIME")]
    pub since: Option<String>,

    /// Maximum number of files stat'd concurrently
    #[arg(long, default_value_t = fsprep::io::DEFAULT_HIGH_WATER_MARK)]
    pub high_water_mark: usize,
}

/// Arguments for the read command
#[derive(Args, Debug, Clone)]
pub struct ReadArgs {
    #[command(flatten)]
    pub glob: GlobArgs,
}

/// Arguments for the plan command
#[derive(Args, Debug, Clone)]
pub struct PlanArgs {
    #[command(flatten)]
    pub glob: GlobArgs,

    /// Output folder, relative to --out-cwd
    #[arg(short, long)]
    pub out: PathBuf,

    /// Directory the output folder resolves against
    #[arg(long)]
    pub out_cwd: Option<PathBuf>,

    /// File mode in octal, e.g. 644
    #[arg(long, value_parser = parse_octal)]
    pub mode: Option<u32>,

    /// Fail instead of replacing existing destinations
    #[arg(long)]
    pub no_overwrite: bool,
}

fn parse_octal(value: &str) -> Result<u32, String> {
    let digits = value.trim_start_matches("0o");
    u32::from_str_radix(digits, 8).map_err(|err| format!("invalid octal mode {value:?}: {err}"))
}
