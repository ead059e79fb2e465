//! CLI argument definitions using clap derive

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// lazyinstall - reinstall workspace dependencies only when they changed
///
/// Fingerprints each declared package (manifest, lockfile and linked local
/// packages) and runs the install command only for packages whose
/// fingerprint differs from the last successful install.
#[derive(Parser, Debug)]
#[command(name = "lazyinstall")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Workspace root (defaults to current directory)
    #[arg(short, long, global = true)]
    pub workspace: Option<PathBuf>,

    /// Settings file (defaults to <workspace>/lazyinstall.toml)
    #[arg(short, long, global = true, env = "LAZYINSTALL_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Install dependencies for every package whose inputs changed
    Install(InstallArgs),

    /// Show which packages would be reinstalled, and why
    Check(CheckArgs),

    /// Delete the install state so the next run reinstalls everything
    Clean(CleanArgs),
}

/// Arguments for the install command
#[derive(Parser, Debug)]
pub struct InstallArgs {
    /// Delete each package's installed dependencies before reinstalling it
    #[arg(short, long)]
    pub force: bool,

    /// Install command to run in each package directory (repeat for arguments)
    #[arg(long = "install-command", value_name = "ARG", num_args = 1.., allow_hyphen_values = true)]
    pub install_command: Option<Vec<String>>,
}

/// Arguments for the check command
#[derive(Parser, Debug)]
pub struct CheckArgs {
    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

/// Arguments for the clean command
#[derive(Parser, Debug)]
pub struct CleanArgs {
    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

/// Output format for check
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    #[default]
    Table,
    /// JSON output
    Json,
    /// Names of packages that need installing, one per line
    Plain,
}
