use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "treesnap",
    about = "Tree snapshots — detect and reconcile changes under a directory",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// TOML file with a [snapshot] table
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Number of stat workers (overrides the config file)
    #[arg(long, global = true)]
    pub workers: Option<usize>,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Snapshot a tree into an index file
    Snapshot(SnapshotArgs),
    /// Show changes between a tree and its saved index
    Diff(DiffArgs),
    /// Fold current changes into the saved index
    Refresh(RefreshArgs),
    /// Count indexed entries below a size limit
    Count(CountArgs),
}

#[derive(Args)]
pub struct SnapshotArgs {
    pub root: PathBuf,
    #[arg(short, long)]
    pub output: PathBuf,
}

#[derive(Args)]
pub struct DiffArgs {
    pub root: PathBuf,
    #[arg(short, long)]
    pub index: PathBuf,
}

#[derive(Args)]
pub struct RefreshArgs {
    pub root: PathBuf,
    #[arg(short, long)]
    pub index: PathBuf,
    /// Print the changes without saving
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Args)]
pub struct CountArgs {
    #[arg(short, long)]
    pub index: PathBuf,
    /// Size limit in bytes; negative counts everything
    #[arg(long, default_value_t = -1, allow_negative_numbers = true)]
    pub max_size: i64,
}
