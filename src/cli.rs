use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "rosterwatch")]
#[command(about = "Tracks membership rosters and reports what changed")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Capture the configured rosters and report differences since last time
    Sync(SyncArgs),

    /// Display the most recent capture
    Latest(LatestArgs),

    /// List stored captures
    History,

    /// Show or update the configured roster names
    Sources(SourcesArgs),
}

#[derive(Parser)]
pub struct SyncArgs {
    /// Directory holding <name>.json roster files
    #[arg(long)]
    pub dir: PathBuf,

    /// Roster names to capture (defaults to the configured list)
    #[arg(long, value_delimiter = ',')]
    pub names: Option<Vec<String>>,

    /// Output the diff as JSON instead of text
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Parser)]
pub struct LatestArgs {
    /// Output as JSON
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Parser)]
pub struct SourcesArgs {
    /// Replace the configured roster names
    #[arg(long, value_delimiter = ',')]
    pub set: Option<Vec<String>>,
}
