//! CLI commands and argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Front analytics tap
#[derive(Parser, Debug)]
#[command(name = "frontapp-tap")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (JSON, or YAML by extension)
    #[arg(short = 'C', long, global = true)]
    pub config: Option<PathBuf>,

    /// State file (JSON); updated after every window
    #[arg(short, long, global = true)]
    pub state: Option<PathBuf>,

    /// Inline state JSON
    #[arg(long, global = true)]
    pub state_json: Option<String>,

    /// Catalog file selecting the streams to sync
    #[arg(long, global = true)]
    pub catalog: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, default_value = "json")]
    pub format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate the token against the API
    Check {
        /// Inline config JSON
        #[arg(long)]
        config_json: Option<String>,
    },

    /// Print the catalog of available streams
    Discover,

    /// Sync streams
    Read {
        /// Streams to sync (comma-separated, empty = catalog selection or all)
        #[arg(long)]
        streams: Option<String>,

        /// Inline config JSON
        #[arg(long)]
        config_json: Option<String>,

        /// Output directory for parquet files
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Keep going with the next stream when one fails
        #[arg(long)]
        continue_on_error: bool,
    },

    /// List available stream names
    Streams,
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output (one message per line)
    Json,
    /// Human-readable output
    Pretty,
    /// Parquet files
    Parquet,
}
