use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "mosi")]
#[command(about = "MOSI Controller - Locate and open MOSI appliances by serial number")]
#[command(version)]
pub struct Cli {
    /// Config file path (defaults to the nearest mosi.yaml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Storage root for history and offline cache (overrides data_dir)
    #[arg(short, long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only print command results
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Connect to an appliance by serial number (e.g. EM1234)
    Connect {
        /// Serial number, case-insensitive
        serial: String,

        /// Open the appliance in the default browser once reachable
        #[arg(long)]
        open: bool,
    },
    /// Check serial number input without connecting
    Validate {
        /// Input to check, possibly incomplete
        input: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Manage connection history
    #[command(subcommand)]
    History(HistoryCommands),
    /// Manage the offline asset cache
    #[command(subcommand)]
    Cache(CacheCommands),
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_name = "SHELL")]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand)]
pub enum HistoryCommands {
    /// List recent connections, most recent first
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove a serial number from history
    Remove {
        /// Serial number to remove
        serial: String,
    },
    /// Remove every entry
    Clear,
}

#[derive(Subcommand)]
pub enum CacheCommands {
    /// Download the current asset manifest into a new cache generation
    Install,
    /// Delete cache generations other than the current one
    Activate,
    /// Install and activate in one step, keeping the old generation on failure
    Update,
    /// Show cache lifecycle state and generations
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Fetch a URL through the cache
    Fetch {
        /// Absolute URL to fetch
        url: String,

        /// Write the response body to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}
