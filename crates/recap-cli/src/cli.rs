use clap::{Parser, Subcommand, ValueEnum};

use crate::support::DEFAULT_CONFIG_PATH;

#[derive(Parser)]
#[command(
    name = "recap",
    about = "Recap: normalize seed metadata and maintain the capture registry",
    version
)]
pub struct Cli {
    /// Configuration file supplying `registry_dir` and `seed`
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    pub config: String,

    /// Log registry activity at debug level
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Normalize and assemble a seed document, printing the ordered records
    Normalize {
        /// Seed JSON (defaults to the configured seed)
        seed: Option<String>,

        /// Output records and the findings report as one JSON object
        #[arg(long)]
        json: bool,
    },

    /// Write the assembled corpus as a replayable command log
    Commands {
        /// Seed JSON (defaults to the configured seed)
        seed: Option<String>,

        /// Destination JSONL path
        #[arg(long)]
        out: String,
    },

    /// Normalize, assemble and register a seed document
    Register {
        /// Seed JSON (defaults to the configured seed)
        seed: Option<String>,

        /// Registry directory
        #[arg(long)]
        registry: Option<String>,

        /// Wipe the registry before registering
        #[arg(long)]
        wipe: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Register every command of a command log, in order
    Replay {
        /// Command log JSONL
        log: String,

        /// Registry directory
        #[arg(long)]
        registry: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List registered resources or captures, oldest first
    List {
        #[arg(value_enum)]
        collection: ListCollection,

        /// Only captures of this resource
        #[arg(long)]
        capture_of: Option<String>,

        /// Registry directory
        #[arg(long)]
        registry: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Remove both collections and reset the reserved-id list
    Wipe {
        /// Registry directory
        #[arg(long)]
        registry: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ListCollection {
    Resources,
    Captures,
}
