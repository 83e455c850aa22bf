//! Command line argument parsing for the RestPose CLI using clap.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};

use crate::config::URI_ENV_VAR;

/// restpose - command line client for a RestPose search server
#[derive(Parser, Debug, Clone)]
#[command(name = "restpose")]
#[command(about = "Command line client for the RestPose search server")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = None)]
pub struct RestPoseArgs {
    /// Server address (defaults to the config file value, then http://127.0.0.1:7777)
    #[arg(long, env = URI_ENV_VAR)]
    pub uri: Option<String>,

    /// JSON client configuration file
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Verbosity level (0=quiet, 1=normal, 2=verbose, 3=debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (overrides verbose)
    #[arg(short, long)]
    pub quiet: bool,

    /// Output format
    #[arg(short = 'f', long = "format", default_value = "human")]
    pub output_format: OutputFormat,

    /// Pretty-print JSON output
    #[arg(long)]
    pub pretty: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

impl RestPoseArgs {
    /// Get the effective verbosity level
    pub fn verbosity(&self) -> u8 {
        if self.quiet {
            0
        } else {
            match self.verbose {
                0 => 1,
                n => n,
            }
        }
    }
}

/// Available CLI commands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Show server status
    Status,

    /// List collections on the server
    Collections,

    /// Search a collection
    Search(SearchArgs),

    /// Create a checkpoint and optionally wait for it
    Checkpoint(CheckpointArgs),

    /// Fetch a stored document
    #[command(name = "get-doc")]
    GetDoc(GetDocArgs),
}

/// Arguments for searching
#[derive(Parser, Debug, Clone)]
pub struct SearchArgs {
    /// Collection to search
    pub collection: String,

    /// Restrict the search to one document type
    #[arg(short = 't', long = "type")]
    pub doc_type: Option<String>,

    /// Match documents whose field has a value (FIELD=VALUE, repeatable)
    #[arg(long = "is", value_name = "FIELD=VALUE")]
    pub is: Vec<String>,

    /// Match documents whose field contains text (FIELD=TEXT, repeatable)
    #[arg(long = "text", value_name = "FIELD=TEXT")]
    pub text: Vec<String>,

    /// Rank of the first result to show
    #[arg(long, default_value = "0")]
    pub from: i64,

    /// Number of results to show
    #[arg(long, default_value = "10")]
    pub size: i64,

    /// Sort by a field (FIELD or FIELD:desc), or by relevance (repeatable)
    #[arg(long = "order-by", value_name = "KEY")]
    pub order_by: Vec<String>,

    /// Only print the exact number of matches
    #[arg(long)]
    pub count: bool,
}

/// Arguments for creating a checkpoint
#[derive(Parser, Debug, Clone)]
pub struct CheckpointArgs {
    /// Collection to checkpoint
    pub collection: String,

    /// Do not commit changes when the checkpoint is reached
    #[arg(long)]
    pub no_commit: bool,

    /// Wait until the checkpoint is reached
    #[arg(long)]
    pub wait: bool,

    /// Give up waiting after this many seconds
    #[arg(long, value_name = "SECONDS")]
    pub timeout_secs: Option<u64>,
}

/// Arguments for fetching a document
#[derive(Parser, Debug, Clone)]
pub struct GetDocArgs {
    /// Collection holding the document
    pub collection: String,

    /// Document type
    pub doc_type: String,

    /// Document id
    pub doc_id: String,
}

/// Output format options
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON output
    Json,
}
