//! CLI command definitions and subcommands

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Prospector - streaming company search and campaign creation
#[derive(Parser)]
#[command(
    name = "prospector",
    about = "Agentic company search and campaign creation client",
    version
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Subcommand)]
pub enum Command {
    /// Run a streaming search and print results as they arrive
    Search {
        /// Natural-language query
        query: String,

        /// Maximum number of results
        #[arg(short, long)]
        limit: Option<u32>,

        /// Product id to search against
        #[arg(short, long)]
        product: Option<i64>,

        /// Skip partner suggestions
        #[arg(long)]
        no_suggestions: bool,

        /// Output format for the final summary
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// List the partner catalog
    Partners {
        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// List available products
    Products {
        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },
}

/// Output format for list/summary commands
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "plain" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown format: {}. Use: text or json", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Json => write!(f, "json"),
        }
    }
}
