//! Command-line interface definition for Parlance
//!
//! This module defines the CLI structure using clap's derive API,
//! providing commands for interactive chat and cache maintenance.

use clap::{Parser, Subcommand};

/// Parlance - Moderated conversation sessions with response caching
#[derive(Parser, Debug, Clone)]
#[command(name = "parlance")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, env = "PARLANCE_CONFIG", default_value = "config/config.yaml")]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for Parlance
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start an interactive chat session
    Chat {
        /// Session identifier; a fresh one is generated when omitted
        #[arg(short, long)]
        session: Option<String>,

        /// Skip the moderation gate on every turn
        #[arg(long)]
        no_moderate: bool,
    },

    /// Inspect and maintain the response cache
    Cache {
        /// Cache maintenance subcommand
        #[command(subcommand)]
        command: CacheCommand,
    },
}

/// Cache maintenance subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum CacheCommand {
    /// List entries matching the given filters
    Investigate {
        /// Match entries whose stringified form contains this substring
        #[arg(short = 'm', long)]
        contains: Option<String>,

        /// Match entries containing every one of these substrings
        #[arg(short, long)]
        all_of: Vec<String>,
    },

    /// Replace the output of the first entry with the given input
    Edit {
        /// Entry input as a JSON array of {role, content} messages
        #[arg(short, long)]
        input: String,

        /// Replacement output text
        #[arg(short, long)]
        output: String,
    },

    /// Delete the first entry with the given input
    Delete {
        /// Entry input as a JSON array of {role, content} messages
        #[arg(short, long)]
        input: String,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
