//! Command-line interface definition for ClientFit
//!
//! This module defines the CLI structure using clap's derive API,
//! providing commands to inspect detection, profiles, templates and
//! per-client configuration.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// ClientFit - client capability detection and adaptation
///
/// Inspect how connecting clients are detected and which capability
/// configuration they resolve to.
#[derive(Parser, Debug, Clone)]
#[command(name = "clientfit")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/clientfit.yaml")]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for ClientFit
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Detect a client from connection metadata and print its context
    Detect {
        /// User-agent string sent by the client
        #[arg(short, long)]
        user_agent: Option<String>,

        /// Client name sent during initialization
        #[arg(short = 'n', long)]
        client_name: Option<String>,

        /// Declared capabilities as a JSON object
        #[arg(long)]
        capabilities: Option<String>,

        /// Also consider TERM_PROGRAM and EDITOR from this process
        #[arg(long)]
        use_env: bool,
    },

    /// List client profiles in detection order
    Profiles,

    /// Inspect and transfer per-client configuration
    Config {
        /// Configuration subcommand
        #[command(subcommand)]
        command: ConfigCommand,
    },

    /// List configuration templates
    Templates,
}

/// Configuration subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum ConfigCommand {
    /// Print the resolved configuration for a client
    Show {
        /// Client id (profile id or registered id)
        client_id: String,

        /// Apply a template before resolving
        #[arg(short, long)]
        template: Option<String>,
    },

    /// Export a client's configuration layers as JSON
    Export {
        /// Client id
        client_id: String,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Import a previously exported configuration file
    Import {
        /// Exported JSON file
        file: PathBuf,
    },
}

impl Cli {
    /// Parse command line arguments
    ///
    /// # Returns
    ///
    /// Returns the parsed CLI structure
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

impl Default for Cli {
    fn default() -> Self {
        Self {
            config: Some("config/clientfit.yaml".to_string()),
            verbose: false,
            command: Commands::Profiles,
        }
    }
}
