//! CLI module for Syllabus.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};

/// Syllabus - Course Materials Assistant
///
/// Ask questions about your course materials and get answers that cite the
/// lessons they came from.
#[derive(Parser, Debug)]
#[command(name = "syllabus")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP API server (and static frontend, if configured)
    Serve {
        /// Host to bind to (defaults to server.host)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to (defaults to server.port)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Ask a question about the indexed courses
    Ask {
        /// The question to ask
        question: String,

        /// Session id to continue
        #[arg(short, long)]
        session: Option<String>,
    },

    /// Index a course document or a folder of course documents
    Ingest {
        /// File or folder to index
        path: String,

        /// Remove all indexed courses first (folders only)
        #[arg(long)]
        clear: bool,
    },

    /// List indexed courses
    Courses,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., "model.max_tool_rounds")
        key: String,
        /// Configuration value
        value: String,
    },

    /// Show configuration file path
    Path,
}
