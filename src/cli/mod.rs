//! CLI module for coursebot.

pub mod commands;
mod output;

pub use output::Output;

use clap::{Parser, Subcommand};

/// coursebot - grounded answers from course materials
///
/// Indexes course documents per course and answers student questions with citations,
/// a confidence score, and a suggestion to contact the instructor when support is weak.
#[derive(Parser, Debug)]
#[command(name = "coursebot")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "COURSEBOT_CONFIG")]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Index a folder of course documents (.md, .markdown, .txt)
    Ingest {
        /// Folder containing the course documents
        dir: String,

        /// Course to index into
        #[arg(long)]
        course: String,
    },

    /// Ask a question about a course
    Ask {
        /// The question to ask
        question: String,

        /// Course to answer from
        #[arg(long)]
        course: String,

        /// Number of chunks to retrieve (defaults to retrieval.top_k)
        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        /// Answer by extraction only, without calling a language model
        #[arg(long)]
        no_generate: bool,

        /// Print the response as JSON
        #[arg(long)]
        json: bool,
    },

    /// Search a course's chunks
    Search {
        /// Search query
        query: String,

        /// Course to search
        #[arg(long)]
        course: String,

        /// Maximum number of results
        #[arg(short, long, default_value = "5")]
        limit: usize,
    },

    /// List indexed courses
    List,

    /// Remove indexed material from a course
    Delete {
        /// Course to delete from
        #[arg(long)]
        course: String,

        /// Only remove chunks from this source document
        #[arg(long, conflicts_with = "chunk")]
        source: Option<String>,

        /// Only remove this chunk
        #[arg(long)]
        chunk: Option<String>,
    },

    /// Start HTTP API server
    Serve {
        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(short, long, default_value = "3000")]
        port: u16,
    },

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

    /// Show configuration file path
    Path,

    /// Write the default configuration file if none exists
    Init,
}
