//! CLI module for Dossier
//!
//! Provides command-line interface parsing and handling for the dossier binary.
//! Uses clap for argument parsing and owo-colors for colored terminal output.

pub mod init;
pub mod output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Dossier - Iterative research-synthesis server
///
/// Plans queries, researches them against a knowledge base and the web,
/// drafts cited sections and fills knowledge gaps on reflection.
#[derive(Parser, Debug)]
#[command(
    name = "dossier",
    author = "Dirmacs <build@dirmacs.com>",
    version,
    about = "Dossier - iterative research-synthesis server",
    long_about = "Writes structured, cited research reports from a topic and an outline.\n\n\
                  Run without arguments to start the server, use 'report' for a one-shot\n\
                  report, or 'init' to scaffold a new project.",
    after_help = "EXAMPLES:\n    \
                  dossier init                                  # Scaffold dossier.toml and .env.example\n    \
                  dossier                                       # Start the server (requires dossier.toml)\n    \
                  dossier queries \"Solar\" -o \"Intro, Outlook\"   # Plan queries only\n    \
                  dossier report \"Solar\" -o \"Intro, Outlook\"    # Write a full report\n    \
                  dossier --config my.toml config --validate    # Check a config file"
)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "dossier.toml", global = true)]
    pub config: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP server (default)
    Serve {
        /// Override the configured host
        #[arg(long)]
        host: Option<String>,

        /// Override the configured port
        #[arg(long)]
        port: Option<u16>,
    },

    /// Plan research queries for a topic
    Queries {
        /// Report topic
        topic: String,

        /// Comma-separated report outline
        #[arg(short = 'o', long)]
        outline: String,

        /// Number of queries to plan
        #[arg(short = 'n', long)]
        num_queries: Option<usize>,
    },

    /// Run the full pipeline and print the report
    Report {
        /// Report topic
        topic: String,

        /// Comma-separated report outline
        #[arg(short = 'o', long)]
        outline: String,

        /// JSON file with queries to research instead of planning them
        #[arg(long)]
        queries: Option<PathBuf>,

        /// Number of queries to plan
        #[arg(short = 'n', long)]
        num_queries: Option<usize>,

        /// Follow-up queries asked in the reflection round
        #[arg(short = 'r', long)]
        reflections: Option<usize>,

        /// Knowledge-base collection to search
        #[arg(long)]
        collection: Option<String>,

        /// Never fall back to web search
        #[arg(long)]
        no_web: bool,

        /// Write the markdown report to this file instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,

        /// Print progress events while the report runs
        #[arg(long)]
        progress: bool,
    },

    /// Initialize a new Dossier project with configuration files
    ///
    /// Creates dossier.toml, .env.example and .gitignore.
    Init {
        /// Directory to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Overwrite existing files without prompting
        #[arg(short, long)]
        force: bool,

        /// LLM provider to configure (ollama, openai, or both)
        #[arg(long, default_value = "ollama")]
        provider: String,

        /// Host address for the server
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port for the server
        #[arg(long, default_value = "3000")]
        port: u16,
    },

    /// Show configuration information
    Config {
        /// Show the full configuration
        #[arg(short = 'f', long)]
        full: bool,

        /// Validate the configuration file
        #[arg(long)]
        validate: bool,
    },
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
