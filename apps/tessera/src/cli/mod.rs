//! # Tessera CLI Module
//!
//! ## Available Commands
//!
//! - `server` - Start the HTTP server
//! - `batch` - Run a batch call read from a file
//! - `models` - List stored and loaded models
//! - `export` - Export a model to a file
//! - `import` - Import a model from a file
//! - `check-config` - Validate the configuration file

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tessera::config::TesseraConfig;
use tessera_core::TesseraError;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Tessera - collaborative model editing server
///
/// Applies batches of edits to annotation models held in a shared registry.
#[derive(Parser, Debug)]
#[command(name = "tessera")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file
    #[arg(short, long, global = true, default_value = "tessera.toml")]
    pub config: PathBuf,

    /// Model database, overriding `[store] path`
    #[arg(short = 'D', long, global = true)]
    pub database: Option<PathBuf>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start HTTP server
    Server {
        /// Host to bind to
        #[arg(short = 'H', long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(short, long, default_value = "6800")]
        port: u16,
    },

    /// Run a batch call from a JSON file and print the response
    Batch {
        /// Path to the batch call
        #[arg(short, long)]
        file: PathBuf,

        /// Run as a privileged caller
        #[arg(long)]
        privileged: bool,
    },

    /// List stored and loaded models
    Models,

    /// Export a model to a file
    Export {
        /// Model id
        #[arg(short, long)]
        model: String,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Export format (rdfxml, owl, owx, ofn, obo)
        #[arg(short = 't', long)]
        format: Option<String>,
    },

    /// Import a model from a file
    Import {
        /// Input file path
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Validate the configuration file
    CheckConfig,
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
///
/// Everything but the server touches model locks directly, so it runs on
/// the blocking pool.
pub async fn execute(cli: Cli) -> Result<(), TesseraError> {
    let config = TesseraConfig::load(&cli.config)?.with_store_path(cli.database);
    let json_mode = cli.json_mode;

    match cli.command {
        Some(Commands::Server { host, port }) => cmd_server(&config, &host, port).await,
        Some(Commands::CheckConfig) => cmd_check_config(&config, json_mode),
        command => tokio::task::spawn_blocking(move || match command {
            Some(Commands::Batch { file, privileged }) => {
                cmd_batch(&config, &file, privileged)
            }
            Some(Commands::Export {
                model,
                output,
                format,
            }) => cmd_export(&config, &model, &output, format.as_deref()),
            Some(Commands::Import { input }) => cmd_import(&config, &input, json_mode),
            // No subcommand: list models
            _ => cmd_models(&config, json_mode),
        })
        .await
        .map_err(|e| TesseraError::IoError(format!("Command task failed: {}", e)))?,
    }
}
