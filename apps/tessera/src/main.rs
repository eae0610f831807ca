//! # Tessera - Collaborative Model Editing Server
//!
//! The main binary for the Tessera batch mutation engine.
//!
//! This application provides:
//! - HTTP host for batch calls (axum-based)
//! - CLI interface for running batches and moving models in and out
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────┐
//! │              apps/tessera (THE BINARY)              │
//! │                                                     │
//! │     ┌─────────────┐          ┌─────────────┐        │
//! │     │    CLI      │          │  HTTP API   │        │
//! │     │   (clap)    │          │   (axum)    │        │
//! │     └──────┬──────┘          └──────┬──────┘        │
//! │            └───────────┬────────────┘               │
//! │                        ▼                            │
//! │               ┌─────────────────┐                   │
//! │               │  tessera-core   │                   │
//! │               │  (THE ENGINE)   │                   │
//! │               └─────────────────┘                   │
//! └────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Start the HTTP server
//! tessera server --host 0.0.0.0 --port 6800
//!
//! # CLI operations
//! tessera models
//! tessera batch -f call.json
//! tessera export -m gomodel:0001 -o model.json
//! ```

mod cli;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    let cli = cli::Cli::parse();

    // TESSERA_LOG_FORMAT=json switches to machine-parseable output.
    let log_format = std::env::var("TESSERA_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let default_filter = if cli.verbose {
        "tessera=debug,tessera_core=debug,tower_http=debug"
    } else {
        "tessera=info,tessera_core=info,tower_http=debug"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    if !cli.quiet && !cli.json_mode {
        print_banner();
    }

    if let Err(e) = cli::execute(cli).await {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

fn print_banner() {
    eprintln!(
        r#"
  ╔╦╗╔═╗╔═╗╔═╗╔═╗╦═╗╔═╗
   ║ ║╣ ╚═╗╚═╗║╣ ╠╦╝╠═╣
   ╩ ╚═╝╚═╝╚═╝╚═╝╩╚═╩ ╩

  Batch model editing v{}
"#,
        env!("CARGO_PKG_VERSION")
    );
}
