use clap::{Parser, Subcommand};
use std::path::PathBuf;

use rag_bridge::Result;
use rag_bridge::commands::{ask, init_logging, serve, show_config};
use rag_bridge::config::Config;

#[derive(Parser)]
#[command(name = "rag-bridge")]
#[command(about = "RAG grounding service: index web content and answer queries against it")]
#[command(version)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, default_value = "rag-bridge.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the WebSocket server
    Serve,
    /// Ingest the given URLs and answer a single query
    Ask {
        /// The query to answer
        #[arg(long)]
        query: String,
        /// URL to ingest; may be given multiple times
        #[arg(long = "source")]
        sources: Vec<String>,
    },
    /// Show the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Configuration load failure is the one process-fatal error; nothing
    // is served without a valid config.
    let config = Config::load(&cli.config)?;
    init_logging(&config.logging)?;

    match cli.command {
        Commands::Serve => {
            serve(config).await?;
        }
        Commands::Ask { query, sources } => {
            let answer = ask(&config, &query, sources).await?;
            println!("{answer}");
        }
        Commands::Config => {
            show_config(&config)?;
        }
    }

    Ok(())
}
