//! Process-level wiring: logging setup and the CLI entry points.

use std::sync::Arc;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

use crate::RagError;
use crate::config::{Config, LogFormat, LoggingConfig};
use crate::enhance::QueryEnhancer;
use crate::ingest::{Ingestor, SourceMap};
use crate::ollama::OllamaClient;
use crate::server;
use crate::store::VectorStore;

/// Initialize tracing from the logging config: console and/or file sinks,
/// with `RUST_LOG` taking precedence over the configured level.
#[inline]
pub fn init_logging(config: &LoggingConfig) -> crate::Result<()> {
    if !config.enabled {
        return Ok(());
    }

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    tracing_subscriber::registry()
        .with(fmt_layers(config)?)
        .with(filter)
        .init();

    Ok(())
}

fn fmt_layers<S>(config: &LoggingConfig) -> crate::Result<Vec<Box<dyn Layer<S> + Send + Sync>>>
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    let mut layers: Vec<Box<dyn Layer<S> + Send + Sync>> = Vec::new();

    if config.console.enabled {
        let layer = fmt::layer();
        layers.push(match config.format {
            LogFormat::Full => layer.boxed(),
            LogFormat::Compact => layer.compact().boxed(),
            LogFormat::Pretty => layer.pretty().boxed(),
        });
    }

    if config.file.enabled {
        let file = std::fs::File::create(&config.file.filename)?;
        let layer = fmt::layer().with_ansi(false).with_writer(Arc::new(file));
        layers.push(match config.format {
            LogFormat::Full => layer.boxed(),
            LogFormat::Compact => layer.compact().boxed(),
            LogFormat::Pretty => layer.pretty().boxed(),
        });
    }

    Ok(layers)
}

/// Run the WebSocket server until the process is stopped.
#[inline]
pub async fn serve(config: Config) -> crate::Result<()> {
    server::serve(config).await
}

/// One-shot standalone mode: ingest the given URLs, answer the query,
/// return the answer.
#[inline]
pub async fn ask(config: &Config, query: &str, sources: Vec<String>) -> crate::Result<String> {
    let ollama = OllamaClient::new(&config.ollama)?;
    let mut store = VectorStore::connect(&config.collection).await?;

    let source_map: SourceMap = sources.into_iter().map(|url| (url, None)).collect();

    let ingestor = Ingestor::new(&ollama, config);
    let ingested = ingestor.ingest(&mut store, &source_map).await?;
    info!("Standalone ingest committed {} chunks", ingested);

    let enhancer = QueryEnhancer::new(&ollama, config.query.max_results);
    Ok(enhancer.answer(&store, query).await)
}

/// Print the effective configuration as TOML.
#[inline]
pub fn show_config(config: &Config) -> crate::Result<()> {
    let rendered = config
        .to_toml()
        .map_err(|e| RagError::Config(e.to_string()))?;
    println!("{rendered}");
    Ok(())
}
