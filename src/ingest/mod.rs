#[cfg(test)]
mod tests;

use anyhow::{Context, Result, anyhow};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, info, warn};
use ureq::Agent;

use crate::chunker::chunk_text;
use crate::config::Config;
use crate::extractor::extract_sections;
use crate::ollama::OllamaClient;
use crate::store::{StoredDocument, VectorStore};

const FETCH_TIMEOUT_SECONDS: u64 = 30;
const USER_AGENT: &str = "rag-bridge/0.1.0 (RAG Content Ingestor)";

/// Source identifier mapped to optional raw markup.
///
/// `None` means "fetch the source by identifier over HTTP"; `Some` means
/// the caller already supplied the markup (e.g. a browser extension
/// shipping the page's DOM).
pub type SourceMap = BTreeMap<String, Option<String>>;

/// A chunk with its identity and provenance, ready for embedding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingChunk {
    pub id: String,
    pub content: String,
    pub source_id: String,
    pub heading: String,
    pub section_type: String,
    pub chunk_index: usize,
}

/// HTTP client for resolving fetch-by-identifier sources.
///
/// Single attempt per request: failures are surfaced once and the source
/// is skipped, never retried.
#[derive(Debug)]
pub struct HttpClient {
    agent: Agent,
}

impl HttpClient {
    #[inline]
    pub fn new() -> Self {
        let agent = Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(FETCH_TIMEOUT_SECONDS)))
            .user_agent(USER_AGENT)
            .build()
            .into();

        Self { agent }
    }

    /// Fetch a URL and return the response body as text.
    #[inline]
    pub fn get(&self, url: &str) -> Result<String> {
        debug!("Making HTTP GET request to: {}", url);

        match self.agent.get(url).call() {
            Ok(mut response) => response
                .body_mut()
                .read_to_string()
                .with_context(|| format!("Failed to read response body from {}", url)),
            Err(ureq::Error::StatusCode(status)) => {
                Err(anyhow!("HTTP error {} fetching {}", status, url))
            }
            Err(e) => Err(anyhow!("Failed to fetch {}: {}", url, e)),
        }
    }
}

impl Default for HttpClient {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

/// Runs the extraction/chunking/embedding pipeline over a set of sources
/// and replaces the vector store's corpus with the result.
pub struct Ingestor<'a> {
    http: HttpClient,
    ollama: &'a OllamaClient,
    config: &'a Config,
}

impl<'a> Ingestor<'a> {
    #[inline]
    pub fn new(ollama: &'a OllamaClient, config: &'a Config) -> Self {
        Self {
            http: HttpClient::new(),
            ollama,
            config,
        }
    }

    /// Resolve, extract, and chunk every source into identified chunks.
    ///
    /// Per-source failures (fetch errors, empty extractions) are logged
    /// and skipped; they never abort the rest of the batch. Ids are
    /// `doc_{source_idx}_{section_idx}_{chunk_idx}`, separator-delimited
    /// so distinct triples can never collide.
    #[inline]
    pub fn collect(&self, sources: &SourceMap) -> Vec<PendingChunk> {
        let chunker = self.config.content.chunker();
        let mut pending = Vec::new();

        for (source_idx, (source_id, raw)) in sources.iter().enumerate() {
            let html = match self.resolve(source_id, raw.as_deref()) {
                Ok(html) => html,
                Err(e) => {
                    warn!("Skipping source {}: {}", source_id, e);
                    continue;
                }
            };

            let sections = extract_sections(&html, source_id);
            if sections.is_empty() {
                warn!("No content extracted from source: {}", source_id);
                continue;
            }

            for (section_idx, section) in sections.iter().enumerate() {
                let chunks = chunk_text(&section.content, &chunker);
                for (chunk_idx, content) in chunks.into_iter().enumerate() {
                    pending.push(PendingChunk {
                        id: format!("doc_{}_{}_{}", source_idx, section_idx, chunk_idx),
                        content,
                        source_id: section.source_id.clone(),
                        heading: section.heading.clone(),
                        section_type: section.section_type.clone(),
                        chunk_index: chunk_idx,
                    });
                }
            }
        }

        pending
    }

    /// Embed the collected chunks and replace the collection with them.
    ///
    /// A per-chunk embedding failure drops that chunk from the index. If
    /// nothing survives, the store is left untouched. Otherwise the
    /// collection is reset and the documents are added in
    /// `content.batch_size` slices.
    ///
    /// Returns the number of documents committed.
    #[inline]
    pub async fn ingest(
        &self,
        store: &mut VectorStore,
        sources: &SourceMap,
    ) -> crate::Result<usize> {
        info!("Ingesting content from {} sources", sources.len());

        let pending = self.collect(sources);

        let mut documents = Vec::with_capacity(pending.len());
        for chunk in pending {
            match self.ollama.embed(&chunk.content) {
                Ok(vector) => documents.push(StoredDocument {
                    id: chunk.id,
                    vector,
                    content: chunk.content,
                    source_id: chunk.source_id,
                    heading: chunk.heading,
                    section_type: chunk.section_type,
                    chunk_index: chunk.chunk_index as u32,
                }),
                Err(e) => {
                    warn!("Skipping chunk {}: embedding failed: {}", chunk.id, e);
                }
            }
        }

        if documents.is_empty() {
            warn!("No documents to ingest, leaving the collection untouched");
            return Ok(0);
        }

        store.reset().await?;

        let total = documents.len();
        for batch in documents.chunks(self.config.content.batch_size) {
            store.add_batch(batch).await?;
        }

        info!("Ingested {} chunks from {} sources", total, sources.len());
        Ok(total)
    }

    fn resolve(&self, source_id: &str, raw: Option<&str>) -> Result<String> {
        match raw {
            Some(markup) => Ok(wrap_bare_markup(markup)),
            None => self.http.get(source_id),
        }
    }
}

/// Give directly-supplied markup a minimal document shell when it lacks
/// one, so the extractor sees a full document either way.
fn wrap_bare_markup(markup: &str) -> String {
    if has_document_wrapper(markup) {
        markup.to_string()
    } else {
        format!("<!DOCTYPE html><html><body>{}</body></html>", markup)
    }
}

fn has_document_wrapper(markup: &str) -> bool {
    let prefix: String = markup
        .trim_start()
        .chars()
        .take(9)
        .collect::<String>()
        .to_ascii_lowercase();
    prefix.starts_with("<!doctype") || prefix.starts_with("<html")
}
