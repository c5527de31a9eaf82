
use tracing::{error, info, warn};

use crate::ollama::{ChatMessage, GenerateError, OllamaClient};
use crate::store::{QueryResult, VectorStore};

/// Reply when the vector store (or the query embedding) failed.
pub const STORE_ERROR_REPLY: &str = "Error retrieving context from the database.";

/// Reply when retrieval produced no matching chunks.
pub const NO_CONTEXT_REPLY: &str = "No relevant context found in the database.";

/// Separator between attributed context blocks in the grounding prompt.
const CONTEXT_SEPARATOR: &str = "\n---\n";

/// Retrieves grounding context for a query and forwards the grounded
/// prompt to the generation model.
pub struct QueryEnhancer<'a> {
    ollama: &'a OllamaClient,
    max_results: usize,
}

impl<'a> QueryEnhancer<'a> {
    #[inline]
    pub fn new(ollama: &'a OllamaClient, max_results: usize) -> Self {
        Self {
            ollama,
            max_results,
        }
    }

    /// Answer a query using the top-K most similar stored chunks.
    ///
    /// This never fails outward: every error class maps to a
    /// human-readable reply string. When retrieval comes back empty the
    /// generation model is not called at all.
    #[inline]
    pub async fn answer(&self, store: &VectorStore, query: &str) -> String {
        info!("Enhancing query: {}", query);

        let embedding = match self.ollama.embed(query) {
            Ok(embedding) => embedding,
            Err(e) => {
                error!("Failed to embed query: {}", e);
                return STORE_ERROR_REPLY.to_string();
            }
        };

        let results = match store.search(&embedding, self.max_results).await {
            Ok(results) => results,
            Err(e) => {
                error!("Error querying the vector store: {}", e);
                return STORE_ERROR_REPLY.to_string();
            }
        };

        if results.is_empty() {
            warn!("No relevant documents found for the query");
            return NO_CONTEXT_REPLY.to_string();
        }

        let context = format_context(&results);
        let prompt = build_prompt(&context, query);

        match self.ollama.chat(&[ChatMessage::user(prompt)]) {
            Ok(answer) => {
                info!("LLM response: {}", answer);
                answer
            }
            Err(GenerateError::ModelNotFound { model }) => {
                let reply = format!(
                    "The model '{model}' is not available. Please install it using 'ollama pull {model}'"
                );
                error!("{}", reply);
                reply
            }
            Err(GenerateError::Other(e)) => {
                error!("Error interacting with the LLM: {}", e);
                format!("Error interacting with the LLM: {e}")
            }
        }
    }
}

/// Format retrieved chunks as attributed context blocks:
/// `[Source: <source_id>, Section: <heading>]` followed by the chunk text,
/// blocks joined by a separator line.
#[inline]
pub fn format_context(results: &[QueryResult]) -> String {
    results
        .iter()
        .map(|result| {
            format!(
                "[Source: {}, Section: {}]\n{}",
                result.source_id, result.heading, result.content
            )
        })
        .collect::<Vec<_>>()
        .join(CONTEXT_SEPARATOR)
}

fn build_prompt(context: &str, query: &str) -> String {
    format!(
        "Based on the following relevant context:\n\n{context}\n\nPlease answer this query: {query}\n\nProvide detailed responses and reference specific sources when possible."
    )
}
