
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{error, info, warn};

use crate::RagError;
use crate::config::Config;
use crate::enhance::QueryEnhancer;
use crate::ingest::{Ingestor, SourceMap};
use crate::ollama::OllamaClient;
use crate::store::VectorStore;

/// Shared state behind every connection: configuration, the Ollama
/// client, and the vector store.
///
/// The store is process-wide mutable state guarded by a mutex, so
/// individual operations are serialized. There is no isolation across
/// operations: a query racing another connection's `new_chat` or ingest
/// may observe an empty or partially repopulated collection.
pub struct SessionState {
    config: Config,
    ollama: OllamaClient,
    store: Mutex<VectorStore>,
}

impl SessionState {
    #[inline]
    pub async fn new(config: Config) -> crate::Result<Self> {
        let ollama = OllamaClient::new(&config.ollama)?;
        let store = VectorStore::connect(&config.collection).await?;

        Ok(Self {
            config,
            ollama,
            store: Mutex::new(store),
        })
    }
}

/// A recognized inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// `{"action": "new_chat"}`: reset the collection.
    NewChat,
    /// `{"query": ..., "sources": {...}}`: ingest the sources, then
    /// answer the query against them.
    Query { query: String, sources: SourceMap },
}

/// All recognized fields of an inbound message; extra fields are ignored.
#[derive(Debug, Deserialize)]
struct RawRequest {
    action: Option<String>,
    query: Option<String>,
    sources: Option<SourceMap>,
}

impl Request {
    /// Parse an inbound text frame, with a caller-facing description of
    /// what is missing or malformed on failure.
    #[inline]
    pub fn parse(text: &str) -> Result<Self, String> {
        let raw: RawRequest =
            serde_json::from_str(text).map_err(|e| format!("Invalid JSON message: {e}"))?;

        if let Some(action) = raw.action {
            return if action == "new_chat" {
                Ok(Request::NewChat)
            } else {
                Err(format!("Unknown action '{action}'"))
            };
        }

        let Some(query) = raw.query else {
            return Err("Missing 'query' in request".to_string());
        };
        let Some(sources) = raw.sources else {
            return Err("Missing 'sources' in request".to_string());
        };
        if sources.is_empty() {
            return Err("Missing 'sources' in request".to_string());
        }

        Ok(Request::Query { query, sources })
    }
}

/// An outbound message; serializes to `{"response": ...}` or
/// `{"error": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Reply {
    Response(String),
    Error(String),
}

/// Bind the configured address and serve connections until the process
/// is stopped.
#[inline]
pub async fn serve(config: Config) -> crate::Result<()> {
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = Arc::new(SessionState::new(config).await?);

    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| RagError::Transport(format!("Failed to bind {}: {}", addr, e)))?;

    info!("WebSocket server listening on {}", addr);
    serve_with_listener(state, listener).await
}

/// Accept loop over an already-bound listener; one task per connection.
#[inline]
pub async fn serve_with_listener(
    state: Arc<SessionState>,
    listener: TcpListener,
) -> crate::Result<()> {
    loop {
        let (stream, peer) = listener
            .accept()
            .await
            .map_err(|e| RagError::Transport(format!("Failed to accept connection: {}", e)))?;

        tokio::spawn(handle_connection(Arc::clone(&state), stream, peer));
    }
}

/// Serve one connection: read text frames, handle them strictly in
/// arrival order, write one reply per frame.
async fn handle_connection(state: Arc<SessionState>, stream: TcpStream, peer: SocketAddr) {
    info!("New WebSocket connection from {}", peer);

    let websocket = match accept_async(stream).await {
        Ok(websocket) => websocket,
        Err(e) => {
            error!("WebSocket handshake failed for {}: {}", peer, e);
            return;
        }
    };

    let (mut sink, mut source) = websocket.split();

    while let Some(message) = source.next().await {
        let message = match message {
            Ok(message) => message,
            Err(e) => {
                error!("WebSocket connection error for {}: {}", peer, e);
                break;
            }
        };

        match message {
            Message::Text(text) => {
                let reply = handle_request(&state, text.as_str()).await;
                let payload = match serde_json::to_string(&reply) {
                    Ok(payload) => payload,
                    Err(e) => {
                        error!("Failed to serialize reply: {}", e);
                        continue;
                    }
                };
                if let Err(e) = sink.send(Message::text(payload)).await {
                    error!("Failed to send reply to {}: {}", peer, e);
                    break;
                }
            }
            Message::Ping(payload) => {
                if sink.send(Message::Pong(payload)).await.is_err() {
                    break;
                }
            }
            Message::Close(_) => break,
            _ => {}
        }
    }

    info!("WebSocket connection closed for {}", peer);
}

/// Handle one parsed message against the shared state.
async fn handle_request(state: &SessionState, text: &str) -> Reply {
    let request = match Request::parse(text) {
        Ok(request) => request,
        Err(e) => {
            warn!("Rejecting malformed message: {}", e);
            return Reply::Error(e);
        }
    };

    match request {
        Request::NewChat => {
            let mut store = state.store.lock().await;
            match store.reset().await {
                Ok(()) => Reply::Response("New chat started.".to_string()),
                Err(e) => {
                    error!("Failed to reset collection: {}", e);
                    Reply::Error("Failed to reset the collection.".to_string())
                }
            }
        }
        Request::Query { query, sources } => {
            info!("Handling query over {} sources", sources.len());

            let ingestor = Ingestor::new(&state.ollama, &state.config);
            let mut store = state.store.lock().await;

            if let Err(e) = ingestor.ingest(&mut store, &sources).await {
                error!("Error processing request: {}", e);
                return Reply::Error(
                    "An error occurred while processing your request.".to_string(),
                );
            }

            let enhancer = QueryEnhancer::new(&state.ollama, state.config.query.max_results);
            Reply::Response(enhancer.answer(&store, &query).await)
        }
    }
}
