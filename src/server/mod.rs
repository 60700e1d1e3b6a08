//! Browser backend: a small HTTP service in front of the chat model
//!
//! Stateless: every `/api/chat` call builds a fresh two-message
//! conversation. Nothing is shared between requests except read-only
//! configuration and the HTTP client pool.

pub mod auth;
pub mod http;

use anyhow::{Context, Result};
use axum::{
    http::{header::CONTENT_TYPE, HeaderName, HeaderValue, Method},
    middleware,
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::agent::llm::{ChatBackend, OllamaClient};
use crate::config::Config;

/// Origins a local extension or dev page is served from
const DEFAULT_ORIGINS: &[&str] = &[
    "http://localhost:5000",
    "http://127.0.0.1:5000",
    "http://localhost:5500",
    "http://127.0.0.1:5500",
    "null",
];

/// Shared server state
#[derive(Clone)]
pub struct ServerState {
    /// Assistant name used in replies and the system prompt
    pub name: String,
    /// Model reported by `/api/status`
    pub model: String,
    /// Required `x-api-key` value; empty disables the check
    pub api_key: String,
    /// Extra CORS origin
    pub frontend_origin: Option<String>,
    pub backend: Arc<dyn ChatBackend>,
}

impl ServerState {
    /// State for `config`, talking to the configured chat endpoint
    pub fn from_config(config: &Config) -> Self {
        let backend = OllamaClient::new(&config.model.endpoint, &config.server.model)
            .with_timeout(Duration::from_secs(config.server.request_timeout_secs));
        Self {
            name: config.assistant.name.clone(),
            model: config.server.model.clone(),
            api_key: config.server.api_key.clone(),
            frontend_origin: config.server.frontend_origin.clone(),
            backend: Arc::new(backend),
        }
    }
}

/// Origins allowed to call the API from a browser
pub fn allowed_origins(frontend_origin: Option<&str>) -> Vec<HeaderValue> {
    let mut origins: Vec<&str> = DEFAULT_ORIGINS.to_vec();
    origins.extend(frontend_origin.map(str::trim).filter(|o| !o.is_empty()));
    origins
        .into_iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect()
}

/// Build the service's router
pub fn build_router(state: ServerState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed_origins(state.frontend_origin.as_deref())))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, HeaderName::from_static(auth::API_KEY_HEADER)]);

    // Routes behind the API key gate
    let protected = Router::new()
        .route("/api/chat", post(http::chat_handler))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::api_key_middleware,
        ));

    // Public routes
    let public = Router::new()
        .route("/", get(http::index_handler))
        .route("/api/status", get(http::status_handler))
        .route("/api/health", get(http::health_handler));

    Router::new()
        .merge(protected)
        .merge(public)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the web server
pub async fn start(config: &Config, host: Option<String>, port: Option<u16>) -> Result<()> {
    let host = host.unwrap_or_else(|| config.server.host.clone());
    let port = port.unwrap_or(config.server.port);
    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .with_context(|| format!("Invalid bind address {}:{}", host, port))?;

    let state = ServerState::from_config(config);
    let gated = !state.api_key.is_empty();
    let app = build_router(state);

    println!("========================================");
    println!("     {} Backend Starting", config.assistant.name);
    println!("========================================");
    println!();
    println!("  Binding to:  {}", addr);
    println!("  Model:       {}", config.server.model);
    println!("  Endpoint:    {}", config.model.endpoint);
    println!("  API key:     {}", if gated { "required" } else { "not required" });
    println!("  Debug:       {}", config.server.debug);
    println!();

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    Ok(())
}
