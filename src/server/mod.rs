//! HTTP server
//!
//! - POST /api/chat - Classify, route and answer one message
//! - GET /api/history/{session_id} - Session history
//! - GET /api/status - Model and Gemini readiness
//! - GET /api/docs - API self-description
//! - GET / - Browser client

pub mod error;
pub mod handlers;
pub mod types;

use anyhow::Result;
use axum::{
    body::Body,
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method, Request},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, info_span, warn};
use uuid::Uuid;

use crate::chat::ChatEngine;
use crate::config::ChatbotConfig;

pub use error::{ApiError, ApiResult};

/// Upper bound on a chat request body.
pub const MAX_BODY_BYTES: usize = 64 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<ChatEngine>,
}

impl AppState {
    pub fn new(engine: Arc<ChatEngine>) -> Self {
        Self { engine }
    }
}

fn cors_layer(origin: &str) -> CorsLayer {
    let allow_origin = if origin.trim() == "*" {
        AllowOrigin::from(Any)
    } else {
        match HeaderValue::from_str(origin.trim()) {
            Ok(value) => AllowOrigin::exact(value),
            Err(_) => {
                warn!("Invalid CORS_ORIGIN '{}', allowing any origin", origin);
                AllowOrigin::from(Any)
            }
        }
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
}

/// Create the router with all endpoints
pub fn create_router(state: AppState, cors_origin: &str) -> Router {
    let trace = TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
        info_span!(
            "http",
            request_id = %Uuid::new_v4(),
            method = %request.method(),
            uri = %request.uri(),
        )
    });

    Router::new()
        .route("/", get(handlers::index_handler))
        .route(
            "/api/chat",
            post(handlers::chat_handler).layer(DefaultBodyLimit::max(MAX_BODY_BYTES)),
        )
        .route("/api/history/{session_id}", get(handlers::history_handler))
        .route("/api/status", get(handlers::status_handler))
        .route("/api/docs", get(handlers::docs_handler))
        .layer(trace)
        .layer(cors_layer(cors_origin))
        .with_state(state)
}

/// Run the HTTP server until Ctrl-C
pub async fn run(engine: Arc<ChatEngine>, config: &ChatbotConfig) -> Result<()> {
    let app = create_router(AppState::new(engine), &config.cors_origin);

    let listener = tokio::net::TcpListener::bind(config.bind_address()).await?;
    info!("Server listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => {
            error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    }
}
