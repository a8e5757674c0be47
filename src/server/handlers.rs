// src/server/handlers.rs

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    response::{Html, Json},
};
use serde_json::{json, Value};
use tracing::{debug, info};

use super::error::{ApiError, ApiResult, EMPTY_MESSAGE};
use super::types::{ChatRequest, ChatResponse, Pong};
use super::AppState;
use crate::chat::EngineStatus;
use crate::session::Turn;

const INDEX_HTML: &str = include_str!("../../static/index.html");

pub async fn chat_handler(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> ApiResult<Json<ChatResponse>> {
    let Json(request) = payload?;

    if request.is_ping() {
        debug!("Connection test");
        return Ok(Json(ChatResponse::Pong(Pong { status: "ok" })));
    }

    let Some(message) = request.message.as_deref() else {
        return Err(ApiError::bad_request(EMPTY_MESSAGE));
    };

    let session_id = request.session();
    let reply = state.engine.reply(session_id, message).await?;
    info!(
        session_id,
        intent = %reply.intent,
        confidence = reply.confidence,
        gemini = reply.is_gemini_response,
        "Chat reply sent"
    );

    Ok(Json(ChatResponse::Reply(reply)))
}

pub async fn history_handler(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Json<Vec<Turn>> {
    Json(state.engine.history(&session_id).await)
}

pub async fn status_handler(State(state): State<AppState>) -> Json<EngineStatus> {
    Json(state.engine.status().await)
}

pub async fn docs_handler() -> Json<Value> {
    Json(json!({
        "name": "Vietnamese Chatbot API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "POST /api/chat": {
                "description": "Send a message and receive the bot's reply",
                "request": {
                    "message": "string (required)",
                    "sessionId": "string (optional, defaults to \"default\")"
                },
                "response": {
                    "response": "string",
                    "intent": "string (\"gemini\" when answered by Gemini)",
                    "confidence": "number between 0 and 1",
                    "isGeminiResponse": "boolean"
                },
                "example": {
                    "request": { "message": "Xin chào", "sessionId": "user123" },
                    "response": {
                        "response": "Xin chào! Tôi có thể giúp gì cho bạn?",
                        "intent": "greeting",
                        "confidence": 0.98,
                        "isGeminiResponse": false
                    }
                },
                "errors": {
                    "400": "message missing, empty, or body is not valid JSON",
                    "503": "model still initializing (see Retry-After) or failed to train",
                    "500": "unexpected processing error"
                }
            },
            "GET /api/history/:sessionId": {
                "description": "Conversation history of a session, oldest first",
                "response": [{
                    "type": "user | bot",
                    "message": "string",
                    "timestamp": "RFC 3339 string",
                    "intent": "string (bot turns)",
                    "confidence": "number (bot turns)",
                    "source": "local | external"
                }]
            },
            "GET /api/status": {
                "description": "Model and Gemini readiness",
                "response": {
                    "status": "ok",
                    "model": "initializing | ready | failed",
                    "gemini": "boolean",
                    "sessions": "number",
                    "vocabularySize": "number (once ready)",
                    "intents": "number"
                }
            }
        }
    }))
}

pub async fn index_handler() -> Html<&'static str> {
    Html(INDEX_HTML)
}
