// tests/gemini_client.rs
// Gemini client against a local generateContent stub.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use viet_chatbot::chat::ChatEngine;
use viet_chatbot::config::ChatbotConfig;
use viet_chatbot::gemini::{
    AgentError, Conversation, ConversationAgent, GeminiAgent, GeminiSettings,
};
use viet_chatbot::intents::{IntentSet, Lexicon};
use viet_chatbot::session::TurnSource;

#[derive(Clone, Copy)]
enum Behavior {
    Answer,
    Fail,
    Stall,
    Blocked,
}

#[derive(Clone)]
struct Stub {
    behavior: Behavior,
    requests: Arc<Mutex<Vec<Value>>>,
    api_keys: Arc<Mutex<Vec<String>>>,
}

async fn generate(
    State(stub): State<Stub>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    let key = headers
        .get("x-goog-api-key")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    stub.api_keys.lock().await.push(key);
    stub.requests.lock().await.push(body);

    match stub.behavior {
        Behavior::Answer => (
            StatusCode::OK,
            Json(json!({
                "candidates": [{
                    "content": {
                        "role": "model",
                        "parts": [{ "text": "**Chào bạn!**  Các bước:\n1. Mở máy\n2. Chạy lệnh" }]
                    },
                    "finishReason": "STOP"
                }]
            })),
        ),
        Behavior::Fail => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": { "code": 500, "message": "backend down" } })),
        ),
        Behavior::Stall => {
            tokio::time::sleep(Duration::from_secs(5)).await;
            (StatusCode::OK, Json(json!({ "candidates": [] })))
        }
        Behavior::Blocked => (
            StatusCode::OK,
            Json(json!({ "promptFeedback": { "blockReason": "SAFETY" } })),
        ),
    }
}

async fn spawn_stub(behavior: Behavior) -> (String, Stub) {
    let stub = Stub {
        behavior,
        requests: Arc::new(Mutex::new(Vec::new())),
        api_keys: Arc::new(Mutex::new(Vec::new())),
    };
    let app = Router::new()
        .route("/v1beta/models/{action}", post(generate))
        .with_state(stub.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{addr}"), stub)
}

fn settings(base_url: &str, timeout: Duration) -> GeminiSettings {
    GeminiSettings {
        api_key: "test-key".into(),
        model: "gemini-2.0-flash".into(),
        base_url: base_url.into(),
        timeout,
        temperature: 0.7,
        top_k: 1,
        top_p: 1.0,
        max_output_tokens: 2048,
    }
}

#[tokio::test]
async fn test_conversation_keeps_history_and_formats_reply() {
    let (base, stub) = spawn_stub(Behavior::Answer).await;
    let agent = GeminiAgent::new(settings(&base, Duration::from_secs(5))).unwrap();

    let conversation = agent.create_conversation().await.unwrap();
    let reply = conversation.send_turn("Xin chào").await.unwrap();
    assert_eq!(reply, "Chào bạn! Các bước: \n• Mở máy \n• Chạy lệnh");

    conversation.send_turn("Cảm ơn").await.unwrap();

    let requests = stub.requests.lock().await;
    assert_eq!(requests.len(), 2);

    // Primer pair + first user turn
    let first = requests[0]["contents"].as_array().unwrap();
    assert_eq!(first.len(), 3);
    assert_eq!(first[0]["role"], "user");
    assert_eq!(first[1]["role"], "model");
    assert_eq!(first[2]["parts"][0]["text"], "Xin chào");

    // Previous exchange is resent
    let second = requests[1]["contents"].as_array().unwrap();
    assert_eq!(second.len(), 5);
    assert_eq!(second[3]["role"], "model");
    assert_eq!(second[4]["parts"][0]["text"], "Cảm ơn");

    let config = &requests[0]["generationConfig"];
    assert_eq!(config["topK"], 1);
    assert_eq!(config["maxOutputTokens"], 2048);

    assert!(stub.api_keys.lock().await.iter().all(|k| k == "test-key"));
}

#[tokio::test]
async fn test_error_status_is_reported() {
    let (base, _stub) = spawn_stub(Behavior::Fail).await;
    let agent = GeminiAgent::new(settings(&base, Duration::from_secs(5))).unwrap();
    let conversation = agent.create_conversation().await.unwrap();

    let err = conversation.send_turn("hi").await.unwrap_err();
    assert!(matches!(err, AgentError::Api { status: 500, .. }));
}

#[tokio::test]
async fn test_blocked_prompt_is_an_error() {
    let (base, _stub) = spawn_stub(Behavior::Blocked).await;
    let agent = GeminiAgent::new(settings(&base, Duration::from_secs(5))).unwrap();
    let conversation = agent.create_conversation().await.unwrap();

    assert!(matches!(
        conversation.send_turn("hi").await,
        Err(AgentError::Blocked(reason)) if reason == "SAFETY"
    ));
}

#[tokio::test]
async fn test_slow_backend_times_out() {
    let (base, _stub) = spawn_stub(Behavior::Stall).await;
    let agent = GeminiAgent::new(settings(&base, Duration::from_millis(300))).unwrap();
    let conversation = agent.create_conversation().await.unwrap();

    assert!(matches!(
        conversation.send_turn("hi").await,
        Err(AgentError::Timeout(_))
    ));
}

#[tokio::test]
async fn test_engine_probe_and_delegation() {
    let (base, stub) = spawn_stub(Behavior::Answer).await;
    let config = ChatbotConfig::from_lookup(move |key| match key {
        "GEMINI_API_KEY" => Some("test-key".to_string()),
        "API_URL" => Some(base.clone()),
        "TRAIN_EPOCHS" => Some("5".to_string()),
        _ => None,
    });

    let engine = ChatEngine::from_config(&config).unwrap();
    engine.initialize().await;
    assert!(engine.agent_available());

    // Complex-question marker forces delegation regardless of intent
    let reply = engine.reply("s1", "Tại sao bầu trời màu xanh?").await.unwrap();
    assert!(reply.is_gemini_response);
    assert_eq!(reply.intent, "gemini");
    assert_eq!(reply.confidence, 1.0);

    // Probe plus one delegated turn
    assert_eq!(stub.requests.lock().await.len(), 2);
    assert_eq!(engine.history("s1").await[1].source, TurnSource::External);
}

#[tokio::test]
async fn test_engine_falls_back_when_backend_fails() {
    let (base, _stub) = spawn_stub(Behavior::Fail).await;
    let config = ChatbotConfig::from_lookup(move |key| match key {
        "GEMINI_API_KEY" => Some("test-key".to_string()),
        "API_URL" => Some(base.clone()),
        "TRAIN_EPOCHS" => Some("5".to_string()),
        _ => None,
    });

    let engine = ChatEngine::new(
        &config,
        IntentSet::builtin().unwrap(),
        Lexicon::builtin().unwrap(),
        Some(Arc::new(GeminiAgent::from_config(&config).unwrap())),
    );
    engine.initialize().await;
    assert!(!engine.agent_available());

    let reply = engine.reply("s1", "Tại sao bầu trời màu xanh?").await.unwrap();
    assert!(!reply.is_gemini_response);
    assert_ne!(reply.intent, "gemini");
}
