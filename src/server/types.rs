// src/server/types.rs

use serde::{Deserialize, Serialize};

use crate::chat::ChatReply;

/// Session used when a client sends no `sessionId`.
pub const DEFAULT_SESSION: &str = "default";

/// Health-check pair the browser client sends on load.
pub const PING_MESSAGE: &str = "ping";
pub const PING_SESSION: &str = "connection-test";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
}

impl ChatRequest {
    pub fn is_ping(&self) -> bool {
        self.message.as_deref() == Some(PING_MESSAGE)
            && self.session_id.as_deref() == Some(PING_SESSION)
    }

    pub fn session(&self) -> &str {
        self.session_id
            .as_deref()
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_SESSION)
    }
}

#[derive(Debug, Serialize)]
pub struct Pong {
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ChatResponse {
    Pong(Pong),
    Reply(ChatReply),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ping_detection() {
        let ping: ChatRequest =
            serde_json::from_value(json!({ "message": "ping", "sessionId": "connection-test" })).unwrap();
        assert!(ping.is_ping());

        let not_ping: ChatRequest =
            serde_json::from_value(json!({ "message": "ping", "sessionId": "s1" })).unwrap();
        assert!(!not_ping.is_ping());
    }

    #[test]
    fn test_missing_fields_are_tolerated() {
        let request: ChatRequest = serde_json::from_value(json!({})).unwrap();
        assert!(request.message.is_none());
        assert_eq!(request.session(), DEFAULT_SESSION);
    }

    #[test]
    fn test_pong_shape() {
        let value = serde_json::to_value(ChatResponse::Pong(Pong { status: "ok" })).unwrap();
        assert_eq!(value, json!({ "status": "ok" }));
    }
}
