//! External conversational agent
//!
//! The chat engine only sees two operations: open a conversation, and send a
//! turn on it. `GeminiAgent` implements them over Gemini's generateContent
//! REST API, keeping the running conversation on the handle.

mod client;

pub use client::{GeminiAgent, GeminiConversation, GeminiSettings};

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("GEMINI_API_KEY not set")]
    MissingApiKey,

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Gemini API error: {status} - {body}")]
    Api { status: u16, body: String },

    #[error("Gemini blocked the prompt: {0}")]
    Blocked(String),

    #[error("Gemini returned an empty reply")]
    EmptyReply,

    #[error("Gemini did not answer within {0:?}")]
    Timeout(Duration),
}

/// One running conversation with the agent. Turns on the same handle are serialized.
#[async_trait]
pub trait Conversation: Send + Sync {
    async fn send_turn(&self, text: &str) -> Result<String, AgentError>;
}

#[async_trait]
pub trait ConversationAgent: Send + Sync {
    async fn create_conversation(&self) -> Result<Arc<dyn Conversation>, AgentError>;

    /// Provider name for logging
    fn name(&self) -> &'static str;
}

static BOLD_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*{2,}").expect("valid regex"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));
static LIST_MARKERS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+\.|•)").expect("valid regex"));

/// Flatten agent markdown into chat-bubble text: drop `**` runs, collapse
/// whitespace, and start each numbered or bulleted item on its own `•` line.
pub fn format_response(text: &str) -> String {
    let text = BOLD_RUNS.replace_all(text, "");
    let text = WHITESPACE.replace_all(&text, " ");
    let text = LIST_MARKERS.replace_all(text.trim(), "\n•");
    text.trim_start_matches('\n').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_strips_bold_and_whitespace() {
        assert_eq!(format_response("  **Xin chào**   bạn\n\n nhé "), "Xin chào bạn nhé");
    }

    #[test]
    fn test_format_bullets() {
        let out = format_response("Các bước: 1. Mở máy 2. Chạy lệnh");
        assert_eq!(out, "Các bước: \n• Mở máy \n• Chạy lệnh");

        let out = format_response("• một • hai");
        assert_eq!(out, "• một \n• hai");
    }

    #[test]
    fn test_format_keeps_single_asterisk() {
        assert_eq!(format_response("a * b"), "a * b");
    }
}
