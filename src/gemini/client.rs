//! Gemini generateContent client
//!
//! The REST API is stateless, so each `GeminiConversation` carries its own
//! content history and resends it on every turn.

use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use super::{format_response, AgentError, Conversation, ConversationAgent};
use crate::config::ChatbotConfig;

/// Primer sent as the first exchange of every conversation.
const PRIMER_USER: &str = "Xin chào, bạn có thể nói tiếng Việt không?";
const PRIMER_MODEL: &str = "Vâng, tôi có thể nói tiếng Việt rất tốt. Tôi là trợ lý AI, tôi sẽ cố gắng giúp đỡ bạn một cách tốt nhất.";

#[derive(Debug, Clone)]
pub struct GeminiSettings {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
    pub temperature: f32,
    pub top_k: u32,
    pub top_p: f32,
    pub max_output_tokens: u32,
}

impl GeminiSettings {
    pub fn from_config(config: &ChatbotConfig) -> Result<Self, AgentError> {
        let api_key = config.gemini_api_key.clone().ok_or(AgentError::MissingApiKey)?;
        Ok(Self {
            api_key,
            model: config.gemini_model.clone(),
            base_url: config.gemini_base_url.trim_end_matches('/').to_string(),
            timeout: config.gemini_timeout(),
            temperature: config.gemini_temperature,
            top_k: config.gemini_top_k,
            top_p: config.gemini_top_p,
            max_output_tokens: config.gemini_max_output_tokens,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model)
    }

    fn generation_config(&self) -> GenerationConfig {
        GenerationConfig {
            temperature: self.temperature,
            top_k: self.top_k,
            top_p: self.top_p,
            max_output_tokens: self.max_output_tokens,
        }
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    role: String,
    #[serde(default)]
    parts: Vec<Part>,
}

impl Content {
    fn text(role: &str, text: &str) -> Self {
        Self {
            role: role.to_string(),
            parts: vec![Part {
                text: Some(text.to_string()),
            }],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_k: u32,
    top_p: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: &'a [Content],
    generation_config: GenerationConfig,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

impl GenerateResponse {
    fn into_text(self) -> Result<String, AgentError> {
        if let Some(reason) = self.prompt_feedback.and_then(|f| f.block_reason) {
            return Err(AgentError::Blocked(reason));
        }

        let text: String = self
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            Err(AgentError::EmptyReply)
        } else {
            Ok(text)
        }
    }
}

// ============================================================================
// Agent
// ============================================================================

/// Gemini-backed conversational agent.
#[derive(Clone)]
pub struct GeminiAgent {
    client: HttpClient,
    settings: Arc<GeminiSettings>,
}

impl GeminiAgent {
    pub fn new(settings: GeminiSettings) -> Result<Self, AgentError> {
        let client = HttpClient::builder().timeout(settings.timeout).build()?;
        Ok(Self {
            client,
            settings: Arc::new(settings),
        })
    }

    pub fn from_config(config: &ChatbotConfig) -> Result<Self, AgentError> {
        Self::new(GeminiSettings::from_config(config)?)
    }

    pub fn settings(&self) -> &GeminiSettings {
        &self.settings
    }

    async fn generate(&self, contents: &[Content]) -> Result<String, AgentError> {
        let request = GenerateRequest {
            contents,
            generation_config: self.settings.generation_config(),
        };

        let response = self
            .client
            .post(self.settings.endpoint())
            .header("x-goog-api-key", &self.settings.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(AgentError::Api { status, body });
        }

        let parsed: GenerateResponse = response.json().await.map_err(|e| self.classify(e))?;
        parsed.into_text()
    }

    fn classify(&self, e: reqwest::Error) -> AgentError {
        if e.is_timeout() {
            AgentError::Timeout(self.settings.timeout)
        } else {
            AgentError::Network(e)
        }
    }
}

#[async_trait]
impl ConversationAgent for GeminiAgent {
    async fn create_conversation(&self) -> Result<Arc<dyn Conversation>, AgentError> {
        Ok(Arc::new(GeminiConversation {
            agent: self.clone(),
            history: Mutex::new(vec![
                Content::text("user", PRIMER_USER),
                Content::text("model", PRIMER_MODEL),
            ]),
        }))
    }

    fn name(&self) -> &'static str {
        "Gemini"
    }
}

/// A running Gemini chat. History grows by one user/model pair per successful turn.
pub struct GeminiConversation {
    agent: GeminiAgent,
    history: Mutex<Vec<Content>>,
}

impl GeminiConversation {
    pub async fn turns(&self) -> usize {
        self.history.lock().await.len() / 2
    }
}

#[async_trait]
impl Conversation for GeminiConversation {
    async fn send_turn(&self, text: &str) -> Result<String, AgentError> {
        let mut history = self.history.lock().await;

        let mut contents = history.clone();
        contents.push(Content::text("user", text));

        let reply = self.agent.generate(&contents).await?;

        history.push(Content::text("user", text));
        history.push(Content::text("model", &reply));

        Ok(format_response(&reply))
    }
}
