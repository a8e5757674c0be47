// src/chat/mod.rs
// Chat engine: owns the corpus, the trained model, the routing policy, the
// session store and the external agent, and runs classify -> route -> respond.

use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::classifier::{train_model, TrainedModel, TrainingOptions};
use crate::config::ChatbotConfig;
use crate::gemini::{AgentError, ConversationAgent, GeminiAgent};
use crate::intents::{CorpusError, IntentSet, Lexicon};
use crate::routing::RoutingPolicy;
use crate::session::{SessionStore, Turn, TurnSource};

/// Intent label reported for delegated turns.
pub const DELEGATED_INTENT: &str = "gemini";

/// Confidence reported for delegated turns.
pub const DELEGATED_CONFIDENCE: f32 = 1.0;

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("Message is empty")]
    EmptyMessage,

    #[error("Model is still initializing")]
    NotReady,

    #[error("Model unavailable: {0}")]
    Unavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Lifecycle of the intent model.
pub enum ModelState {
    Initializing,
    Ready(Arc<TrainedModel>),
    Failed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelPhase {
    Initializing,
    Ready,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatReply {
    pub response: String,
    pub intent: String,
    pub confidence: f32,
    pub is_gemini_response: bool,
}

impl ChatReply {
    fn local(response: impl Into<String>, intent: &str, confidence: f32) -> Self {
        Self {
            response: response.into(),
            intent: intent.to_string(),
            confidence,
            is_gemini_response: false,
        }
    }

    fn external(response: String) -> Self {
        Self {
            response,
            intent: DELEGATED_INTENT.to_string(),
            confidence: DELEGATED_CONFIDENCE,
            is_gemini_response: true,
        }
    }

    fn to_turn(&self) -> Turn {
        let source = if self.is_gemini_response {
            TurnSource::External
        } else {
            TurnSource::Local
        };
        Turn::bot(self.response.clone(), self.intent.clone(), self.confidence, source)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineStatus {
    pub status: &'static str,
    pub model: ModelPhase,
    pub gemini: bool,
    pub sessions: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vocabulary_size: Option<usize>,
    pub intents: usize,
}

pub struct ChatEngine {
    intents: Arc<IntentSet>,
    lexicon: Arc<Lexicon>,
    policy: RoutingPolicy,
    sessions: SessionStore,
    training: TrainingOptions,
    agent: Option<Arc<dyn ConversationAgent>>,
    agent_available: AtomicBool,
    agent_timeout: Duration,
    model: RwLock<ModelState>,
}

impl ChatEngine {
    pub fn new(
        config: &ChatbotConfig,
        intents: IntentSet,
        lexicon: Lexicon,
        agent: Option<Arc<dyn ConversationAgent>>,
    ) -> Self {
        Self {
            policy: RoutingPolicy::from_config(&lexicon.routing, config),
            intents: Arc::new(intents),
            lexicon: Arc::new(lexicon),
            sessions: SessionStore::new(config.max_history_length),
            training: TrainingOptions::from_config(config),
            agent,
            agent_available: AtomicBool::new(false),
            agent_timeout: config.gemini_timeout(),
            model: RwLock::new(ModelState::Initializing),
        }
    }

    /// Load corpus and lexicon (built-in unless overridden) and wire up Gemini if a key is set.
    pub fn from_config(config: &ChatbotConfig) -> Result<Self, CorpusError> {
        let intents = IntentSet::load(config.intents_path.as_deref())?;
        let lexicon = Lexicon::load(config.lexicon_path.as_deref())?;

        let agent: Option<Arc<dyn ConversationAgent>> = if config.gemini_enabled() {
            match GeminiAgent::from_config(config) {
                Ok(agent) => Some(Arc::new(agent)),
                Err(e) => {
                    warn!("Gemini client could not be built, answering locally: {}", e);
                    None
                }
            }
        } else {
            info!("GEMINI_API_KEY not set, answering from the local model only");
            None
        };

        info!(
            "Loaded {} intents with {} patterns",
            intents.len(),
            intents.pattern_count()
        );
        Ok(Self::new(config, intents, lexicon, agent))
    }

    /// Train the model on a blocking thread, then probe the external agent.
    pub async fn initialize(&self) {
        let intents = self.intents.clone();
        let lexicon = self.lexicon.clone();
        let options = self.training.clone();

        info!(
            "Training intent model ({} epochs, batch {})",
            options.epochs, options.batch_size
        );
        let trained =
            tokio::task::spawn_blocking(move || train_model(&intents, &lexicon, &options)).await;

        match trained {
            Ok(Ok(model)) => {
                if let Some(report) = model.report() {
                    info!(
                        samples = report.samples,
                        validation_samples = report.validation_samples,
                        epochs = report.epochs,
                        final_loss = report.final_loss,
                        train_accuracy = report.train_accuracy,
                        validation_accuracy = ?report.validation_accuracy,
                        elapsed_ms = report.elapsed_ms as u64,
                        "Intent model trained"
                    );
                }
                self.install_model(Arc::new(model)).await;
            }
            Ok(Err(e)) => {
                error!("Intent model training failed: {}", e);
                self.mark_failed(e.to_string()).await;
            }
            Err(e) => {
                error!("Training task aborted: {}", e);
                self.mark_failed(e.to_string()).await;
            }
        }

        self.probe_agent().await;
    }

    pub async fn install_model(&self, model: Arc<TrainedModel>) {
        info!("Vocabulary size: {}", model.vocabulary().len());
        *self.model.write().await = ModelState::Ready(model);
    }

    pub async fn mark_failed(&self, reason: impl Into<String>) {
        *self.model.write().await = ModelState::Failed(reason.into());
    }

    /// Open a throwaway conversation and send "test". Sets the global availability flag.
    pub async fn probe_agent(&self) -> bool {
        let Some(agent) = self.agent.as_deref() else {
            self.agent_available.store(false, Ordering::SeqCst);
            return false;
        };

        let probe = async {
            let conversation = agent.create_conversation().await?;
            conversation.send_turn("test").await
        };

        let available = match tokio::time::timeout(self.agent_timeout, probe).await {
            Ok(Ok(reply)) if !reply.trim().is_empty() => {
                info!("{} is ready", agent.name());
                true
            }
            Ok(Ok(_)) => {
                warn!("{} answered the probe with an empty reply", agent.name());
                false
            }
            Ok(Err(e)) => {
                warn!("{} unreachable, using the local model: {}", agent.name(), e);
                false
            }
            Err(_) => {
                warn!(
                    "{} probe timed out after {:?}, using the local model",
                    agent.name(),
                    self.agent_timeout
                );
                false
            }
        };

        self.agent_available.store(available, Ordering::SeqCst);
        available
    }

    pub fn agent_available(&self) -> bool {
        self.agent_available.load(Ordering::SeqCst)
    }

    async fn ready_model(&self) -> Result<Arc<TrainedModel>, ChatError> {
        match &*self.model.read().await {
            ModelState::Ready(model) => Ok(model.clone()),
            ModelState::Initializing => Err(ChatError::NotReady),
            ModelState::Failed(reason) => Err(ChatError::Unavailable(reason.clone())),
        }
    }

    /// Answer one message and record the exchange in the session's history.
    ///
    /// History is only touched once a reply exists, so rejected requests
    /// leave it unchanged.
    pub async fn reply(&self, session_id: &str, message: &str) -> Result<ChatReply, ChatError> {
        if message.trim().is_empty() {
            return Err(ChatError::EmptyMessage);
        }

        let model = self.ready_model().await?;
        let prediction = model
            .classify(message)
            .map_err(|e| ChatError::Internal(e.to_string()))?;

        let index = prediction.top_index();
        let intent = self
            .intents
            .get(index)
            .ok_or_else(|| ChatError::Internal(format!("Intent index {index} out of range")))?;
        let confidence = prediction.confidence();

        let decision = self
            .policy
            .decide(message, &intent.tag, confidence, self.agent_available());
        debug!(
            session_id,
            intent = %intent.tag,
            confidence,
            delegate = decision.delegate,
            "Routing: {}",
            decision.reason
        );

        let reply = if decision.delegate {
            match self.delegate(session_id, message).await {
                Ok(text) => ChatReply::external(text),
                Err(e) => {
                    warn!(session_id, "Delegation failed, falling back to canned response: {}", e);
                    ChatReply::local(intent.pick_response(), &intent.tag, confidence)
                }
            }
        } else {
            ChatReply::local(intent.pick_response(), &intent.tag, confidence)
        };

        self.sessions
            .record_exchange(session_id, Turn::user(message), reply.to_turn())
            .await;

        Ok(reply)
    }

    async fn delegate(&self, session_id: &str, message: &str) -> Result<String, AgentError> {
        let agent = self.agent.as_deref().ok_or(AgentError::MissingApiKey)?;
        let turn = async {
            let conversation = self.sessions.conversation(session_id, agent).await?;
            conversation.send_turn(message).await
        };

        tokio::time::timeout(self.agent_timeout, turn)
            .await
            .map_err(|_| AgentError::Timeout(self.agent_timeout))?
    }

    pub async fn history(&self, session_id: &str) -> Vec<Turn> {
        self.sessions.snapshot(session_id).await
    }

    pub async fn status(&self) -> EngineStatus {
        let (model, vocabulary_size) = match &*self.model.read().await {
            ModelState::Initializing => (ModelPhase::Initializing, None),
            ModelState::Ready(m) => (ModelPhase::Ready, Some(m.vocabulary().len())),
            ModelState::Failed(_) => (ModelPhase::Failed, None),
        };

        EngineStatus {
            status: "ok",
            model,
            gemini: self.agent_available(),
            sessions: self.sessions.session_count().await,
            vocabulary_size,
            intents: self.intents.len(),
        }
    }

    pub fn intents(&self) -> &IntentSet {
        &self.intents
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }
}
