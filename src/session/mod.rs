//! In-memory session store
//!
//! Two maps keyed by session id: the bounded turn history, and the lazily
//! opened external conversation. Both follow the same get-or-create shape:
//! a read-locked fast path, then `entry().or_insert_with` under the write
//! lock so concurrent first requests for one id share a single entry.
//!
//! Sessions live for the whole process. Nothing bounds the number of
//! distinct session ids.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell, RwLock};

use crate::gemini::{AgentError, Conversation, ConversationAgent};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Bot,
}

/// Where a bot turn's text came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnSource {
    Local,
    External,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    #[serde(rename = "type")]
    pub role: Role,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
    pub source: TurnSource,
}

impl Turn {
    pub fn user(message: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            message: message.into(),
            timestamp: Utc::now(),
            intent: None,
            confidence: None,
            source: TurnSource::Local,
        }
    }

    pub fn bot(
        message: impl Into<String>,
        intent: impl Into<String>,
        confidence: f32,
        source: TurnSource,
    ) -> Self {
        Self {
            role: Role::Bot,
            message: message.into(),
            timestamp: Utc::now(),
            intent: Some(intent.into()),
            confidence: Some(confidence),
            source,
        }
    }
}

/// Ordered turns for one session, capped at `max_len` entries.
#[derive(Debug)]
pub struct SessionHistory {
    turns: Vec<Turn>,
    max_len: usize,
}

impl SessionHistory {
    fn new(max_len: usize) -> Self {
        Self {
            turns: Vec::new(),
            max_len,
        }
    }

    pub fn append(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    /// Drop the oldest user/bot pair while over the cap.
    pub fn prune(&mut self) {
        while self.turns.len() > self.max_len {
            let n = self.turns.len().min(2);
            self.turns.drain(..n);
        }
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

type ConversationSlot = Arc<OnceCell<Arc<dyn Conversation>>>;

pub struct SessionStore {
    histories: RwLock<HashMap<String, Arc<Mutex<SessionHistory>>>>,
    conversations: RwLock<HashMap<String, ConversationSlot>>,
    max_history: usize,
}

impl SessionStore {
    pub fn new(max_history: usize) -> Self {
        Self {
            histories: RwLock::new(HashMap::new()),
            conversations: RwLock::new(HashMap::new()),
            max_history,
        }
    }

    /// Get or create the history for a session. Always the same object for one id.
    pub async fn get_or_create(&self, session_id: &str) -> Arc<Mutex<SessionHistory>> {
        // Fast path: check if history exists
        {
            let histories = self.histories.read().await;
            if let Some(history) = histories.get(session_id) {
                return history.clone();
            }
        }

        // Slow path: create history if needed
        let mut histories = self.histories.write().await;
        histories
            .entry(session_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(SessionHistory::new(self.max_history))))
            .clone()
    }

    pub async fn append(&self, session_id: &str, turn: Turn) {
        let history = self.get_or_create(session_id).await;
        history.lock().await.append(turn);
    }

    pub async fn prune(&self, session_id: &str) {
        let history = self.get_or_create(session_id).await;
        history.lock().await.prune();
    }

    /// Append a user turn and its reply under one lock, then prune.
    pub async fn record_exchange(&self, session_id: &str, user: Turn, bot: Turn) {
        let history = self.get_or_create(session_id).await;
        let mut history = history.lock().await;
        history.append(user);
        history.append(bot);
        history.prune();
    }

    /// Copy of a session's turns; unknown sessions yield an empty list and are not created.
    pub async fn snapshot(&self, session_id: &str) -> Vec<Turn> {
        let history = {
            let histories = self.histories.read().await;
            histories.get(session_id).cloned()
        };
        match history {
            Some(h) => h.lock().await.turns().to_vec(),
            None => Vec::new(),
        }
    }

    /// The session's external conversation, opened on first use.
    ///
    /// Concurrent callers for one session share a single `create_conversation`
    /// call. A failed creation leaves the slot empty so a later turn can retry.
    pub async fn conversation(
        &self,
        session_id: &str,
        agent: &dyn ConversationAgent,
    ) -> Result<Arc<dyn Conversation>, AgentError> {
        let slot = self.conversation_slot(session_id).await;
        slot.get_or_try_init(|| agent.create_conversation())
            .await
            .cloned()
    }

    async fn conversation_slot(&self, session_id: &str) -> ConversationSlot {
        {
            let slots = self.conversations.read().await;
            if let Some(slot) = slots.get(session_id) {
                return slot.clone();
            }
        }

        let mut slots = self.conversations.write().await;
        slots
            .entry(session_id.to_string())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone()
    }

    pub async fn session_count(&self) -> usize {
        self.histories.read().await.len()
    }

    pub fn max_history(&self) -> usize {
        self.max_history
    }
}
