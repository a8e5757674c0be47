// src/lib.rs

pub mod chat;
pub mod classifier;
pub mod config;
pub mod gemini;
pub mod intents;
pub mod nlp;
pub mod routing;
pub mod server;
pub mod session;

pub use chat::{ChatEngine, ChatError, ChatReply};
pub use config::{ChatbotConfig, CONFIG};
