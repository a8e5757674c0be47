// src/config/mod.rs
// Loads every tunable from the environment (.env first), with defaults for all of them.

use once_cell::sync::Lazy;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ChatbotConfig {
    // ── Server Configuration
    pub host: String,
    pub port: u16,
    pub cors_origin: String,

    // ── Session Configuration
    pub max_history_length: usize,

    // ── Routing Configuration
    pub message_length_threshold: usize,
    pub basic_confidence_threshold: f32,

    // ── Gemini Configuration
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub gemini_base_url: String,
    pub gemini_timeout_secs: u64,
    pub gemini_temperature: f32,
    pub gemini_top_k: u32,
    pub gemini_top_p: f32,
    pub gemini_max_output_tokens: u32,

    // ── Training Configuration
    pub train_epochs: usize,
    pub train_batch_size: usize,
    pub train_learning_rate: f64,
    pub train_validation_split: f32,
    pub train_dropout: f32,

    // ── Corpus overrides
    pub intents_path: Option<PathBuf>,
    pub lexicon_path: Option<PathBuf>,

    // ── Logging Configuration
    pub log_level: String,
}

// Values may carry trailing `# comments` in .env files; those are stripped before parsing.
fn parse_or<T, F>(lookup: &F, key: &str, default: T) -> T
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(val) => {
            let clean_val = val.split('#').next().unwrap_or("").trim();
            match clean_val.parse::<T>() {
                Ok(parsed) => {
                    tracing::debug!("Config: {} = {} (from environment)", key, clean_val);
                    parsed
                }
                Err(_) => {
                    tracing::warn!("Config: {} = '{}' (parse failed, using default)", key, val);
                    default
                }
            }
        }
        None => default,
    }
}

fn optional<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Read `key` from the process environment, falling back to `default`.
pub fn env_var_or<T: FromStr>(key: &str, default: T) -> T {
    parse_or(&|k: &str| std::env::var(k).ok(), key, default)
}

impl ChatbotConfig {
    pub fn from_env() -> Self {
        if dotenvy::dotenv().is_err() {
            tracing::debug!(".env file not found, using environment variables and defaults");
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let max_history: usize = parse_or(&lookup, "MAX_HISTORY_LENGTH", 50);

        Self {
            host: parse_or(&lookup, "HOST", "127.0.0.1".to_string()),
            port: parse_or(&lookup, "PORT", 3000),
            cors_origin: parse_or(&lookup, "CORS_ORIGIN", "*".to_string()),
            max_history_length: normalize_history_cap(max_history),
            message_length_threshold: parse_or(&lookup, "MESSAGE_LENGTH_THRESHOLD", 50),
            basic_confidence_threshold: parse_or(&lookup, "BASIC_CONFIDENCE_THRESHOLD", 0.95),
            gemini_api_key: optional(&lookup, "GEMINI_API_KEY"),
            gemini_model: parse_or(&lookup, "GEMINI_MODEL", "gemini-2.0-flash".to_string()),
            gemini_base_url: parse_or(
                &lookup,
                "API_URL",
                "https://generativelanguage.googleapis.com".to_string(),
            ),
            gemini_timeout_secs: parse_or(&lookup, "GEMINI_TIMEOUT_SECS", 20),
            gemini_temperature: parse_or(&lookup, "GEMINI_TEMPERATURE", 0.7),
            gemini_top_k: parse_or(&lookup, "GEMINI_TOP_K", 1),
            gemini_top_p: parse_or(&lookup, "GEMINI_TOP_P", 1.0),
            gemini_max_output_tokens: parse_or(&lookup, "GEMINI_MAX_OUTPUT_TOKENS", 2048),
            train_epochs: parse_or(&lookup, "TRAIN_EPOCHS", 50),
            train_batch_size: parse_or(&lookup, "TRAIN_BATCH_SIZE", 16),
            train_learning_rate: parse_or(&lookup, "TRAIN_LEARNING_RATE", 0.001),
            train_validation_split: parse_or(&lookup, "TRAIN_VALIDATION_SPLIT", 0.1),
            train_dropout: parse_or(&lookup, "TRAIN_DROPOUT", 0.2),
            intents_path: optional(&lookup, "INTENTS_PATH").map(PathBuf::from),
            lexicon_path: optional(&lookup, "LEXICON_PATH").map(PathBuf::from),
            log_level: parse_or(&lookup, "LOG_LEVEL", "info".to_string()),
        }
    }

    /// Get server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn gemini_timeout(&self) -> Duration {
        Duration::from_secs(self.gemini_timeout_secs)
    }

    pub fn gemini_enabled(&self) -> bool {
        self.gemini_api_key.is_some()
    }
}

impl Default for ChatbotConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

/// History is pruned a user/bot pair at a time, so the cap must be even.
fn normalize_history_cap(requested: usize) -> usize {
    (requested - requested % 2).max(2)
}

// Global config instance - loaded once at startup
pub static CONFIG: Lazy<ChatbotConfig> = Lazy::new(ChatbotConfig::from_env);
