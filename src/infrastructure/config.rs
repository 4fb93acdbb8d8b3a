//! Application configuration

use std::env;

use anyhow::{Context, Result};

/// Application configuration loaded from environment
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Ollama API base URL
    pub ollama_base_url: String,
    /// Default model for LLM requests
    pub ollama_model: String,
    /// Per-request timeout in seconds
    pub ollama_timeout_secs: u64,

    /// Turn-log length at which old turns fold into the rolling summary
    pub compaction_threshold: usize,
    /// Whether dev-mode surfaces (drafts, retcon log, dev reports) are active
    pub dev_mode_enabled: bool,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            ollama_base_url: env::var("OLLAMA_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:11434".to_string()),
            ollama_model: env::var("OLLAMA_MODEL").unwrap_or_else(|_| "llama3.2".to_string()),
            ollama_timeout_secs: env::var("OLLAMA_TIMEOUT_SECS")
                .unwrap_or_else(|_| "120".to_string())
                .parse()
                .context("OLLAMA_TIMEOUT_SECS must be a number of seconds")?,

            compaction_threshold: env::var("COMPACTION_THRESHOLD")
                .unwrap_or_else(|_| "100".to_string())
                .parse()
                .context("COMPACTION_THRESHOLD must be a positive integer")?,
            dev_mode_enabled: env::var("DEV_MODE")
                .map(|v| matches!(v.trim(), "1" | "true" | "yes"))
                .unwrap_or(false),
        })
    }
}
