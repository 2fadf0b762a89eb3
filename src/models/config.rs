//! Configuration model loaded from external sources.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use crate::{DEFAULT_CANDIDATE_POOL, DEFAULT_MATCH_LIMIT, DEFAULT_TOP_K};

#[derive(Clone, Debug, Deserialize)]
/// Basic configuration shared across handlers.
pub struct ServerConfig {
    pub database_url: String,
    pub zmq_address: String,
    pub embedding_model: String,
    pub model_cache_dir: Option<String>,
    #[serde(default)]
    pub matching: MatchingSettings,
}

impl ServerConfig {
    /// Layer defaults, an optional YAML file and `MATCHER__*` env variables.
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let config: ServerConfig = Config::builder()
            .set_default("database_url", "app.db")?
            .set_default("zmq_address", "tcp://127.0.0.1:5556")?
            .set_default("embedding_model", "nomic-embed-text-v1")?
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix("MATCHER")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.matching.validate()?;
        Ok(config)
    }
}

/// Tunables of a single matching run.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct MatchingSettings {
    /// Nearest neighbours requested from the index before deduplication.
    pub top_k: usize,
    /// Matches kept after ranking.
    pub limit: usize,
    /// Candidate pool explored by the approximate search.
    pub candidate_pool: usize,
    /// Attempts per transient step, including the first one.
    pub max_attempts: u32,
    pub retry_backoff_ms: u64,
    pub embed_timeout_ms: u64,
    pub search_timeout_ms: u64,
}

impl Default for MatchingSettings {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            limit: DEFAULT_MATCH_LIMIT,
            candidate_pool: DEFAULT_CANDIDATE_POOL,
            max_attempts: 3,
            retry_backoff_ms: 200,
            embed_timeout_ms: 30_000,
            search_timeout_ms: 5_000,
        }
    }
}

impl MatchingSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.limit == 0 {
            return Err(ConfigError::Message(
                "matching.limit must be greater than zero".to_string(),
            ));
        }
        if self.top_k < self.limit {
            return Err(ConfigError::Message(format!(
                "matching.top_k ({}) must be at least matching.limit ({})",
                self.top_k, self.limit
            )));
        }
        if self.max_attempts == 0 {
            return Err(ConfigError::Message(
                "matching.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.candidate_pool < self.top_k.saturating_mul(10) {
            log::warn!(
                "matching.candidate_pool ({}) is below 10x top_k ({}); recall may suffer",
                self.candidate_pool,
                self.top_k
            );
        }
        Ok(())
    }
}
