use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub embedding: EmbeddingConfig,
    pub rag: RagConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    pub api_key: Option<String>,
    pub api_base: Option<String>,
    pub model: String,
    /// Fixed dimensionality of stored vectors. Not negotiated per call;
    /// changing it requires re-embedding the knowledge table.
    pub dimension: usize,
    pub timeout_seconds: u64,
}

/// Retrieval tuning knobs, passed explicitly into the retriever and filter
/// so tests can vary thresholds per case without shared mutable state.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RagConfig {
    /// Maximum number of similar setups included in prompt context
    pub max_similar_setups: usize,
    /// Minimum quality score (1-10 scale) for a setup to qualify
    pub min_quality_score: f32,
    /// Minimum cosine similarity (0-1 scale) for a match to qualify
    pub min_similarity: f32,
    /// Soft ceiling on knowledge context size, in token-equivalents.
    /// Held by construction: the per-line format is fixed and the result
    /// count is capped, so no separate truncation pass runs.
    pub max_knowledge_tokens: usize,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            max_similar_setups: 3,
            min_quality_score: 7.0,
            min_similarity: 0.75,
            max_knowledge_tokens: 800,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        // Load .env file - sets env vars that aren't already set
        dotenv::dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .context("DATABASE_URL environment variable is required but not set")?;

        let config = Config {
            database: DatabaseConfig {
                url: database_url,
                max_connections: env::var("DB_MAX_CONNECTIONS")
                    .unwrap_or_else(|_| "5".to_string())
                    .parse()
                    .context("Invalid DB_MAX_CONNECTIONS value")?,
                min_connections: env::var("DB_MIN_CONNECTIONS")
                    .unwrap_or_else(|_| "1".to_string())
                    .parse()
                    .context("Invalid DB_MIN_CONNECTIONS value")?,
            },
            embedding: EmbeddingConfig {
                api_key: env::var("OPENAI_API_KEY").ok(),
                api_base: env::var("EMBEDDING_API_BASE").ok(),
                model: env::var("EMBEDDING_MODEL")
                    .unwrap_or_else(|_| "text-embedding-3-small".to_string()),
                dimension: env::var("EMBEDDING_DIMENSION")
                    .unwrap_or_else(|_| "1536".to_string())
                    .parse()
                    .context("Invalid EMBEDDING_DIMENSION value")?,
                timeout_seconds: env::var("EMBEDDING_TIMEOUT_SECONDS")
                    .unwrap_or_else(|_| "15".to_string())
                    .parse()
                    .context("Invalid EMBEDDING_TIMEOUT_SECONDS value")?,
            },
            rag: RagConfig {
                max_similar_setups: env::var("RAG_MAX_SIMILAR_SETUPS")
                    .unwrap_or_else(|_| "3".to_string())
                    .parse()
                    .context("Invalid RAG_MAX_SIMILAR_SETUPS value")?,
                min_quality_score: env::var("RAG_MIN_QUALITY_SCORE")
                    .unwrap_or_else(|_| "7".to_string())
                    .parse()
                    .context("Invalid RAG_MIN_QUALITY_SCORE value")?,
                min_similarity: env::var("RAG_MIN_SIMILARITY")
                    .unwrap_or_else(|_| "0.75".to_string())
                    .parse()
                    .context("Invalid RAG_MIN_SIMILARITY value")?,
                max_knowledge_tokens: env::var("RAG_MAX_KNOWLEDGE_TOKENS")
                    .unwrap_or_else(|_| "800".to_string())
                    .parse()
                    .context("Invalid RAG_MAX_KNOWLEDGE_TOKENS value")?,
            },
        };

        Ok(config)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "postgresql://localhost/chartsage".to_string(),
                max_connections: 5,
                min_connections: 1,
            },
            embedding: EmbeddingConfig {
                api_key: None,
                api_base: None,
                model: "text-embedding-3-small".to_string(),
                dimension: 1536,
                timeout_seconds: 15,
            },
            rag: RagConfig::default(),
        }
    }
}
