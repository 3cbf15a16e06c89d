//! Text embeddings via an OpenAI-compatible API
//! Wraps text-embedding-3-small with an in-process cache and a bounded
//! per-call timeout so a slow provider cannot hold a request open.

use crate::config::EmbeddingConfig;
use crate::errors::{KnowledgeError, KnowledgeResult};
use async_openai::{
    config::OpenAIConfig,
    types::{CreateEmbeddingRequestArgs, EmbeddingInput},
    Client as OpenAIClient,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::timeout;
use tracing::info;

/// Embedding client with caching. Fallible and network-bound; callers decide
/// whether a failure degrades (retrieval) or forces a null embedding
/// (persistence). No retry is built in here.
pub struct EmbeddingClient {
    client: OpenAIClient<OpenAIConfig>,
    model: String,
    dimension: usize,
    timeout_seconds: u64,
    cache: Arc<RwLock<HashMap<String, Vec<f32>>>>,
}

impl EmbeddingClient {
    pub fn new(config: &EmbeddingConfig) -> KnowledgeResult<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| KnowledgeError::EmbeddingUnavailable {
                reason: "OPENAI_API_KEY is not configured".to_string(),
            })?;

        let mut openai_config = OpenAIConfig::new().with_api_key(api_key);
        if let Some(base) = &config.api_base {
            openai_config = openai_config.with_api_base(base);
        }

        Ok(Self {
            client: OpenAIClient::with_config(openai_config),
            model: config.model.clone(),
            dimension: config.dimension,
            timeout_seconds: config.timeout_seconds,
            cache: Arc::new(RwLock::new(HashMap::new())),
        })
    }

    /// Generate an embedding for the given text.
    pub async fn embed(&self, text: &str) -> KnowledgeResult<Vec<f32>> {
        if text.trim().is_empty() {
            return Err(KnowledgeError::EmbeddingUnavailable {
                reason: "input text is empty".to_string(),
            });
        }

        // Check cache first
        {
            let cache = self.cache.read().await;
            if let Some(embedding) = cache.get(text) {
                return Ok(embedding.clone());
            }
        }

        let request = CreateEmbeddingRequestArgs::default()
            .model(&self.model)
            .input(EmbeddingInput::String(text.to_string()))
            .build()
            .map_err(|e| KnowledgeError::EmbeddingUnavailable {
                reason: format!("failed to build embedding request: {}", e),
            })?;

        let response = timeout(
            Duration::from_secs(self.timeout_seconds),
            self.client.embeddings().create(request),
        )
        .await
        .map_err(|_| KnowledgeError::EmbeddingUnavailable {
            reason: format!("provider timed out after {}s", self.timeout_seconds),
        })?
        .map_err(|e| KnowledgeError::EmbeddingUnavailable {
            reason: format!("provider error: {}", e),
        })?;

        let embedding: Vec<f32> = response
            .data
            .first()
            .ok_or_else(|| KnowledgeError::EmbeddingUnavailable {
                reason: "provider returned no embedding".to_string(),
            })?
            .embedding
            .clone();

        info!(
            "Generated embedding with {} dimensions for text (first 50 chars): {}",
            embedding.len(),
            &text.chars().take(50).collect::<String>()
        );

        {
            let mut cache = self.cache.write().await;
            cache.insert(text.to_string(), embedding.clone());
        }

        Ok(embedding)
    }

    /// Generate embeddings for multiple texts in one call (used by backfill).
    pub async fn embed_batch(&self, texts: &[&str]) -> KnowledgeResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let texts_owned: Vec<String> = texts.iter().map(|s| s.to_string()).collect();

        let request = CreateEmbeddingRequestArgs::default()
            .model(&self.model)
            .input(EmbeddingInput::StringArray(texts_owned))
            .build()
            .map_err(|e| KnowledgeError::EmbeddingUnavailable {
                reason: format!("failed to build embedding request: {}", e),
            })?;

        let response = timeout(
            Duration::from_secs(self.timeout_seconds),
            self.client.embeddings().create(request),
        )
        .await
        .map_err(|_| KnowledgeError::EmbeddingUnavailable {
            reason: format!("provider timed out after {}s", self.timeout_seconds),
        })?
        .map_err(|e| KnowledgeError::EmbeddingUnavailable {
            reason: format!("provider error: {}", e),
        })?;

        let embeddings: Vec<Vec<f32>> = response
            .data
            .iter()
            .map(|data| data.embedding.clone())
            .collect();

        info!(
            "Generated {} embeddings with {} dimensions",
            embeddings.len(),
            embeddings.first().map(|e| e.len()).unwrap_or(0)
        );

        {
            let mut cache = self.cache.write().await;
            for (text, embedding) in texts.iter().zip(embeddings.iter()) {
                cache.insert(text.to_string(), embedding.clone());
            }
        }

        Ok(embeddings)
    }

    /// Get the configured embedding dimension
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Get cache statistics: (entries, estimated bytes)
    pub async fn cache_stats(&self) -> (usize, usize) {
        let cache = self.cache.read().await;
        let entries = cache.len();
        let estimated_memory = entries * (self.dimension * 4 + 64);
        (entries, estimated_memory)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EmbeddingConfig;

    fn test_config() -> EmbeddingConfig {
        EmbeddingConfig {
            api_key: Some("test-key".to_string()),
            api_base: None,
            model: "text-embedding-3-small".to_string(),
            dimension: 1536,
            timeout_seconds: 15,
        }
    }

    #[test]
    fn test_missing_api_key_is_unavailable() {
        let mut config = test_config();
        config.api_key = None;
        let result = EmbeddingClient::new(&config);
        assert!(matches!(
            result,
            Err(KnowledgeError::EmbeddingUnavailable { .. })
        ));
    }

    #[tokio::test]
    async fn test_empty_text_is_rejected_without_network() {
        let client = EmbeddingClient::new(&test_config()).expect("client should build");
        let result = client.embed("   \n  ").await;
        assert!(matches!(
            result,
            Err(KnowledgeError::EmbeddingUnavailable { .. })
        ));
    }

    #[tokio::test]
    async fn test_empty_batch_short_circuits() {
        let client = EmbeddingClient::new(&test_config()).expect("client should build");
        let result = client.embed_batch(&[]).await.expect("empty batch is ok");
        assert!(result.is_empty());
    }

    #[tokio::test]
    #[ignore] // Requires a live API key
    async fn test_embedding_generation() {
        let config = EmbeddingConfig {
            api_key: std::env::var("OPENAI_API_KEY").ok(),
            ..test_config()
        };
        let client = EmbeddingClient::new(&config).expect("client should build");

        let text = "BTCUSD showing strong bullish momentum above support";
        let embedding = client.embed(text).await.expect("embed should succeed");
        assert_eq!(embedding.len(), 1536);

        // Same text should come back from cache, byte-identical
        let embedding2 = client.embed(text).await.expect("embed should succeed");
        assert_eq!(embedding, embedding2);
        let (entries, _) = client.cache_stats().await;
        assert_eq!(entries, 1);
    }
}
