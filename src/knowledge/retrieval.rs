//! Knowledge retrieval orchestrator
//! Composes embed -> similarity search -> quality filter -> format into one
//! call that degrades to an empty context on any internal failure. Knowledge
//! retrieval enhances generation quality; it is never a precondition for it.

use super::filter::{filter_and_rank, RankingMode, SimilarSetupWithDetails};
use super::formatter::format_similar_setups;
use crate::config::RagConfig;
use crate::embeddings::EmbeddingClient;
use crate::errors::KnowledgeResult;
use crate::setups::{QualifyingSetup, SetupDAO};
use crate::vector::VectorStore;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Fetch more hits than the final cap so the quality filter has room to
/// discard without starving the context.
const OVER_FETCH_FACTOR: usize = 2;

pub struct KnowledgeRetriever {
    embedder: Arc<EmbeddingClient>,
    vector_store: Arc<VectorStore>,
    setup_dao: SetupDAO,
    config: RagConfig,
}

impl KnowledgeRetriever {
    pub fn new(
        embedder: Arc<EmbeddingClient>,
        vector_store: Arc<VectorStore>,
        setup_dao: SetupDAO,
        config: RagConfig,
    ) -> Self {
        Self {
            embedder,
            vector_store,
            setup_dao,
            config,
        }
    }

    /// Retrieve formatted context of relevant past setups for the given
    /// analysis text. Never fails: every internal error is logged and
    /// converted to an empty string.
    pub async fn relevant_knowledge(&self, analysis: &str, company_id: Option<Uuid>) -> String {
        match self.try_retrieve(analysis, company_id).await {
            Ok(context) => context,
            Err(e) if e.is_degradable() => {
                warn!("Knowledge retrieval degraded to empty context: {}", e);
                String::new()
            }
            Err(e) => {
                // Dimension mismatch: a configuration fault that must not be
                // mistaken for routine degradation, but still must not break
                // the generation flow.
                error!("Knowledge retrieval failed with non-degradable error: {}", e);
                String::new()
            }
        }
    }

    async fn try_retrieve(
        &self,
        analysis: &str,
        company_id: Option<Uuid>,
    ) -> KnowledgeResult<String> {
        let embedding = self.embedder.embed(analysis).await?;

        let fetch_limit = self.config.max_similar_setups * OVER_FETCH_FACTOR;
        let hits = self
            .vector_store
            .search(
                &embedding,
                company_id,
                self.config.min_similarity,
                fetch_limit,
            )
            .await?;

        if hits.is_empty() {
            info!("No similar knowledge entries found");
            return Ok(String::new());
        }

        // Join similarity hits with their setups' structured fields, keeping
        // the measured score per setup id.
        let similarities: HashMap<Uuid, f32> = hits
            .iter()
            .map(|h| (h.trade_setup_id, h.similarity))
            .collect();
        let ids: Vec<Uuid> = similarities.keys().copied().collect();

        let qualifying = self
            .setup_dao
            .fetch_qualifying(&ids, self.config.min_quality_score, fetch_limit)
            .await?;

        let candidates: Vec<SimilarSetupWithDetails> = qualifying
            .into_iter()
            .map(|setup| {
                let similarity = similarities.get(&setup.id).copied();
                with_details(setup, similarity)
            })
            .collect();

        let ranked = filter_and_rank(candidates, &self.config);
        if ranked.mode == RankingMode::QualityOnly && !ranked.setups.is_empty() {
            warn!("Similarity scores unavailable; ranking past setups by quality only");
        }

        if ranked.setups.is_empty() {
            info!("No past setups cleared the quality and similarity floors");
            return Ok(String::new());
        }

        info!(
            "Including {} past setups in knowledge context",
            ranked.setups.len()
        );
        Ok(format_similar_setups(&ranked.setups))
    }
}

/// Project a qualifying setup row into the transient with-details shape,
/// pulling display scalars out of the stored payload.
fn with_details(setup: QualifyingSetup, similarity: Option<f32>) -> SimilarSetupWithDetails {
    SimilarSetupWithDetails {
        trade_setup_id: setup.id,
        direction: setup.direction,
        entry_price: payload_str(&setup.trade_setup, "entryPrice"),
        quality_score: setup.quality_score,
        risk_reward_ratio: payload_str(&setup.trade_setup, "riskRewardRatio"),
        order_type: payload_str(&setup.trade_setup, "orderType"),
        similarity,
    }
}

fn payload_str(payload: &serde_json::Value, key: &str) -> Option<String> {
    payload
        .get(key)
        .and_then(|v| v.as_str())
        .filter(|s| !s.trim().is_empty())
        .map(String::from)
}
