//! Setup persistence pipeline
//! A new generated setup flows through: setup insert (fatal on failure) ->
//! embedding (best effort) -> knowledge insert (best effort). Each stage's
//! failure is isolated: a later failure never rolls back an earlier write,
//! and no transaction spans the two inserts, so partial success is the
//! tolerated, documented outcome.

use super::entries::{KnowledgeDAO, NewKnowledgeEntry};
use crate::embeddings::EmbeddingClient;
use crate::errors::KnowledgeResult;
use crate::setups::{NewTradeSetup, SetupDAO, TradeSetupPayload};
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

pub struct SetupPersister {
    setup_dao: SetupDAO,
    knowledge_dao: KnowledgeDAO,
    embedder: Arc<EmbeddingClient>,
}

impl SetupPersister {
    pub fn new(
        setup_dao: SetupDAO,
        knowledge_dao: KnowledgeDAO,
        embedder: Arc<EmbeddingClient>,
    ) -> Self {
        Self {
            setup_dao,
            knowledge_dao,
            embedder,
        }
    }

    /// Persist a generated setup and index it for future retrieval.
    ///
    /// Only a failure of the setup insert itself propagates; the setup
    /// record is the user-facing artifact, while the knowledge entry is an
    /// internal index whose failure must never surface to the user.
    pub async fn save(&self, setup: NewTradeSetup) -> KnowledgeResult<Uuid> {
        let setup_id = self.setup_dao.insert(&setup).await?;

        let content = embedding_text(&setup.analysis, &setup.payload);

        let embedding = match self.embedder.embed(&content).await {
            Ok(vector) => Some(vector),
            Err(e) => {
                warn!(
                    "Embedding generation failed for setup {}; storing knowledge entry without vector: {}",
                    setup_id, e
                );
                None
            }
        };

        let entry = NewKnowledgeEntry {
            trade_setup_id: Some(setup_id),
            company_id: setup.company_id,
            content,
            embedding,
            metadata: json!({
                "direction": setup.payload.direction.as_str(),
                "quality_score": setup.payload.quality_score,
                "entry_price": setup.payload.entry_price,
            }),
        };

        match self.knowledge_dao.insert(&entry).await {
            Ok(entry_id) => {
                info!("Indexed setup {} as knowledge entry {}", setup_id, entry_id);
            }
            Err(e) => {
                warn!(
                    "Knowledge entry insert failed for setup {} (setup remains valid): {}",
                    setup_id, e
                );
            }
        }

        Ok(setup_id)
    }
}

/// Concatenate the analysis with a compact payload summary; this combined
/// text is what gets embedded and stored as the knowledge entry content.
pub fn embedding_text(analysis: &str, payload: &TradeSetupPayload) -> String {
    format!(
        "Analysis: {}\n\nTrade Setup: Direction: {}, Entry: {}, Stop Loss: {}, TP1: {}, TP2: {}, Quality Score: {}",
        analysis,
        payload.direction,
        payload.entry_price,
        payload.stop_loss.level,
        payload.tp1,
        payload.tp2,
        payload.quality_score
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::setups::{Direction, OrderType, StopLoss};

    fn sample_payload() -> TradeSetupPayload {
        TradeSetupPayload {
            direction: Direction::Buy,
            entry_price: "1.0850".to_string(),
            stop_loss: StopLoss {
                level: "1.0800".to_string(),
                reasoning: "Below the 4H swing low".to_string(),
            },
            tp1: "1.0920".to_string(),
            tp2: "1.0980".to_string(),
            order_type: OrderType::Limit,
            risk_reward_ratio: "1:2.6".to_string(),
            quality_score: 8.0,
            reasoning: None,
        }
    }

    #[test]
    fn test_embedding_text_contains_analysis_and_summary() {
        let text = embedding_text("EURUSD breaking out of consolidation", &sample_payload());
        assert!(text.starts_with("Analysis: EURUSD breaking out of consolidation"));
        assert!(text.contains("Direction: BUY"));
        assert!(text.contains("Entry: 1.0850"));
        assert!(text.contains("Stop Loss: 1.0800"));
        assert!(text.contains("TP1: 1.0920"));
        assert!(text.contains("TP2: 1.0980"));
        assert!(text.contains("Quality Score: 8"));
    }

    #[test]
    fn test_embedding_text_is_deterministic() {
        let payload = sample_payload();
        assert_eq!(
            embedding_text("same analysis", &payload),
            embedding_text("same analysis", &payload)
        );
    }
}
