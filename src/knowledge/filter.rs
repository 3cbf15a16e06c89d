//! Quality filtering and ranking of similarity candidates
//! Pure functions over in-memory candidates so thresholds can be varied per
//! test case through RagConfig.

use crate::config::RagConfig;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use uuid::Uuid;

/// Similarity hit joined with the structured fields of its trade setup.
/// Transient: built during retrieval, discarded after formatting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimilarSetupWithDetails {
    pub trade_setup_id: Uuid,
    pub direction: Option<String>,
    pub entry_price: Option<String>,
    pub quality_score: Option<f32>,
    pub risk_reward_ratio: Option<String>,
    pub order_type: Option<String>,
    /// Measured cosine similarity. None when the candidate reached this
    /// stage without a vector comparison.
    pub similarity: Option<f32>,
}

/// How the final ordering was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RankingMode {
    /// Genuine vector similarity ranking with the similarity floor applied
    Similarity,
    /// Degraded mode: no measured similarity was available, so candidates
    /// are ordered by quality score alone and no similarity floor applies
    QualityOnly,
}

#[derive(Debug, Clone)]
pub struct RankedSetups {
    pub setups: Vec<SimilarSetupWithDetails>,
    pub mode: RankingMode,
}

/// Narrow candidates to those clearing the quality floor, then rank and cap.
///
/// Quality boundary is inclusive: q == min_quality_score qualifies. Entries
/// without a quality score never qualify. When every surviving candidate
/// carries a measured similarity the similarity floor applies and ordering
/// is by similarity descending; otherwise ordering falls back to quality
/// descending and the result is labeled QualityOnly so callers can log the
/// degradation instead of mistaking it for similarity ranking. Both sorts
/// are stable.
pub fn filter_and_rank(
    candidates: Vec<SimilarSetupWithDetails>,
    config: &RagConfig,
) -> RankedSetups {
    let mut qualifying: Vec<SimilarSetupWithDetails> = candidates
        .into_iter()
        .filter(|c| {
            c.quality_score
                .map(|q| q >= config.min_quality_score)
                .unwrap_or(false)
        })
        .collect();

    let all_measured = !qualifying.is_empty() && qualifying.iter().all(|c| c.similarity.is_some());

    let mode = if all_measured {
        qualifying.retain(|c| c.similarity.unwrap_or(0.0) >= config.min_similarity);
        qualifying.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(Ordering::Equal)
        });
        RankingMode::Similarity
    } else {
        qualifying.sort_by(|a, b| {
            b.quality_score
                .partial_cmp(&a.quality_score)
                .unwrap_or(Ordering::Equal)
        });
        RankingMode::QualityOnly
    };

    qualifying.truncate(config.max_similar_setups);

    RankedSetups {
        setups: qualifying,
        mode,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(quality: f32, similarity: Option<f32>) -> SimilarSetupWithDetails {
        SimilarSetupWithDetails {
            trade_setup_id: Uuid::new_v4(),
            direction: Some("BUY".to_string()),
            entry_price: Some("1.0850".to_string()),
            quality_score: Some(quality),
            risk_reward_ratio: Some("1:2".to_string()),
            order_type: Some("limit".to_string()),
            similarity,
        }
    }

    #[test]
    fn test_quality_floor_boundary_is_inclusive() {
        let config = RagConfig::default();
        let candidates = vec![
            candidate(7.0, Some(0.9)),
            candidate(6.99, Some(0.9)),
            candidate(8.0, Some(0.9)),
        ];

        let ranked = filter_and_rank(candidates, &config);
        assert_eq!(ranked.setups.len(), 2);
        assert!(ranked
            .setups
            .iter()
            .all(|s| s.quality_score.expect("quality is set") >= 7.0));
    }

    #[test]
    fn test_null_quality_is_excluded() {
        let config = RagConfig::default();
        let mut unknown = candidate(9.0, Some(0.9));
        unknown.quality_score = None;

        let ranked = filter_and_rank(vec![unknown, candidate(8.0, Some(0.9))], &config);
        assert_eq!(ranked.setups.len(), 1);
        assert_eq!(ranked.setups[0].quality_score, Some(8.0));
    }

    #[test]
    fn test_similarity_floor_applies_in_similarity_mode() {
        let config = RagConfig::default();
        let candidates = vec![
            candidate(9.0, Some(0.95)),
            candidate(9.0, Some(0.74)),
            candidate(9.0, Some(0.75)),
        ];

        let ranked = filter_and_rank(candidates, &config);
        assert_eq!(ranked.mode, RankingMode::Similarity);
        assert_eq!(ranked.setups.len(), 2);
        assert_eq!(ranked.setups[0].similarity, Some(0.95));
        assert_eq!(ranked.setups[1].similarity, Some(0.75));
    }

    #[test]
    fn test_high_similarity_cannot_rescue_low_quality() {
        // Quality floor applies even to near-perfect matches
        let config = RagConfig::default();
        let ranked = filter_and_rank(vec![candidate(4.0, Some(0.95))], &config);
        assert!(ranked.setups.is_empty());
    }

    #[test]
    fn test_cap_keeps_highest_ranked() {
        let config = RagConfig::default();
        let candidates = vec![
            candidate(7.5, Some(0.80)),
            candidate(8.0, Some(0.95)),
            candidate(9.0, Some(0.90)),
            candidate(7.0, Some(0.85)),
            candidate(8.5, Some(0.78)),
        ];

        let ranked = filter_and_rank(candidates, &config);
        assert_eq!(ranked.setups.len(), 3);
        let sims: Vec<f32> = ranked
            .setups
            .iter()
            .map(|s| s.similarity.expect("similarity is set"))
            .collect();
        assert_eq!(sims, vec![0.95, 0.90, 0.85]);
    }

    #[test]
    fn test_missing_similarity_switches_to_quality_only() {
        let config = RagConfig::default();
        let candidates = vec![
            candidate(7.5, None),
            candidate(9.0, None),
            candidate(8.0, None),
        ];

        let ranked = filter_and_rank(candidates, &config);
        assert_eq!(ranked.mode, RankingMode::QualityOnly);
        let qualities: Vec<f32> = ranked
            .setups
            .iter()
            .map(|s| s.quality_score.expect("quality is set"))
            .collect();
        assert_eq!(qualities, vec![9.0, 8.0, 7.5]);
    }

    #[test]
    fn test_custom_thresholds_are_honored() {
        let config = RagConfig {
            max_similar_setups: 1,
            min_quality_score: 5.0,
            min_similarity: 0.5,
            max_knowledge_tokens: 800,
        };
        let candidates = vec![candidate(5.0, Some(0.6)), candidate(6.0, Some(0.55))];

        let ranked = filter_and_rank(candidates, &config);
        assert_eq!(ranked.setups.len(), 1);
        assert_eq!(ranked.setups[0].similarity, Some(0.6));
    }

    #[test]
    fn test_empty_input_is_quality_only_but_empty() {
        let ranked = filter_and_rank(Vec::new(), &RagConfig::default());
        assert!(ranked.setups.is_empty());
    }

    #[test]
    fn test_equal_similarity_preserves_input_order() {
        let config = RagConfig::default();
        let first = candidate(7.0, Some(0.9));
        let second = candidate(8.0, Some(0.9));
        let first_id = first.trade_setup_id;
        let second_id = second.trade_setup_id;

        let ranked = filter_and_rank(vec![first, second], &config);
        assert_eq!(ranked.setups[0].trade_setup_id, first_id);
        assert_eq!(ranked.setups[1].trade_setup_id, second_id);
    }
}
