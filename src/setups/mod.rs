//! Trade setup domain types
//! The structured setup payload is validated once at the system boundary
//! (when a generation response is received); everything downstream consumes
//! the typed value.

mod feedback;
mod records;

pub use feedback::{FeedbackDAO, FeedbackRecord};
pub use records::{NewTradeSetup, QualifyingSetup, SetupDAO, SetupStats, TradeSetupRecord};

use crate::errors::{KnowledgeError, KnowledgeResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Trade direction as produced by the setup generator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    #[serde(rename = "BUY")]
    Buy,
    #[serde(rename = "SELL")]
    Sell,
    #[serde(rename = "NO SETUP AVAILABLE")]
    NoSetup,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Buy => "BUY",
            Direction::Sell => "SELL",
            Direction::NoSetup => "NO SETUP AVAILABLE",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    Market,
    Limit,
    Stop,
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OrderType::Market => "market",
            OrderType::Limit => "limit",
            OrderType::Stop => "stop",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StopLoss {
    pub level: String,
    pub reasoning: String,
}

/// Structured trade recommendation produced by the completion provider.
/// Price levels stay as strings: they are display values quoted from chart
/// analysis, not numbers this system does arithmetic on.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeSetupPayload {
    pub direction: Direction,
    pub entry_price: String,
    pub stop_loss: StopLoss,
    pub tp1: String,
    pub tp2: String,
    pub order_type: OrderType,
    pub risk_reward_ratio: String,
    pub quality_score: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

impl TradeSetupPayload {
    /// Validate boundary invariants. Called once when the payload enters the
    /// system; internal components can then trust the value.
    pub fn validate(&self) -> KnowledgeResult<()> {
        if !self.quality_score.is_finite() {
            return Err(KnowledgeError::InvalidPayload {
                field: "qualityScore".to_string(),
                message: "must be a finite number".to_string(),
            });
        }
        if !(1.0..=10.0).contains(&self.quality_score) {
            return Err(KnowledgeError::InvalidPayload {
                field: "qualityScore".to_string(),
                message: format!("must be within [1, 10], got {}", self.quality_score),
            });
        }
        if self.direction != Direction::NoSetup && self.entry_price.trim().is_empty() {
            return Err(KnowledgeError::InvalidPayload {
                field: "entryPrice".to_string(),
                message: "must not be empty for an actionable setup".to_string(),
            });
        }
        Ok(())
    }

    /// Parse and validate a payload from a raw generation response.
    pub fn from_json(value: &serde_json::Value) -> KnowledgeResult<Self> {
        let payload: TradeSetupPayload = serde_json::from_value(value.clone())?;
        payload.validate()?;
        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

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
            reasoning: Some("Clean break and retest of resistance".to_string()),
        }
    }

    #[test]
    fn test_valid_payload_passes() {
        sample_payload().validate().expect("payload should validate");
    }

    #[test]
    fn test_quality_score_bounds() {
        let mut payload = sample_payload();
        payload.quality_score = 0.5;
        assert!(payload.validate().is_err());

        payload.quality_score = 10.1;
        assert!(payload.validate().is_err());

        // Boundaries are inclusive
        payload.quality_score = 1.0;
        assert!(payload.validate().is_ok());
        payload.quality_score = 10.0;
        assert!(payload.validate().is_ok());
    }

    #[test]
    fn test_nan_quality_score_rejected() {
        let mut payload = sample_payload();
        payload.quality_score = f32::NAN;
        assert!(payload.validate().is_err());
    }

    #[test]
    fn test_empty_entry_rejected_unless_no_setup() {
        let mut payload = sample_payload();
        payload.entry_price = "  ".to_string();
        assert!(payload.validate().is_err());

        payload.direction = Direction::NoSetup;
        assert!(payload.validate().is_ok());
    }

    #[test]
    fn test_from_json_matches_generator_shape() {
        let raw = json!({
            "direction": "SELL",
            "entryPrice": "42150",
            "stopLoss": { "level": "42600", "reasoning": "Above supply zone" },
            "tp1": "41500",
            "tp2": "40800",
            "orderType": "limit",
            "riskRewardRatio": "1:3",
            "qualityScore": 9,
        });

        let payload = TradeSetupPayload::from_json(&raw).expect("payload should parse");
        assert_eq!(payload.direction, Direction::Sell);
        assert_eq!(payload.order_type, OrderType::Limit);
        assert_eq!(payload.quality_score, 9.0);
        assert!(payload.reasoning.is_none());
    }

    #[test]
    fn test_from_json_rejects_unknown_direction() {
        let raw = json!({
            "direction": "HOLD",
            "entryPrice": "1.0",
            "stopLoss": { "level": "0.9", "reasoning": "x" },
            "tp1": "1.1",
            "tp2": "1.2",
            "orderType": "market",
            "riskRewardRatio": "1:1",
            "qualityScore": 7,
        });
        assert!(TradeSetupPayload::from_json(&raw).is_err());
    }

    #[test]
    fn test_serde_roundtrip_preserves_wire_names() {
        let payload = sample_payload();
        let value = serde_json::to_value(&payload).expect("serialize");
        assert_eq!(value["direction"], "BUY");
        assert!(value.get("entryPrice").is_some());
        assert!(value.get("riskRewardRatio").is_some());
        assert!(value.get("entry_price").is_none());
    }
}
