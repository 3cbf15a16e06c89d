// chartsage - retrieval-augmented knowledge engine for AI-generated trade
// setups. Embeds analysis text, indexes generated setups in pgvector, and
// retrieves quality-filtered similar setups as bounded prompt context.

#![deny(clippy::unwrap_used)]

pub mod config;
pub mod db;
pub mod embeddings;
pub mod errors;
pub mod knowledge;
pub mod setups;
pub mod vector;

// Re-export commonly used items
pub use config::{Config, RagConfig};
pub use errors::{KnowledgeError, KnowledgeResult};
pub use knowledge::{KnowledgeRetriever, SetupPersister};
pub use setups::{NewTradeSetup, TradeSetupPayload};
