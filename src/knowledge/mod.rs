//! Retrieval-augmented knowledge subsystem
//! - entries: knowledge table data access (embedding index over setups)
//! - filter: quality/similarity filtering and ranking
//! - formatter: token-bounded prompt context rendering
//! - retrieval: the degrade-to-empty orchestrator
//! - persist: the partial-failure-tolerant save pipeline

pub mod entries;
pub mod filter;
pub mod formatter;
pub mod persist;
pub mod retrieval;

pub use entries::{KnowledgeDAO, KnowledgeEntry, KnowledgeStats, NewKnowledgeEntry};
pub use filter::{filter_and_rank, RankedSetups, RankingMode, SimilarSetupWithDetails};
pub use formatter::format_similar_setups;
pub use persist::SetupPersister;
pub use retrieval::KnowledgeRetriever;
