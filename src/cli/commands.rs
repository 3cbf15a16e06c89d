use anyhow::{Context, Result};
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::Config;
use crate::db::Database;
use crate::embeddings::EmbeddingClient;
use crate::knowledge::{KnowledgeDAO, KnowledgeRetriever, SetupPersister};
use crate::setups::{FeedbackDAO, NewTradeSetup, SetupDAO, TradeSetupPayload};
use crate::vector::VectorStore;

/// Run database migrations and make sure the vector index exists
pub async fn migrate(db: Database, config: Config) -> Result<()> {
    db.run_migrations().await?;

    let store = VectorStore::new(db.pool, config.embedding.dimension).await?;
    store.ensure_hnsw_index("knowledge", "embedding").await?;

    println!("Migrations completed");
    Ok(())
}

/// Show setup and knowledge store statistics
pub async fn stats(pool: PgPool, company: Option<Uuid>) -> Result<()> {
    let setup_dao = SetupDAO::new(pool.clone());
    let knowledge_dao = KnowledgeDAO::new(pool);

    let setup_stats = setup_dao.stats(company).await?;
    let knowledge_stats = knowledge_dao.stats().await?;

    println!("Trade setups: {}", setup_stats.total_setups);
    println!("  with quality score: {}", setup_stats.with_quality_score);
    if let Some(avg) = setup_stats.avg_quality {
        println!("  average quality: {:.1}", avg);
    }
    println!("Knowledge entries: {}", knowledge_stats.total_entries);
    println!("  with embedding: {}", knowledge_stats.with_embedding);
    let missing = knowledge_stats.total_entries - knowledge_stats.with_embedding;
    if missing > 0 {
        println!("  missing embedding: {} (run `chartsage backfill`)", missing);
    }
    Ok(())
}

/// Run the full retrieval pipeline for the given analysis text
pub async fn query(
    pool: PgPool,
    config: Config,
    text: String,
    company: Option<Uuid>,
) -> Result<()> {
    let embedder = Arc::new(EmbeddingClient::new(&config.embedding)?);
    let vector_store = Arc::new(VectorStore::new(pool.clone(), config.embedding.dimension).await?);
    let setup_dao = SetupDAO::new(pool);

    let retriever = KnowledgeRetriever::new(embedder, vector_store, setup_dao, config.rag);
    let context = retriever.relevant_knowledge(&text, company).await;

    if context.is_empty() {
        println!("No relevant past setups found");
    } else {
        println!("Relevant past setups:\n{}", context);
    }
    Ok(())
}

/// Validate a setup payload from disk and run the persistence pipeline
#[allow(clippy::too_many_arguments)]
pub async fn save(
    pool: PgPool,
    config: Config,
    company: Uuid,
    user: Uuid,
    user_name: Option<String>,
    analysis: String,
    setup_path: String,
) -> Result<()> {
    let raw = std::fs::read_to_string(&setup_path)
        .with_context(|| format!("Failed to read setup payload from {}", setup_path))?;
    let value: serde_json::Value =
        serde_json::from_str(&raw).context("Setup payload is not valid JSON")?;
    let payload = TradeSetupPayload::from_json(&value)?;

    let embedder = Arc::new(EmbeddingClient::new(&config.embedding)?);
    let setup_dao = SetupDAO::new(pool.clone());
    let knowledge_dao = KnowledgeDAO::new(pool);
    let persister = SetupPersister::new(setup_dao, knowledge_dao, embedder);

    let setup_id = persister
        .save(NewTradeSetup {
            company_id: company,
            user_id: user,
            user_name,
            analysis,
            payload,
        })
        .await?;

    println!("Saved trade setup {}", setup_id);
    Ok(())
}

/// Re-embed knowledge entries that were stored without a vector
pub async fn backfill(pool: PgPool, config: Config, limit: usize) -> Result<()> {
    let embedder = EmbeddingClient::new(&config.embedding)?;
    let knowledge_dao = KnowledgeDAO::new(pool);

    let repaired = knowledge_dao.backfill_embeddings(&embedder, limit).await?;
    println!("Backfilled embeddings for {} knowledge entries", repaired);
    Ok(())
}

/// List recent setups for a company
pub async fn list_setups(pool: PgPool, company: Uuid, limit: usize) -> Result<()> {
    let setup_dao = SetupDAO::new(pool);
    let setups = setup_dao.list_for_company(company, limit).await?;

    if setups.is_empty() {
        println!("No setups found for company {}", company);
        return Ok(());
    }

    for setup in setups {
        println!(
            "{}  {}  {}  quality={}  {}",
            setup.created_at.format("%Y-%m-%d %H:%M"),
            setup.id,
            setup.direction.as_deref().unwrap_or("N/A"),
            setup
                .quality_score
                .map(|q| q.to_string())
                .unwrap_or_else(|| "N/A".to_string()),
            setup.user_name.as_deref().unwrap_or("unknown"),
        );
    }
    Ok(())
}

/// Record user feedback on a setup
pub async fn feedback(
    pool: PgPool,
    company: Uuid,
    user: Uuid,
    user_name: Option<String>,
    setup_id: Option<Uuid>,
    text: String,
) -> Result<()> {
    let feedback_dao = FeedbackDAO::new(pool);
    let id = feedback_dao
        .insert(company, user, user_name.as_deref(), setup_id, &text)
        .await?;
    println!("Recorded feedback {}", id);
    Ok(())
}
