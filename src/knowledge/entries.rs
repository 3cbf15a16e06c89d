//! Knowledge entry data access layer
//! One entry per trade setup: the embedding-source text, its vector (when
//! generation succeeded), and a small metadata map for lightweight filtering.

use crate::embeddings::EmbeddingClient;
use crate::errors::{KnowledgeError, KnowledgeResult};
use crate::vector::PgVector;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Row};
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct NewKnowledgeEntry {
    pub trade_setup_id: Option<Uuid>,
    pub company_id: Uuid,
    pub content: String,
    pub embedding: Option<Vec<f32>>,
    pub metadata: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeEntry {
    pub id: Uuid,
    pub trade_setup_id: Option<Uuid>,
    pub company_id: Uuid,
    pub content: String,
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeStats {
    pub total_entries: usize,
    pub with_embedding: usize,
}

/// Data access object for knowledge entries
#[derive(Debug, Clone)]
pub struct KnowledgeDAO {
    pool: PgPool,
}

impl KnowledgeDAO {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a knowledge entry. The embedding may be absent (degraded
    /// entry); the row is inserted regardless so the setup stays indexed
    /// for a later backfill.
    pub async fn insert(&self, entry: &NewKnowledgeEntry) -> KnowledgeResult<Uuid> {
        let embedding = entry.embedding.clone().map(PgVector::new);

        let row = sqlx::query(
            r#"
            INSERT INTO knowledge (trade_setup_id, company_id, content, embedding, metadata)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(entry.trade_setup_id)
        .bind(entry.company_id)
        .bind(&entry.content)
        .bind(embedding)
        .bind(&entry.metadata)
        .fetch_one(&self.pool)
        .await
        .map_err(KnowledgeError::KnowledgeInsert)?;

        let id: Uuid = row.try_get("id").map_err(KnowledgeError::KnowledgeInsert)?;
        info!(
            "Inserted knowledge entry {} (embedding: {})",
            id,
            if entry.embedding.is_some() { "present" } else { "absent" }
        );
        Ok(id)
    }

    pub async fn get_for_setup(&self, trade_setup_id: Uuid) -> KnowledgeResult<Option<KnowledgeEntry>> {
        let row = sqlx::query(
            r#"
            SELECT id, trade_setup_id, company_id, content, metadata, created_at
            FROM knowledge
            WHERE trade_setup_id = $1
            "#,
        )
        .bind(trade_setup_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| {
            Ok(KnowledgeEntry {
                id: row.try_get("id")?,
                trade_setup_id: row.try_get("trade_setup_id")?,
                company_id: row.try_get("company_id")?,
                content: row.try_get("content")?,
                metadata: row.try_get("metadata")?,
                created_at: row.try_get("created_at")?,
            })
        })
        .transpose()
    }

    /// Entries whose embedding generation failed at insert time.
    pub async fn entries_missing_embedding(
        &self,
        limit: usize,
    ) -> KnowledgeResult<Vec<(Uuid, String)>> {
        let rows = sqlx::query(
            r#"
            SELECT id, content
            FROM knowledge
            WHERE embedding IS NULL
            ORDER BY created_at ASC
            LIMIT $1
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| Ok((row.try_get("id")?, row.try_get("content")?)))
            .collect()
    }

    pub async fn set_embedding(&self, id: Uuid, embedding: Vec<f32>) -> KnowledgeResult<()> {
        let result = sqlx::query("UPDATE knowledge SET embedding = $1 WHERE id = $2")
            .bind(PgVector::new(embedding))
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            warn!("No knowledge entry {} to set embedding on", id);
        }
        Ok(())
    }

    /// Re-embed degraded entries. Returns the number of entries repaired;
    /// entries that fail again stay null for the next run.
    pub async fn backfill_embeddings(
        &self,
        embedder: &EmbeddingClient,
        limit: usize,
    ) -> KnowledgeResult<usize> {
        let pending = self.entries_missing_embedding(limit).await?;
        if pending.is_empty() {
            info!("No knowledge entries need embedding backfill");
            return Ok(0);
        }

        let texts: Vec<&str> = pending.iter().map(|(_, content)| content.as_str()).collect();
        let embeddings = match embedder.embed_batch(&texts).await {
            Ok(embeddings) => embeddings,
            Err(e) => {
                warn!("Backfill embedding batch failed, entries stay degraded: {}", e);
                return Ok(0);
            }
        };

        let mut repaired = 0;
        for ((id, _), embedding) in pending.iter().zip(embeddings) {
            self.set_embedding(*id, embedding).await?;
            repaired += 1;
        }

        info!("Backfilled embeddings for {} knowledge entries", repaired);
        Ok(repaired)
    }

    pub async fn stats(&self) -> KnowledgeResult<KnowledgeStats> {
        let row = sqlx::query(
            r#"
            SELECT
                COUNT(*) AS total_entries,
                COUNT(embedding) AS with_embedding
            FROM knowledge
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        let total: i64 = row.try_get("total_entries")?;
        let with_embedding: i64 = row.try_get("with_embedding")?;

        Ok(KnowledgeStats {
            total_entries: total as usize,
            with_embedding: with_embedding as usize,
        })
    }
}
