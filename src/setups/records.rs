//! Trade setup data access layer
//! Insert and query operations for the trade_setups table.

use super::TradeSetupPayload;
use crate::errors::{KnowledgeError, KnowledgeResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Row};
use tracing::info;
use uuid::Uuid;

/// Input for a new trade setup. The payload has already been validated at
/// the boundary (TradeSetupPayload::from_json).
#[derive(Debug, Clone)]
pub struct NewTradeSetup {
    pub company_id: Uuid,
    pub user_id: Uuid,
    pub user_name: Option<String>,
    pub analysis: String,
    pub payload: TradeSetupPayload,
}

/// Stored trade setup row. Immutable after insert apart from the
/// denormalized quality/direction mirrors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeSetupRecord {
    pub id: Uuid,
    pub company_id: Uuid,
    pub user_id: Uuid,
    pub user_name: Option<String>,
    pub analysis: String,
    pub trade_setup: serde_json::Value,
    pub quality_score: Option<f32>,
    pub direction: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TradeSetupRecord {
    /// Re-hydrate the typed payload from the stored jsonb column.
    pub fn payload(&self) -> KnowledgeResult<TradeSetupPayload> {
        TradeSetupPayload::from_json(&self.trade_setup)
    }
}

/// Slim projection used by the retrieval join: only the fields the context
/// formatter needs, plus the raw payload for scalar extraction.
#[derive(Debug, Clone)]
pub struct QualifyingSetup {
    pub id: Uuid,
    pub direction: Option<String>,
    pub quality_score: Option<f32>,
    pub trade_setup: serde_json::Value,
}

/// Aggregate statistics over stored setups
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetupStats {
    pub total_setups: usize,
    pub with_quality_score: usize,
    pub avg_quality: Option<f32>,
}

/// Data access object for trade setups
#[derive(Debug, Clone)]
pub struct SetupDAO {
    pool: PgPool,
}

impl SetupDAO {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new trade setup with denormalized quality and direction.
    /// Failure here is fatal to the save operation.
    pub async fn insert(&self, setup: &NewTradeSetup) -> KnowledgeResult<Uuid> {
        let payload_json = serde_json::to_value(&setup.payload)?;

        let row = sqlx::query(
            r#"
            INSERT INTO trade_setups
                (company_id, user_id, user_name, analysis, trade_setup, quality_score, direction)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            "#,
        )
        .bind(setup.company_id)
        .bind(setup.user_id)
        .bind(&setup.user_name)
        .bind(&setup.analysis)
        .bind(&payload_json)
        .bind(setup.payload.quality_score)
        .bind(setup.payload.direction.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(KnowledgeError::Persistence)?;

        let id: Uuid = row.try_get("id").map_err(KnowledgeError::Persistence)?;
        info!("Inserted trade setup {} for company {}", id, setup.company_id);
        Ok(id)
    }

    pub async fn get_by_id(&self, id: Uuid) -> KnowledgeResult<Option<TradeSetupRecord>> {
        let row = sqlx::query(
            r#"
            SELECT id, company_id, user_id, user_name, analysis, trade_setup,
                   quality_score, direction, created_at, updated_at
            FROM trade_setups
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::record_from_row).transpose()
    }

    /// Recent setups for a company, newest first.
    pub async fn list_for_company(
        &self,
        company_id: Uuid,
        limit: usize,
    ) -> KnowledgeResult<Vec<TradeSetupRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, company_id, user_id, user_name, analysis, trade_setup,
                   quality_score, direction, created_at, updated_at
            FROM trade_setups
            WHERE company_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(company_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::record_from_row).collect()
    }

    /// Setups from the given id set whose quality score clears the floor.
    /// Null scores never qualify. Used by the retrieval join.
    pub async fn fetch_qualifying(
        &self,
        ids: &[Uuid],
        min_quality: f32,
        limit: usize,
    ) -> KnowledgeResult<Vec<QualifyingSetup>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query(
            r#"
            SELECT id, direction, quality_score, trade_setup
            FROM trade_setups
            WHERE id = ANY($1)
              AND quality_score IS NOT NULL
              AND quality_score >= $2
            LIMIT $3
            "#,
        )
        .bind(ids)
        .bind(min_quality)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                Ok(QualifyingSetup {
                    id: row.try_get("id")?,
                    direction: row.try_get("direction")?,
                    quality_score: row.try_get("quality_score")?,
                    trade_setup: row.try_get("trade_setup")?,
                })
            })
            .collect()
    }

    /// Aggregate counts, optionally scoped to one company.
    pub async fn stats(&self, company_id: Option<Uuid>) -> KnowledgeResult<SetupStats> {
        let row = sqlx::query(
            r#"
            SELECT
                COUNT(*) AS total_setups,
                COUNT(quality_score) AS with_quality_score,
                AVG(quality_score)::real AS avg_quality
            FROM trade_setups
            WHERE ($1::uuid IS NULL OR company_id = $1)
            "#,
        )
        .bind(company_id)
        .fetch_one(&self.pool)
        .await?;

        let total: i64 = row.try_get("total_setups")?;
        let with_quality: i64 = row.try_get("with_quality_score")?;
        let avg_quality: Option<f32> = row.try_get("avg_quality")?;

        Ok(SetupStats {
            total_setups: total as usize,
            with_quality_score: with_quality as usize,
            avg_quality,
        })
    }

    fn record_from_row(row: sqlx::postgres::PgRow) -> KnowledgeResult<TradeSetupRecord> {
        Ok(TradeSetupRecord {
            id: row.try_get("id")?,
            company_id: row.try_get("company_id")?,
            user_id: row.try_get("user_id")?,
            user_name: row.try_get("user_name")?,
            analysis: row.try_get("analysis")?,
            trade_setup: row.try_get("trade_setup")?,
            quality_score: row.try_get("quality_score")?,
            direction: row.try_get("direction")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}
