//! User feedback storage
//! Free-text feedback on generated setups, kept for the refinement flow.

use crate::errors::KnowledgeResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Row};
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub id: Uuid,
    pub trade_setup_id: Option<Uuid>,
    pub company_id: Uuid,
    pub user_id: Uuid,
    pub user_name: Option<String>,
    pub feedback_text: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct FeedbackDAO {
    pool: PgPool,
}

impl FeedbackDAO {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(
        &self,
        company_id: Uuid,
        user_id: Uuid,
        user_name: Option<&str>,
        trade_setup_id: Option<Uuid>,
        feedback_text: &str,
    ) -> KnowledgeResult<Uuid> {
        let row = sqlx::query(
            r#"
            INSERT INTO feedback (company_id, user_id, user_name, trade_setup_id, feedback_text)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(company_id)
        .bind(user_id)
        .bind(user_name)
        .bind(trade_setup_id)
        .bind(feedback_text)
        .fetch_one(&self.pool)
        .await?;

        let id: Uuid = row.try_get("id")?;
        info!("Recorded feedback {} for company {}", id, company_id);
        Ok(id)
    }

    pub async fn list_for_setup(&self, trade_setup_id: Uuid) -> KnowledgeResult<Vec<FeedbackRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, trade_setup_id, company_id, user_id, user_name, feedback_text, created_at
            FROM feedback
            WHERE trade_setup_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(trade_setup_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                Ok(FeedbackRecord {
                    id: row.try_get("id")?,
                    trade_setup_id: row.try_get("trade_setup_id")?,
                    company_id: row.try_get("company_id")?,
                    user_id: row.try_get("user_id")?,
                    user_name: row.try_get("user_name")?,
                    feedback_text: row.try_get("feedback_text")?,
                    created_at: row.try_get("created_at")?,
                })
            })
            .collect()
    }
}
