use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use tracing::info;
use uuid::Uuid;

use crate::data::map_db_error;
use crate::domain::advice::{Advice, Category};
use crate::domain::error::DomainError;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AdviceRepository: Send + Sync {
    async fn create(&self, advice: Advice) -> Result<Advice, DomainError>;
    /// Most recent first.
    async fn list(&self, category: Option<Category>) -> Result<Vec<Advice>, DomainError>;
}

#[derive(FromRow)]
struct AdviceRow {
    id: Uuid,
    category: String,
    question: String,
    answer: String,
    author_id: Option<Uuid>,
    created_at: DateTime<Utc>,
}

impl TryFrom<AdviceRow> for Advice {
    type Error = DomainError;

    fn try_from(row: AdviceRow) -> Result<Self, Self::Error> {
        Ok(Advice {
            id: row.id,
            category: row.category.parse().map_err(DomainError::Internal)?,
            question: row.question,
            answer: row.answer,
            author_id: row.author_id,
            created_at: row.created_at,
        })
    }
}

#[derive(Clone)]
pub struct PostgresAdviceRepository {
    pool: PgPool,
}

impl PostgresAdviceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AdviceRepository for PostgresAdviceRepository {
    async fn create(&self, advice: Advice) -> Result<Advice, DomainError> {
        sqlx::query(
            r#"
            INSERT INTO advices (id, category, question, answer, author_id, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(advice.id)
        .bind(advice.category.as_str())
        .bind(&advice.question)
        .bind(&advice.answer)
        .bind(advice.author_id)
        .bind(advice.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_db_error("advices.create", e))?;

        info!(advice_id = %advice.id, category = %advice.category, "advice created");
        Ok(advice)
    }

    async fn list(&self, category: Option<Category>) -> Result<Vec<Advice>, DomainError> {
        let rows = sqlx::query_as::<_, AdviceRow>(
            r#"
            SELECT id, category, question, answer, author_id, created_at
            FROM advices
            WHERE $1::text IS NULL OR category = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(category.map(|c| c.as_str()))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_db_error("advices.list", e))?;

        rows.into_iter().map(Advice::try_from).collect()
    }
}
