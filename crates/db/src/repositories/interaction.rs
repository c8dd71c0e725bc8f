use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;

use super::session::timestamp;
use super::{Interaction, InteractionKind, InteractionRepository, NewInteraction, RepositoryError};
use crate::DbPool;

pub struct SqlInteractionRepository {
    pool: DbPool,
}

impl SqlInteractionRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl InteractionRepository for SqlInteractionRepository {
    async fn record(&self, interaction: NewInteraction) -> Result<i64, RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO interactions (kind, message, reply, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(interaction.kind.as_str())
        .bind(&interaction.message)
        .bind(&interaction.reply)
        .bind(timestamp(interaction.created_at))
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    async fn recent(&self, limit: usize) -> Result<Vec<Interaction>, RepositoryError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = sqlx::query(
            "SELECT id, kind, message, reply, created_at FROM interactions
             ORDER BY created_at DESC, id DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| -> Result<Interaction, RepositoryError> {
                let id: i64 = row.try_get("id")?;
                let kind: String = row.try_get("kind")?;
                let created_at: String = row.try_get("created_at")?;
                Ok(Interaction {
                    id,
                    kind: InteractionKind::parse(&kind).ok_or_else(|| {
                        RepositoryError::Decode(format!("interaction {id} has unknown kind `{kind}`"))
                    })?,
                    message: row.try_get("message")?,
                    reply: row.try_get("reply")?,
                    created_at: DateTime::parse_from_rfc3339(&created_at)
                        .map(|value| value.with_timezone(&Utc))
                        .map_err(|error| {
                            RepositoryError::Decode(format!("interaction {id} timestamp: {error}"))
                        })?,
                })
            })
            .collect()
    }
}
