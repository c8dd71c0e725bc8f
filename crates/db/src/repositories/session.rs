use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sommelier_core::session::{SessionId, SessionState};

use super::{RepositoryError, SessionRepository};
use crate::DbPool;

/// Session state stored as one JSON document per conversation.
pub struct SqlSessionRepository {
    pool: DbPool,
}

impl SqlSessionRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionRepository for SqlSessionRepository {
    async fn load(&self, id: &SessionId) -> Result<Option<SessionState>, RepositoryError> {
        let state_json = sqlx::query_scalar::<_, String>(
            "SELECT state_json FROM sessions WHERE session_id = ?",
        )
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;

        state_json
            .map(|json| {
                serde_json::from_str::<SessionState>(&json).map_err(|error| {
                    RepositoryError::Decode(format!("invalid state for session {id}: {error}"))
                })
            })
            .transpose()
    }

    async fn save(
        &self,
        id: &SessionId,
        state: &SessionState,
        now: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let state_json = serde_json::to_string(state).map_err(|error| {
            RepositoryError::Decode(format!("could not encode session {id}: {error}"))
        })?;

        sqlx::query(
            r#"
            INSERT INTO sessions (session_id, state_json, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(session_id) DO UPDATE SET
                state_json = excluded.state_json,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&id.0)
        .bind(state_json)
        .bind(timestamp(now))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn purge_idle(&self, cutoff: DateTime<Utc>) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM sessions WHERE updated_at < ?")
            .bind(timestamp(cutoff))
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

/// Fixed-width UTC text so lexical comparison matches chronological order.
pub(crate) fn timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}
