use chrono::{DateTime, Utc};
use quizgen_core::model::{SessionId, UsageState};
use sqlx::Row;

use super::{
    SqliteRepository,
    mapping::{question_id_from_i64, question_id_to_i64},
};
use crate::repository::{StorageError, UsageStore};

fn conn(e: sqlx::Error) -> StorageError {
    StorageError::Connection(e.to_string())
}

#[async_trait::async_trait]
impl UsageStore for SqliteRepository {
    async fn get(&self, session: &SessionId) -> Result<Option<UsageState>, StorageError> {
        let Some(row) = sqlx::query(
            "SELECT exhausted, last_seen FROM usage_sessions WHERE session_id = ?1",
        )
        .bind(session.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?
        else {
            return Ok(None);
        };

        let exhausted: bool = row.try_get("exhausted").map_err(conn)?;
        let last_seen: DateTime<Utc> = row.try_get("last_seen").map_err(conn)?;

        let served = sqlx::query(
            "SELECT question_id FROM usage_served WHERE session_id = ?1 ORDER BY question_id",
        )
        .bind(session.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let used_ids = served
            .iter()
            .map(|r| question_id_from_i64(r.try_get("question_id").map_err(conn)?))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Some(UsageState::from_persisted(used_ids, exhausted, last_seen)))
    }

    async fn put(&self, session: &SessionId, state: &UsageState) -> Result<(), StorageError> {
        let mut tx = self.pool.begin().await.map_err(conn)?;

        sqlx::query(
            r"
            INSERT INTO usage_sessions (session_id, exhausted, last_seen)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(session_id) DO UPDATE SET
                exhausted = excluded.exhausted,
                last_seen = excluded.last_seen
            ",
        )
        .bind(session.as_str())
        .bind(state.exhausted())
        .bind(state.last_seen())
        .execute(&mut *tx)
        .await
        .map_err(conn)?;

        sqlx::query("DELETE FROM usage_served WHERE session_id = ?1")
            .bind(session.as_str())
            .execute(&mut *tx)
            .await
            .map_err(conn)?;

        for id in state.used_ids() {
            sqlx::query("INSERT INTO usage_served (session_id, question_id) VALUES (?1, ?2)")
                .bind(session.as_str())
                .bind(question_id_to_i64(*id)?)
                .execute(&mut *tx)
                .await
                .map_err(conn)?;
        }

        tx.commit().await.map_err(conn)?;
        Ok(())
    }

    async fn evict_idle(&self, cutoff: DateTime<Utc>) -> Result<usize, StorageError> {
        let result = sqlx::query("DELETE FROM usage_sessions WHERE last_seen < ?1")
            .bind(cutoff)
            .execute(&self.pool)
            .await
            .map_err(conn)?;
        Ok(usize::try_from(result.rows_affected()).unwrap_or(usize::MAX))
    }
}
