use quizgen_core::model::Question;

use super::{
    SqliteRepository,
    mapping::{map_question_row, question_id_to_i64},
};
use crate::repository::{QuestionSource, StorageError};

#[async_trait::async_trait]
impl QuestionSource for SqliteRepository {
    async fn load_questions(&self) -> Result<Vec<Question>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, question, category, difficulty, type
            FROM questions
            ORDER BY id
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        rows.iter().map(map_question_row).collect()
    }

    async fn upsert_question(&self, question: &Question) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO questions (id, question, category, difficulty, type)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(id) DO UPDATE SET
                question = excluded.question,
                category = excluded.category,
                difficulty = excluded.difficulty,
                type = excluded.type
            ",
        )
        .bind(question_id_to_i64(question.id())?)
        .bind(question.text().to_owned())
        .bind(question.category().to_owned())
        .bind(question.difficulty().as_str())
        .bind(question.kind().to_owned())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }
}
