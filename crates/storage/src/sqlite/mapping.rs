use quizgen_core::model::{Question, QuestionId};
use sqlx::Row;

use crate::repository::{QuestionRecord, StorageError};

fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn question_id_from_i64(v: i64) -> Result<QuestionId, StorageError> {
    u64::try_from(v)
        .map(QuestionId::new)
        .map_err(|_| StorageError::Serialization("question_id sign overflow".into()))
}

pub(crate) fn question_id_to_i64(id: QuestionId) -> Result<i64, StorageError> {
    i64::try_from(id.value())
        .map_err(|_| StorageError::Serialization("question_id overflow".into()))
}

pub(crate) fn map_question_row(row: &sqlx::sqlite::SqliteRow) -> Result<Question, StorageError> {
    let id = question_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?;
    QuestionRecord {
        id: id.value(),
        question: row.try_get("question").map_err(ser)?,
        category: row.try_get("category").map_err(ser)?,
        difficulty: row.try_get("difficulty").map_err(ser)?,
        kind: row.try_get("type").map_err(ser)?,
    }
    .into_question()
    .map_err(ser)
}
