use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quizgen_core::model::{Question, QuestionId, SessionId, UsageState};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("read-only source")]
    ReadOnly,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("io error: {0}")]
    Io(String),
}

/// Persisted shape of a question, as rows come out of a CSV file or table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionRecord {
    pub id: u64,
    pub question: String,
    pub category: String,
    pub difficulty: String,
    pub kind: String,
}

impl QuestionRecord {
    #[must_use]
    pub fn from_question(question: &Question) -> Self {
        Self {
            id: question.id().value(),
            question: question.text().to_owned(),
            category: question.category().to_owned(),
            difficulty: question.difficulty().as_str().to_owned(),
            kind: question.kind().to_owned(),
        }
    }

    /// Convert the record into a validated domain `Question`.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` if any field fails domain validation.
    pub fn into_question(self) -> Result<Question, quizgen_core::model::QuestionError> {
        Question::from_raw(
            QuestionId::new(self.id),
            self.question,
            &self.category,
            &self.difficulty,
            &self.kind,
        )
    }
}

/// Read side of the question bank.
#[async_trait]
pub trait QuestionSource: Send + Sync {
    /// Load every valid question from the backing source.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the source cannot be read.
    async fn load_questions(&self) -> Result<Vec<Question>, StorageError>;

    /// Persist or replace a question by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::ReadOnly` for sources that cannot be written.
    async fn upsert_question(&self, question: &Question) -> Result<(), StorageError>;
}

/// Session-scoped usage tracking storage.
///
/// Implementations make individual calls atomic; callers that read, modify and
/// write back a session's state must hold that session's lock for the whole
/// sequence.
#[async_trait]
pub trait UsageStore: Send + Sync {
    /// Fetch the state for a session, if one has been stored.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn get(&self, session: &SessionId) -> Result<Option<UsageState>, StorageError>;

    /// Store (replace) the state for a session.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn put(&self, session: &SessionId, state: &UsageState) -> Result<(), StorageError>;

    /// Drop sessions whose `last_seen` is older than `cutoff`. Returns how many were removed.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn evict_idle(&self, cutoff: DateTime<Utc>) -> Result<usize, StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    questions: Arc<Mutex<Vec<Question>>>,
    usage: Arc<Mutex<HashMap<SessionId, UsageState>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the repository with questions, replacing same-id entries.
    #[must_use]
    pub fn with_questions(questions: impl IntoIterator<Item = Question>) -> Self {
        let repo = Self::new();
        if let Ok(mut guard) = repo.questions.lock() {
            for q in questions {
                upsert_in_place(&mut guard, q);
            }
        }
        repo
    }
}

fn upsert_in_place(questions: &mut Vec<Question>, question: Question) {
    match questions.iter_mut().find(|q| q.id() == question.id()) {
        Some(slot) => *slot = question,
        None => questions.push(question),
    }
}

#[async_trait]
impl QuestionSource for InMemoryRepository {
    async fn load_questions(&self) -> Result<Vec<Question>, StorageError> {
        let guard = self
            .questions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.clone())
    }

    async fn upsert_question(&self, question: &Question) -> Result<(), StorageError> {
        let mut guard = self
            .questions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        upsert_in_place(&mut guard, question.clone());
        Ok(())
    }
}

#[async_trait]
impl UsageStore for InMemoryRepository {
    async fn get(&self, session: &SessionId) -> Result<Option<UsageState>, StorageError> {
        let guard = self
            .usage
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(session).cloned())
    }

    async fn put(&self, session: &SessionId, state: &UsageState) -> Result<(), StorageError> {
        let mut guard = self
            .usage
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(session.clone(), state.clone());
        Ok(())
    }

    async fn evict_idle(&self, cutoff: DateTime<Utc>) -> Result<usize, StorageError> {
        let mut guard = self
            .usage
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let before = guard.len();
        guard.retain(|_, state| state.last_seen() >= cutoff);
        Ok(before - guard.len())
    }
}

/// Aggregates the question source and usage store behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub questions: Arc<dyn QuestionSource>,
    pub usage: Arc<dyn UsageStore>,
}

impl Storage {
    /// Questions from a CSV file, usage tracked in memory.
    #[must_use]
    pub fn csv(path: impl Into<std::path::PathBuf>) -> Self {
        let questions: Arc<dyn QuestionSource> =
            Arc::new(crate::csv_source::CsvQuestionSource::new(path));
        let usage: Arc<dyn UsageStore> = Arc::new(InMemoryRepository::new());
        Self { questions, usage }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use quizgen_core::model::Difficulty;
    use quizgen_core::time::fixed_now;

    fn question(id: u64, text: &str) -> Question {
        Question::new(QuestionId::new(id), text, "Math", Difficulty::Easy, "MCQ").unwrap()
    }

    #[tokio::test]
    async fn upsert_replaces_same_id() {
        let repo = InMemoryRepository::with_questions([question(1, "old"), question(2, "two")]);
        repo.upsert_question(&question(1, "new")).await.unwrap();

        let loaded = repo.load_questions().await.unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].text(), "new");
    }

    #[tokio::test]
    async fn usage_round_trips_and_evicts_idle_sessions() {
        let repo = InMemoryRepository::new();
        let fresh = SessionId::generate();
        let stale = SessionId::generate();

        let mut state = UsageState::new(fixed_now());
        state.mark_used(QuestionId::new(3));
        repo.put(&fresh, &state).await.unwrap();
        repo.put(&stale, &UsageState::new(fixed_now() - Duration::hours(2)))
            .await
            .unwrap();

        assert_eq!(repo.get(&fresh).await.unwrap(), Some(state));

        let removed = repo
            .evict_idle(fixed_now() - Duration::hours(1))
            .await
            .unwrap();
        assert_eq!(removed, 1);
        assert!(repo.get(&stale).await.unwrap().is_none());
        assert!(repo.get(&fresh).await.unwrap().is_some());
    }

    #[test]
    fn record_round_trips_question() {
        let q = question(9, "What?");
        let record = QuestionRecord::from_question(&q);
        assert_eq!(record.difficulty, "Easy");
        assert_eq!(record.into_question().unwrap(), q);
    }
}
