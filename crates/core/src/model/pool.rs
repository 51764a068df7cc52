use std::collections::{BTreeSet, HashSet};

use serde::Serialize;
use thiserror::Error;

use crate::model::ids::QuestionId;
use crate::model::question::{Difficulty, Question};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum PoolError {
    #[error("duplicate question id: {0}")]
    DuplicateId(QuestionId),
}

/// Valid attribute values present in a pool, for callers that validate requests.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AttributeDomains {
    pub categories: BTreeSet<String>,
    pub difficulties: BTreeSet<Difficulty>,
    pub types: BTreeSet<String>,
}

/// Immutable snapshot of the question bank.
///
/// Built once from a source and shared read-only; reloading produces a new
/// snapshot rather than mutating this one.
#[derive(Debug, Clone, Default)]
pub struct QuestionPool {
    questions: Vec<Question>,
    ids: HashSet<QuestionId>,
}

impl QuestionPool {
    /// Builds a pool, preserving source order.
    ///
    /// # Errors
    ///
    /// Returns `PoolError::DuplicateId` if two questions share an id.
    pub fn new(questions: Vec<Question>) -> Result<Self, PoolError> {
        let mut ids = HashSet::with_capacity(questions.len());
        for question in &questions {
            if !ids.insert(question.id()) {
                return Err(PoolError::DuplicateId(question.id()));
            }
        }
        Ok(Self { questions, ids })
    }

    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    #[must_use]
    pub fn contains(&self, id: QuestionId) -> bool {
        self.ids.contains(&id)
    }

    #[must_use]
    pub fn domains(&self) -> AttributeDomains {
        let mut domains = AttributeDomains::default();
        for q in &self.questions {
            domains.categories.insert(q.category().to_owned());
            domains.difficulties.insert(q.difficulty());
            domains.types.insert(q.kind().to_owned());
        }
        domains
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(id: u64, category: &str, difficulty: Difficulty, kind: &str) -> Question {
        Question::new(QuestionId::new(id), format!("Q{id}"), category, difficulty, kind).unwrap()
    }

    #[test]
    fn rejects_duplicate_ids() {
        let err = QuestionPool::new(vec![
            question(1, "A", Difficulty::Easy, "MCQ"),
            question(1, "B", Difficulty::Hard, "Short"),
        ])
        .unwrap_err();
        assert_eq!(err, PoolError::DuplicateId(QuestionId::new(1)));
    }

    #[test]
    fn knows_its_ids_and_reports_domains() {
        let pool = QuestionPool::new(vec![
            question(1, "A", Difficulty::Easy, "MCQ"),
            question(2, "B", Difficulty::Hard, "Short"),
            question(3, "A", Difficulty::Hard, "MCQ"),
        ])
        .unwrap();

        assert_eq!(pool.len(), 3);
        assert!(pool.contains(QuestionId::new(2)));
        assert!(!pool.contains(QuestionId::new(9)));

        let domains = pool.domains();
        assert_eq!(domains.categories.len(), 2);
        assert_eq!(
            domains.difficulties.into_iter().collect::<Vec<_>>(),
            vec![Difficulty::Easy, Difficulty::Hard]
        );
        assert!(domains.types.contains("Short"));
    }

    #[test]
    fn empty_pool_is_empty() {
        assert!(QuestionPool::empty().is_empty());
    }
}
