use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::ids::QuestionId;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question text cannot be empty")]
    EmptyText,

    #[error("question category cannot be empty")]
    EmptyCategory,

    #[error("question type cannot be empty")]
    EmptyType,

    #[error("unknown difficulty: {0}")]
    UnknownDifficulty(String),
}

//
// ─── DIFFICULTY ────────────────────────────────────────────────────────────────
//

/// Difficulty grade of a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = QuestionError;

    /// Case-insensitive; surrounding whitespace is ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Difficulty::ALL
            .into_iter()
            .find(|d| d.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| QuestionError::UnknownDifficulty(trimmed.to_owned()))
    }
}

//
// ─── DIMENSION ─────────────────────────────────────────────────────────────────
//

/// Attribute axis along which quotas are expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Category,
    Difficulty,
    Type,
}

impl Dimension {
    pub const ALL: [Dimension; 3] = [Dimension::Category, Dimension::Difficulty, Dimension::Type];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Dimension::Category => "category",
            Dimension::Difficulty => "difficulty",
            Dimension::Type => "type",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// Trims a free-form attribute label.
#[must_use]
pub fn normalize_label(raw: &str) -> String {
    raw.trim().to_owned()
}

/// A validated question-bank record. Never mutated after load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    id: QuestionId,
    text: String,
    category: String,
    difficulty: Difficulty,
    kind: String,
}

impl Question {
    /// Creates a question, normalizing `category` and `kind` labels.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` if the text, category or type is blank.
    pub fn new(
        id: QuestionId,
        text: impl Into<String>,
        category: &str,
        difficulty: Difficulty,
        kind: &str,
    ) -> Result<Self, QuestionError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(QuestionError::EmptyText);
        }
        let category = normalize_label(category);
        if category.is_empty() {
            return Err(QuestionError::EmptyCategory);
        }
        let kind = normalize_label(kind);
        if kind.is_empty() {
            return Err(QuestionError::EmptyType);
        }

        Ok(Self {
            id,
            text,
            category,
            difficulty,
            kind,
        })
    }

    /// Parses the difficulty label before delegating to [`Question::new`].
    ///
    /// # Errors
    ///
    /// Returns `QuestionError::UnknownDifficulty` for labels outside Easy/Medium/Hard,
    /// or any error from [`Question::new`].
    pub fn from_raw(
        id: QuestionId,
        text: impl Into<String>,
        category: &str,
        difficulty: &str,
        kind: &str,
    ) -> Result<Self, QuestionError> {
        let difficulty = difficulty.parse::<Difficulty>()?;
        Self::new(id, text, category, difficulty, kind)
    }

    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn category(&self) -> &str {
        &self.category
    }

    #[must_use]
    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    /// The question type ("MCQ", "Short", ...).
    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Label of this question along `dim`.
    #[must_use]
    pub fn attribute(&self, dim: Dimension) -> &str {
        match dim {
            Dimension::Category => &self.category,
            Dimension::Difficulty => self.difficulty.as_str(),
            Dimension::Type => &self.kind,
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn difficulty_parses_case_insensitively() {
        assert_eq!("medium".parse::<Difficulty>().unwrap(), Difficulty::Medium);
        assert_eq!(" HARD ".parse::<Difficulty>().unwrap(), Difficulty::Hard);
        assert_eq!(
            "tricky".parse::<Difficulty>().unwrap_err(),
            QuestionError::UnknownDifficulty("tricky".into())
        );
    }

    #[test]
    fn question_trims_labels() {
        let q = Question::new(QuestionId::new(1), "2+2?", "  Math ", Difficulty::Easy, " MCQ")
            .unwrap();
        assert_eq!(q.category(), "Math");
        assert_eq!(q.kind(), "MCQ");
        assert_eq!(q.attribute(Dimension::Difficulty), "Easy");
        assert_eq!(q.attribute(Dimension::Type), "MCQ");
    }

    #[test]
    fn question_rejects_blank_fields() {
        let id = QuestionId::new(1);
        assert_eq!(
            Question::new(id, " ", "Math", Difficulty::Easy, "MCQ").unwrap_err(),
            QuestionError::EmptyText
        );
        assert_eq!(
            Question::new(id, "q", "", Difficulty::Easy, "MCQ").unwrap_err(),
            QuestionError::EmptyCategory
        );
        assert_eq!(
            Question::new(id, "q", "Math", Difficulty::Easy, "\t").unwrap_err(),
            QuestionError::EmptyType
        );
    }

    #[test]
    fn from_raw_rejects_unknown_difficulty() {
        let err = Question::from_raw(QuestionId::new(1), "q", "Math", "Extreme", "MCQ").unwrap_err();
        assert!(matches!(err, QuestionError::UnknownDifficulty(_)));
    }
}
