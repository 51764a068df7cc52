//! CSV-backed question bank.
//!
//! Expected header: `id,question,category,difficulty,type`. Rows that fail
//! domain validation are skipped and logged; malformed CSV fails the load.

use std::io::Read;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use quizgen_core::model::Question;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::repository::{QuestionRecord, QuestionSource, StorageError};

#[derive(Debug, Deserialize)]
struct RawRow {
    id: String,
    #[serde(alias = "text")]
    question: String,
    category: String,
    difficulty: String,
    #[serde(rename = "type", alias = "question_type")]
    kind: String,
}

/// Outcome of parsing a CSV document.
#[derive(Debug, Default)]
pub struct CsvLoad {
    pub questions: Vec<Question>,
    /// 1-based data row numbers that were dropped.
    pub skipped_rows: Vec<usize>,
}

/// Parse questions from any CSV reader.
///
/// # Errors
///
/// Returns `StorageError::Serialization` if the document is not valid CSV or
/// lacks a required column.
pub fn parse_questions<R: Read>(reader: R) -> Result<CsvLoad, StorageError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut load = CsvLoad::default();
    for (idx, row) in csv_reader.deserialize::<RawRow>().enumerate() {
        let row_no = idx + 1;
        let raw = row.map_err(|e| StorageError::Serialization(format!("row {row_no}: {e}")))?;

        let Ok(id) = raw.id.parse::<u64>() else {
            warn!(row = row_no, id = %raw.id, "skipping question with non-numeric id");
            load.skipped_rows.push(row_no);
            continue;
        };
        let record = QuestionRecord {
            id,
            question: raw.question,
            category: raw.category,
            difficulty: raw.difficulty,
            kind: raw.kind,
        };
        match record.into_question() {
            Ok(q) => load.questions.push(q),
            Err(e) => {
                warn!(row = row_no, error = %e, "skipping invalid question");
                load.skipped_rows.push(row_no);
            }
        }
    }
    Ok(load)
}

/// Read-only question source over a CSV file on disk.
#[derive(Debug, Clone)]
pub struct CsvQuestionSource {
    path: PathBuf,
}

impl CsvQuestionSource {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl QuestionSource for CsvQuestionSource {
    async fn load_questions(&self) -> Result<Vec<Question>, StorageError> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|e| StorageError::Io(format!("{}: {e}", self.path.display())))?;
        let load = parse_questions(bytes.as_slice())?;
        debug!(
            path = %self.path.display(),
            loaded = load.questions.len(),
            skipped = load.skipped_rows.len(),
            "loaded question bank from csv"
        );
        Ok(load.questions)
    }

    async fn upsert_question(&self, _question: &Question) -> Result<(), StorageError> {
        Err(StorageError::ReadOnly)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quizgen_core::model::Difficulty;

    const SAMPLE: &str = "\
id,question,category,difficulty,type
1,What is 2+2?,Math,Easy,MCQ
2, Define inertia ,Physics, medium ,Short
3,Broken difficulty,Math,Impossible,MCQ
x,Bad id,Math,Easy,MCQ
5,,Math,Easy,MCQ
";

    #[test]
    fn parses_valid_rows_and_skips_invalid_ones() {
        let load = parse_questions(SAMPLE.as_bytes()).unwrap();
        assert_eq!(load.questions.len(), 2);
        assert_eq!(load.skipped_rows, vec![3, 4, 5]);

        let physics = &load.questions[1];
        assert_eq!(physics.category(), "Physics");
        assert_eq!(physics.difficulty(), Difficulty::Medium);
        assert_eq!(physics.kind(), "Short");
    }

    #[test]
    fn missing_column_fails_the_load() {
        let err = parse_questions("id,question,category\n1,q,Math\n".as_bytes()).unwrap_err();
        assert!(matches!(err, StorageError::Serialization(_)));
    }

    #[tokio::test]
    async fn csv_source_is_read_only() {
        let source = CsvQuestionSource::new("does-not-matter.csv");
        let q = Question::new(
            quizgen_core::model::QuestionId::new(1),
            "q",
            "Math",
            Difficulty::Easy,
            "MCQ",
        )
        .unwrap();
        assert!(matches!(
            source.upsert_question(&q).await,
            Err(StorageError::ReadOnly)
        ));
    }

    #[tokio::test]
    async fn missing_file_is_an_io_error() {
        let source = CsvQuestionSource::new("/definitely/not/here.csv");
        assert!(matches!(
            source.load_questions().await,
            Err(StorageError::Io(_))
        ));
    }
}
