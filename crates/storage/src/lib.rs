#![forbid(unsafe_code)]

pub mod csv_source;
pub mod repository;
pub mod sqlite;

pub use csv_source::{CsvLoad, CsvQuestionSource, parse_questions};
pub use repository::{InMemoryRepository, QuestionRecord, QuestionSource, Storage, StorageError, UsageStore};
pub use sqlite::{SqliteInitError, SqliteRepository};
