#![forbid(unsafe_code)]

pub mod compose;
pub mod error;
pub mod generator;
pub mod pool;
pub mod selection;
pub mod usage;

pub use quizgen_core::Clock;

pub use compose::{ComposeContext, GeneratedTest, TestItem, compose, note_unknown_forced};
pub use error::{GenerateError, PoolLoadError};
pub use generator::{GenerateRequest, TestGenerator};
pub use pool::PoolHandle;
pub use selection::{
    AttributeCounts, Pick, SelectionEngine, SelectionPass, SelectionResult, SubstitutionLog,
};
