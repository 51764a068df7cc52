#![forbid(unsafe_code)]

pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use services::{PoolHandle, TestGenerator};
use storage::repository::QuestionSource;

pub use error::ApiError;

/// Header carrying the client's session id.
pub const SESSION_HEADER: &str = "x-session-id";

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub generator: Arc<TestGenerator>,
    pub pool: Arc<PoolHandle>,
    /// Where `POST /api/admin/reload` reads the bank from.
    pub source: Arc<dyn QuestionSource>,
}

impl AppState {
    #[must_use]
    pub fn new(
        generator: Arc<TestGenerator>,
        pool: Arc<PoolHandle>,
        source: Arc<dyn QuestionSource>,
    ) -> Self {
        Self {
            generator,
            pool,
            source,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/generate-test", post(routes::generate_test))
        .route("/api/questions", get(routes::list_questions))
        .route("/api/question-metadata", get(routes::question_metadata))
        .route("/api/admin/reload", post(routes::reload_pool))
        .with_state(state)
}
