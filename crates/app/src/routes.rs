//! HTTP handlers.

use std::collections::{BTreeMap, HashSet};

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use quizgen_core::model::{AttributeDomains, Question, QuestionId, QuotaPlan, SessionId};
use serde::{Deserialize, Serialize};
use serde_json::json;
use services::GenerateRequest;
use tracing::info;

use crate::{ApiError, AppState, SESSION_HEADER};

/// A question id as sent by clients: a JSON number or a numeric string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum WireId {
    Number(u64),
    Text(String),
}

fn id_set(
    field: &'static str,
    ids: Option<Vec<WireId>>,
) -> Result<HashSet<QuestionId>, ApiError> {
    ids.unwrap_or_default()
        .into_iter()
        .map(|id| match id {
            WireId::Number(id) => Ok(QuestionId::new(id)),
            WireId::Text(raw) => raw
                .parse()
                .map_err(|_| ApiError::BadRequest(format!("invalid id in {field}: {raw:?}"))),
        })
        .collect()
}

/// Body of `POST /api/generate-test`.
///
/// Every field is optional at the serde level so a missing one is reported by
/// name instead of as a generic parse failure.
#[derive(Debug, Default, Deserialize)]
pub struct GenerateTestBody {
    pub total_questions: Option<u32>,
    pub category_counts: Option<BTreeMap<String, u32>>,
    pub difficulty_counts: Option<BTreeMap<String, u32>>,
    pub type_counts: Option<BTreeMap<String, u32>>,
    pub used_question_ids: Option<Vec<WireId>>,
    pub force_include_ids: Option<Vec<WireId>>,
}

impl GenerateTestBody {
    /// Check required fields and build the service request.
    ///
    /// # Errors
    ///
    /// - `ApiError::MissingField` naming the first absent field.
    /// - `ApiError::BadRequest` if an id list holds a non-numeric entry.
    pub fn into_request(self) -> Result<GenerateRequest, ApiError> {
        let total_questions = self
            .total_questions
            .ok_or(ApiError::MissingField("total_questions"))?;
        let category = self
            .category_counts
            .ok_or(ApiError::MissingField("category_counts"))?;
        let difficulty = self
            .difficulty_counts
            .ok_or(ApiError::MissingField("difficulty_counts"))?;
        let kind = self
            .type_counts
            .ok_or(ApiError::MissingField("type_counts"))?;

        Ok(GenerateRequest {
            total_questions,
            plan: QuotaPlan::new(category, difficulty, kind),
            used_question_ids: id_set("used_question_ids", self.used_question_ids)?,
            force_include_ids: id_set("force_include_ids", self.force_include_ids)?,
        })
    }
}

/// A bank entry as listed by `GET /api/questions`.
#[derive(Debug, Serialize)]
pub struct QuestionView {
    pub id: QuestionId,
    pub question: String,
    pub category: String,
    pub difficulty: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl From<&Question> for QuestionView {
    fn from(q: &Question) -> Self {
        Self {
            id: q.id(),
            question: q.text().to_owned(),
            category: q.category().to_owned(),
            difficulty: q.difficulty().as_str().to_owned(),
            kind: q.kind().to_owned(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct QuestionMetadata {
    #[serde(flatten)]
    pub domains: AttributeDomains,
    pub total_questions: usize,
}

fn session_from(headers: &HeaderMap) -> Result<SessionId, ApiError> {
    let Some(raw) = headers.get(SESSION_HEADER) else {
        return Ok(SessionId::generate());
    };
    raw.to_str()
        .ok()
        .and_then(|value| value.parse().ok())
        .ok_or_else(|| ApiError::BadRequest(format!("invalid {SESSION_HEADER} header")))
}

pub async fn generate_test(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<GenerateTestBody>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(body) = body.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    let request = body.into_request()?;
    let session = session_from(&headers)?;

    let pool = state.pool.snapshot();
    let test = state.generator.generate(&session, &pool, &request).await?;

    Ok(([(SESSION_HEADER, session.to_string())], Json(test)))
}

pub async fn list_questions(State(state): State<AppState>) -> Json<Vec<QuestionView>> {
    let pool = state.pool.snapshot();
    Json(pool.questions().iter().map(QuestionView::from).collect())
}

pub async fn question_metadata(State(state): State<AppState>) -> Json<QuestionMetadata> {
    let pool = state.pool.snapshot();
    Json(QuestionMetadata {
        domains: pool.domains(),
        total_questions: pool.len(),
    })
}

pub async fn reload_pool(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let total = state.pool.reload(state.source.as_ref()).await?;
    info!(total, "question bank reloaded on request");
    Ok(Json(json!({ "total_questions": total })))
}
