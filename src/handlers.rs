use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use gloss_types::{AnnotateConfig, DictionaryMode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

use crate::annotate::{AnnotatedDocument, Annotator};
use crate::extract::TextExtractor;
use crate::session::{RunError, Session};

pub const MAX_TEXT_BYTES: usize = 2 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub annotator: Arc<Annotator>,
    pub session: Arc<Session>,
    pub extractor: Arc<dyn TextExtractor>,
    pub defaults: AnnotateConfig,
}

#[derive(Deserialize)]
pub struct AnnotateRequest {
    pub text: String,
    pub dictionary_mode: Option<String>,
    pub scientific: Option<bool>,
    pub simple_english: Option<bool>,
}

#[derive(Deserialize)]
pub struct DocumentQuery {
    pub title: Option<String>,
    pub dictionary_mode: Option<String>,
    pub scientific: Option<bool>,
    pub simple_english: Option<bool>,
}

#[derive(Serialize)]
pub struct AnnotateResponse {
    dictionary_mode: &'static str,
    html: String,
    #[serde(flatten)]
    document: AnnotatedDocument,
}

#[derive(Serialize)]
struct DefinitionResponse {
    term: String,
    definition: String,
    source: &'static str,
}

#[derive(Serialize)]
struct DictionarySummary {
    name: &'static str,
    terms: usize,
}

#[derive(Serialize)]
struct StatusResponse {
    #[serde(flatten)]
    status: crate::session::RunStatus,
    text: String,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/v1/annotate", post(annotate))
        .route("/v1/documents", post(submit_document))
        .route("/v1/documents/current", get(current_document))
        .route("/v1/status", get(status))
        .route("/v1/definitions/{word}", get(definition))
        .route("/v1/dictionaries", get(dictionaries))
        .with_state(state)
}

async fn healthz() -> impl IntoResponse {
    "ok"
}

fn resolve_config(
    defaults: AnnotateConfig,
    dictionary_mode: Option<&str>,
    scientific: Option<bool>,
    simple_english: Option<bool>,
) -> Result<AnnotateConfig, ApiError> {
    let dictionary_mode = match dictionary_mode {
        Some(name) => DictionaryMode::from_name(name)
            .ok_or_else(|| ApiError::bad_request(format!("invalid dictionary_mode: {name}")))?,
        None => defaults.dictionary_mode,
    };
    Ok(AnnotateConfig {
        dictionary_mode,
        scientific: scientific.unwrap_or(defaults.scientific),
        simple_english: simple_english.unwrap_or(defaults.simple_english),
    })
}

async fn annotate(
    State(state): State<AppState>,
    Json(request): Json<AnnotateRequest>,
) -> Result<Json<AnnotateResponse>, ApiError> {
    if request.text.len() > MAX_TEXT_BYTES {
        return Err(ApiError::bad_request(format!(
            "text must be at most {MAX_TEXT_BYTES} bytes"
        )));
    }
    let config = resolve_config(
        state.defaults,
        request.dictionary_mode.as_deref(),
        request.scientific,
        request.simple_english,
    )?;

    let document = state.annotator.annotate(&request.text, &config).await;
    Ok(Json(AnnotateResponse {
        dictionary_mode: config.dictionary_mode.as_str(),
        html: document.render_markup(),
        document,
    }))
}

async fn submit_document(
    State(state): State<AppState>,
    Query(params): Query<DocumentQuery>,
    body: Bytes,
) -> Result<Response, ApiError> {
    if body.len() > MAX_TEXT_BYTES {
        return Err(ApiError::bad_request(format!(
            "document must be at most {MAX_TEXT_BYTES} bytes"
        )));
    }
    let config = resolve_config(
        state.defaults,
        params.dictionary_mode.as_deref(),
        params.scientific,
        params.simple_english,
    )?;

    let published = state
        .session
        .process(
            state.extractor.as_ref(),
            &state.annotator,
            &body,
            params.title,
            &config,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(published.as_ref().clone())).into_response())
}

async fn current_document(State(state): State<AppState>) -> Result<Response, ApiError> {
    let Some(document) = state.session.current() else {
        return Err(ApiError::NotFound("no document has been processed".into()));
    };
    Ok(Json(document.as_ref().clone()).into_response())
}

async fn status(State(state): State<AppState>) -> impl IntoResponse {
    let status = state.session.status();
    Json(StatusResponse {
        text: status.message().to_string(),
        status,
    })
}

async fn definition(
    State(state): State<AppState>,
    Path(word): Path<String>,
) -> Result<Json<DefinitionResponse>, ApiError> {
    let term = word.to_lowercase();
    let Some(definition) = state.annotator.cache().definition(&term) else {
        return Err(ApiError::NotFound(format!("no cached definition for {term}")));
    };
    Ok(Json(DefinitionResponse {
        term,
        definition,
        source: crate::overlay::SIMPLE_ENGLISH_LABEL,
    }))
}

async fn dictionaries(State(state): State<AppState>) -> impl IntoResponse {
    let catalog = state.annotator.catalog();
    let summaries: Vec<DictionarySummary> = DictionaryMode::ALL
        .iter()
        .map(|mode| DictionarySummary {
            name: mode.as_str(),
            terms: catalog.term_count(*mode),
        })
        .collect();
    Json(json!({ "dictionaries": summaries }))
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error(transparent)]
    Run(#[from] RunError),
}

impl ApiError {
    fn bad_request<T: Into<String>>(msg: T) -> Self {
        ApiError::BadRequest(msg.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Run(RunError::Extraction(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Run(RunError::Superseded(_)) => StatusCode::CONFLICT,
        };
        let body = Json(ErrorResponse {
            error: self.to_string(),
        });
        (status, body).into_response()
    }
}
