//! Route handlers for the annotation UI.
//!
//! # Responsibility
//! - Extract form/query inputs and decode client payloads.
//! - Run core use-cases off the async runtime and map their errors to status
//!   codes.
//!
//! # Invariants
//! - Success bodies are the plain strings the UI expects (`"Success"`, ...).
//! - A rejected BILUO payload answers 500 with `BILUO_REJECTED_MESSAGE`.
//! - Unsupported delete/export types answer 400 and touch nothing.

use crate::state::AppState;
use annotator_core::{
    parse_payload, welcome, AnnotationRecord, DeleteAnnotationRequest, ExportError, ExportKind,
    KindError, NerError, PayloadError, SaveAnnotationRequest, ServiceError,
};
use axum::extract::rejection::FormRejection;
use axum::extract::{Query, State};
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use log::{error, info};
use serde::Deserialize;
use serde_json::Value;
use std::fmt::{Display, Formatter};
use tower_http::cors::{Any, CorsLayer};

pub const BILUO_REJECTED_MESSAGE: &str =
    "Failed to save annotation. Likely the problem lies in BILUO format creation.";

const SUCCESS: &str = "Success";

/// Builds the router with permissive CORS for the browser UI.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    Router::new()
        .route("/", get(get_started))
        .route("/load_db", get(load_db))
        .route("/get_entities", post(get_entities))
        .route("/get_conclusion_list", get(get_conclusion_list))
        .route("/save_annotation", post(save_annotation))
        .route("/delete_annotation", post(delete_annotation))
        .route("/create_training_data", get(create_training_data))
        .layer(cors)
        .with_state(state)
}

/// Handler failure mapped to a status code and plain-text body.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    BiluoRejected,
    Unavailable(&'static str),
    Internal(String),
}

impl Display for ApiError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BadRequest(message) | Self::NotFound(message) | Self::Internal(message) => {
                write!(f, "{message}")
            }
            Self::BiluoRejected => write!(f, "{BILUO_REJECTED_MESSAGE}"),
            Self::Unavailable(message) => write!(f, "{message}"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BiluoRejected | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        };
        if let Self::Internal(message) = &self {
            error!("event=request module=api status=error error={message}");
        }
        (status, self.to_string()).into_response()
    }
}

impl From<ServiceError> for ApiError {
    fn from(value: ServiceError) -> Self {
        match value {
            ServiceError::InvalidBiluo(_) => Self::BiluoRejected,
            ServiceError::RecordNotFound(_) => Self::NotFound(value.to_string()),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<ExportError> for ApiError {
    fn from(value: ExportError) -> Self {
        Self::Internal(value.to_string())
    }
}

impl From<PayloadError> for ApiError {
    fn from(value: PayloadError) -> Self {
        Self::BadRequest(value.to_string())
    }
}

impl From<KindError> for ApiError {
    fn from(value: KindError) -> Self {
        Self::BadRequest(value.to_string())
    }
}

impl From<NerError> for ApiError {
    fn from(value: NerError) -> Self {
        Self::Internal(value.to_string())
    }
}

impl From<FormRejection> for ApiError {
    fn from(value: FormRejection) -> Self {
        Self::BadRequest(value.body_text())
    }
}

#[derive(Debug, Deserialize)]
struct TextForm {
    text: String,
}

#[derive(Debug, Deserialize)]
struct JsonForm {
    json: String,
}

#[derive(Debug, Deserialize)]
struct ExportQuery {
    #[serde(rename = "type")]
    kind: Option<String>,
}

impl ExportQuery {
    /// Absent or non-integer `type` falls back to BILUO.
    fn kind(&self) -> Result<ExportKind, KindError> {
        match self.kind.as_deref().map(str::trim).map(str::parse::<i64>) {
            Some(Ok(value)) => ExportKind::try_from(value),
            _ => Ok(ExportKind::default()),
        }
    }
}

async fn get_started() -> &'static str {
    welcome()
}

async fn load_db(State(state): State<AppState>) -> Result<&'static str, ApiError> {
    let report = run_blocking(move || Ok(state.load_source()?)).await?;
    info!(
        "event=load_db module=api status=ok inserted={}",
        report.inserted
    );
    Ok("Database loaded successfully!")
}

async fn get_entities(
    State(state): State<AppState>,
    form: Result<Form<TextForm>, FormRejection>,
) -> Result<Json<Value>, ApiError> {
    let Form(form) = form?;
    let recognizer = state
        .recognizer()
        .cloned()
        .ok_or(ApiError::Unavailable("entity recognizer is not configured"))?;
    let entities = run_blocking(move || Ok(recognizer.recognize(&form.text)?)).await?;
    Ok(Json(entities))
}

async fn get_conclusion_list(
    State(state): State<AppState>,
) -> Result<Json<Vec<AnnotationRecord>>, ApiError> {
    let records =
        run_blocking(move || Ok(state.with_annotations(|service| service.list_records())?))
            .await?;
    Ok(Json(records))
}

async fn save_annotation(
    State(state): State<AppState>,
    form: Result<Form<JsonForm>, FormRejection>,
) -> Result<&'static str, ApiError> {
    let Form(form) = form?;
    let request: SaveAnnotationRequest = parse_payload(&form.json)?;
    run_blocking(move || {
        Ok(state.with_annotations(|service| {
            service.save_annotation(&request.unique_id, &request.biluo, &request.non_biluo)
        })?)
    })
    .await?;
    Ok(SUCCESS)
}

async fn delete_annotation(
    State(state): State<AppState>,
    form: Result<Form<JsonForm>, FormRejection>,
) -> Result<&'static str, ApiError> {
    let Form(form) = form?;
    let request: DeleteAnnotationRequest = parse_payload(&form.json)?;
    let kind = request.kind()?;
    run_blocking(move || {
        Ok(state.with_annotations(|service| {
            service.delete_annotation(&request.unique_id, kind)
        })?)
    })
    .await?;
    Ok(SUCCESS)
}

async fn create_training_data(
    State(state): State<AppState>,
    Query(query): Query<ExportQuery>,
) -> Result<&'static str, ApiError> {
    let kind = query.kind()?;
    let now = chrono::Local::now().naive_local();
    let report =
        run_blocking(move || Ok(state.with_exports(|service| service.export_dataset(kind, now))?))
            .await?;
    info!(
        "event=create_training_data module=api status=ok records={} path={}",
        report.records,
        report.dataset_path.display()
    );
    Ok(SUCCESS)
}

/// Runs blocking work (SQLite, child processes) on the blocking pool.
async fn run_blocking<T: Send + 'static>(
    work: impl FnOnce() -> Result<T, ApiError> + Send + 'static,
) -> Result<T, ApiError> {
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|err| ApiError::Internal(format!("blocking task failed: {err}")))?
}
