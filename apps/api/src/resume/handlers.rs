//! Axum route handlers for the Resume API.

use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{ApiJson, AppError};
use crate::intake::extract_text;
use crate::models::request::{null_as_empty, CallerOverrides, TailorRequest};
use crate::models::resume::{AlignmentSources, CanonicalResume};
use crate::parsing::ParsedSections;
use crate::resume::pipeline::TailoredResume;
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseRequest {
    #[serde(default, alias = "cv_text", deserialize_with = "null_as_empty")]
    pub cv_text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TailorResponse {
    pub request_id: Uuid,
    pub resume: CanonicalResume,
    pub alignment: AlignmentSources,
    pub generated_at: DateTime<Utc>,
}

impl From<TailoredResume> for TailorResponse {
    fn from(tailored: TailoredResume) -> Self {
        Self {
            request_id: tailored.request_id,
            resume: tailored.resume,
            alignment: tailored.sources,
            generated_at: tailored.generated_at,
        }
    }
}

/// Output selected by the multipart `format` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum OutputFormat {
    #[default]
    Document,
    Json,
}

impl OutputFormat {
    fn parse(raw: &str) -> Result<Self, AppError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "" | "doc" | "docx" | "document" | "word" => Ok(OutputFormat::Document),
            "json" => Ok(OutputFormat::Json),
            other => Err(AppError::Validation(format!(
                "format must be 'doc' or 'json', got '{other}'"
            ))),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/resumes/parse
///
/// Heuristic parse only, no completion calls. Useful for previewing what
/// the pipeline will recover before tailoring.
pub async fn handle_parse(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<ParseRequest>,
) -> Result<Json<ParsedSections>, AppError> {
    if request.cv_text.trim().is_empty() {
        return Err(AppError::Validation("cvText cannot be empty".to_string()));
    }

    Ok(Json(state.pipeline.parse(&request.cv_text)))
}

/// POST /api/v1/resumes/tailor
///
/// Full pipeline; responds with the rendered document as an attachment.
pub async fn handle_tailor_document(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<TailorRequest>,
) -> Result<Response, AppError> {
    let tailored = state.pipeline.tailor(request).await?;
    document_response(&state, &tailored)
}

/// POST /api/v1/resumes/tailor/json
///
/// Full pipeline; responds with the canonical model and alignment sources.
pub async fn handle_tailor_json(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<TailorRequest>,
) -> Result<Json<TailorResponse>, AppError> {
    let tailored = state.pipeline.tailor(request).await?;
    Ok(Json(tailored.into()))
}

/// POST /api/v1/resumes/upload
///
/// Multipart: `file` (PDF or text), `jobDescription`, optional `format`
/// (`doc` | `json`), optional JSON-encoded `profile`, `experience`, `education`.
pub async fn handle_upload(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, AppError> {
    let mut multipart = multipart?;
    let mut file: Option<(Option<String>, Option<String>, Bytes)> = None;
    let mut job_description = String::new();
    let mut format = OutputFormat::default();
    let mut overrides = CallerOverrides::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart body: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let filename = field.file_name().map(String::from);
                let content_type = field.content_type().map(String::from);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("Could not read uploaded file: {e}")))?;
                file = Some((filename, content_type, bytes));
            }
            "jobDescription" | "job_description" => {
                job_description = read_text_field(field).await?;
            }
            "format" => format = OutputFormat::parse(&read_text_field(field).await?)?,
            "profile" => overrides.profile = parse_json_field("profile", field).await?,
            "experience" => overrides.experience = parse_json_field("experience", field).await?,
            "education" => overrides.education = parse_json_field("education", field).await?,
            _ => {}
        }
    }

    let (filename, content_type, bytes) =
        file.ok_or_else(|| AppError::Validation("Missing 'file' field".to_string()))?;
    let cv_text = extract_text(filename.as_deref(), content_type.as_deref(), bytes).await?;

    let tailored = state
        .pipeline
        .tailor(TailorRequest {
            cv_text,
            job_description,
            overrides,
        })
        .await?;

    match format {
        OutputFormat::Document => document_response(&state, &tailored),
        OutputFormat::Json => Ok(Json(TailorResponse::from(tailored)).into_response()),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Helpers
// ────────────────────────────────────────────────────────────────────────────

fn document_response(state: &AppState, tailored: &TailoredResume) -> Result<Response, AppError> {
    let document = state.pipeline.render(tailored)?;
    let headers = [
        (header::CONTENT_TYPE, document.content_type.to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", document.filename),
        ),
        (
            header::HeaderName::from_static("x-request-id"),
            tailored.request_id.to_string(),
        ),
    ];
    Ok((headers, document.bytes).into_response())
}

async fn read_text_field(field: axum::extract::multipart::Field<'_>) -> Result<String, AppError> {
    field
        .text()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart field: {e}")))
}

/// Blank fields are treated as absent.
async fn parse_json_field<T>(
    name: &str,
    field: axum::extract::multipart::Field<'_>,
) -> Result<Option<T>, AppError>
where
    T: serde::de::DeserializeOwned,
{
    let raw = read_text_field(field).await?;
    if raw.trim().is_empty() {
        return Ok(None);
    }
    serde_json::from_str(&raw)
        .map(Some)
        .map_err(|e| AppError::Validation(format!("'{name}' must be valid JSON: {e}")))
}
