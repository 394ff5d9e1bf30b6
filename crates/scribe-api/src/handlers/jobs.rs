//! Job submission, polling, and cancellation handlers.

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;

use scribe_jobs::JobProgress;

use crate::error::ApiError;
use crate::state::AppState;

/// Response from job submission.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SubmitJobResponse {
    pub job_id: Uuid,
}

/// Submit a file for background transcription.
///
/// # Multipart Fields
/// - `file`: the artifact to process (required)
/// - `filename`: overrides the part's own filename (optional)
///
/// Returns immediately with the new job's id; poll `GET /api/v1/jobs/{id}`
/// for progress.
#[utoipa::path(post, path = "/api/v1/jobs", tag = "Jobs",
    responses(
        (status = 200, description = "Job accepted", body = SubmitJobResponse),
        (status = 400, description = "Missing, empty, or rejected file"),
        (status = 413, description = "File too large")
    ))]
pub async fn submit_job(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<SubmitJobResponse>, ApiError> {
    let mut file_data: Option<Vec<u8>> = None;
    let mut part_filename: Option<String> = None;
    let mut filename_override: Option<String> = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let field_name = field.name().map(|n| n.to_string());
        match field_name.as_deref() {
            Some("file") => {
                part_filename = field.file_name().map(|f| f.to_string());
                file_data = Some(field.bytes().await.map_err(multipart_error)?.to_vec());
            }
            Some("filename") => {
                let text = field.text().await.map_err(multipart_error)?;
                if !text.trim().is_empty() {
                    filename_override = Some(text.trim().to_string());
                }
            }
            _ => {}
        }
    }

    let data = file_data.ok_or_else(|| ApiError::BadRequest("Missing 'file' field".into()))?;
    if data.is_empty() {
        return Err(ApiError::BadRequest("Uploaded file is empty".into()));
    }

    let max = state.coordinator.max_upload_bytes();
    if data.len() > max {
        return Err(ApiError::PayloadTooLarge(format!(
            "File exceeds maximum size of {} bytes",
            max
        )));
    }

    let filename = filename_override.or(part_filename);
    let job_id = state.coordinator.submit(filename.as_deref(), &data).await?;

    info!(%job_id, filename = filename.as_deref().unwrap_or("(unnamed)"), "Accepted upload");
    Ok(Json(SubmitJobResponse { job_id }))
}

/// Get the progress of a job.
#[utoipa::path(get, path = "/api/v1/jobs/{id}", tag = "Jobs",
    params(("id" = String, Path, description = "Job id")),
    responses(
        (status = 200, description = "Job progress", body = JobProgress),
        (status = 404, description = "Unknown job")
    ))]
pub async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<JobProgress>, ApiError> {
    let job_id = parse_job_id(&id)?;
    Ok(Json(state.coordinator.progress_of(job_id)?))
}

/// Request cancellation of a pending or running job.
///
/// The job becomes `failed` with `Job cancelled` once its worker observes
/// the request; the returned snapshot may still show the previous status.
#[utoipa::path(post, path = "/api/v1/jobs/{id}/cancel", tag = "Jobs",
    params(("id" = String, Path, description = "Job id")),
    responses(
        (status = 202, description = "Cancellation requested", body = JobProgress),
        (status = 404, description = "Unknown job"),
        (status = 409, description = "Job already finished")
    ))]
pub async fn cancel_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<JobProgress>), ApiError> {
    let job_id = parse_job_id(&id)?;
    if !state.coordinator.cancel(job_id)? {
        return Err(ApiError::Conflict(format!("Job {} already finished", job_id)));
    }
    info!(%job_id, "Job cancellation requested");
    Ok((
        StatusCode::ACCEPTED,
        Json(state.coordinator.progress_of(job_id)?),
    ))
}

/// Malformed ids cannot name a job, so they are reported as not found.
fn parse_job_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::NotFound(format!("Job {} not found", raw)))
}

fn multipart_error(e: axum::extract::multipart::MultipartError) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(format!("Upload too large: {}", e.body_text()))
    } else {
        ApiError::BadRequest(format!("Multipart error: {}", e.body_text()))
    }
}
