//! Result download handler.

use axum::extract::{Path, State};
use axum::Json;

use scribe_jobs::JobOutput;

use crate::error::ApiError;
use crate::state::AppState;

/// Fetch the transcript of a completed job.
///
/// The locator comes from the `download_locator` field of a completed job's
/// progress. Anything else, including a job that is still running, is 404.
#[utoipa::path(get, path = "/api/v1/results/{locator}", tag = "Results",
    params(("locator" = String, Path, description = "Result locator")),
    responses(
        (status = 200, description = "Result content", body = JobOutput),
        (status = 404, description = "No completed result under this locator")
    ))]
pub async fn get_result(
    State(state): State<AppState>,
    Path(locator): Path<String>,
) -> Result<Json<JobOutput>, ApiError> {
    Ok(Json(state.results.fetch(&locator).await?))
}
