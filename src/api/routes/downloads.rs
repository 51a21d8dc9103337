//! Download handlers: submission, status polling and file retrieval.

use super::{SubmitDownloadRequest, SubmitDownloadResponse};
use crate::api::AppState;
use crate::error::{Error, JobError};
use crate::resolver::DEFAULT_FILENAME;
use crate::types::{JobId, JobSnapshot};
use axum::{
    Json,
    body::Body,
    extract::{Path, State, rejection::JsonRejection},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use tokio_util::io::ReaderStream;

/// Content type of every served artifact
const MEDIA_CONTENT_TYPE: &str = "video/mp4";

/// POST /download - Submit a source URL
#[utoipa::path(
    post,
    path = "/download",
    tag = "downloads",
    request_body = SubmitDownloadRequest,
    responses(
        (status = 202, description = "Download accepted", body = SubmitDownloadResponse),
        (status = 400, description = "Missing or invalid URL", body = crate::error::ApiError),
        (status = 503, description = "Shutting down", body = crate::error::ApiError),
        (status = 500, description = "Internal server error", body = crate::error::ApiError)
    )
)]
pub async fn submit_download(
    State(state): State<AppState>,
    payload: Result<Json<SubmitDownloadRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            return Error::Validation(rejection.body_text()).into_response();
        }
    };

    let url = request.url.unwrap_or_default();
    match state.downloader.submit(&url).await {
        Ok(id) => (
            StatusCode::ACCEPTED,
            Json(SubmitDownloadResponse {
                download_id: id,
                message: "Download started".to_string(),
            }),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

/// GET /download/:id/status - Poll a job
#[utoipa::path(
    get,
    path = "/download/{id}/status",
    tag = "downloads",
    params(
        ("id" = String, Path, description = "Download ID")
    ),
    responses(
        (status = 200, description = "Current job snapshot", body = JobSnapshot),
        (status = 404, description = "Download not found", body = crate::error::ApiError)
    )
)]
pub async fn get_download_status(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(e) => return e.into_response(),
    };

    match state.downloader.status(id).await {
        Ok(snapshot) => (StatusCode::OK, Json(snapshot)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// GET /download/:id/file - Stream the finished artifact
#[utoipa::path(
    get,
    path = "/download/{id}/file",
    tag = "downloads",
    params(
        ("id" = String, Path, description = "Download ID")
    ),
    responses(
        (status = 200, description = "Artifact bytes", content_type = "video/mp4"),
        (status = 400, description = "Download not ready", body = crate::error::ApiError),
        (status = 404, description = "Download or file not found", body = crate::error::ApiError)
    )
)]
pub async fn get_download_file(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(e) => return e.into_response(),
    };

    let ready = match state.downloader.ready_file(id).await {
        Ok(ready) => ready,
        Err(e) => return e.into_response(),
    };

    let file = match tokio::fs::File::open(&ready.path).await {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!(job_id = %id, "File vanished before it could be served");
            return Error::Job(JobError::FileMissing {
                id,
                path: ready.path,
            })
            .into_response();
        }
        Err(e) => return Error::Io(e).into_response(),
    };

    tracing::info!(job_id = %id, filename = %ready.filename, size = ready.size, "Serving file");

    let disposition = format!(
        "attachment; filename=\"{}\"",
        sanitize_filename(&ready.filename)
    );
    let disposition = HeaderValue::from_str(&disposition).unwrap_or_else(|_| {
        HeaderValue::from_static("attachment; filename=\"download.mp4\"")
    });

    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(MEDIA_CONTENT_TYPE)),
            (header::CONTENT_LENGTH, HeaderValue::from(ready.size)),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        Body::from_stream(ReaderStream::new(file)),
    )
        .into_response()
}

/// Parse a path segment into a job ID; anything unparseable is an unknown download
fn parse_id(raw: &str) -> Result<JobId, Error> {
    raw.parse()
        .map_err(|_| Error::NotFound(format!("download {}", raw)))
}

/// Make a filename safe for a quoted `Content-Disposition` parameter
///
/// Quotes, backslashes, control and non-ASCII characters become `_`.
pub(crate) fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii_graphic() || c == ' ' => c,
            _ => '_',
        })
        .collect();

    if cleaned.trim().is_empty() {
        DEFAULT_FILENAME.to_string()
    } else {
        cleaned
    }
}
