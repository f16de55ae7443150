//! Attachment endpoints.

use super::blocking;
use super::extract::{Json, Path};
use crate::error::{Result, ResultExt};
use crate::model::{Attachment, AttachmentUpload};
use crate::service::Services;
use axum::body::Body;
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use tokio_util::io::ReaderStream;
use tracing::debug;

pub async fn upload(
    State(services): State<Services>,
    Json(upload): Json<AttachmentUpload>,
) -> Result<Json<Attachment>> {
    blocking(move || services.attachments.upload(&upload))
        .await
        .map(Json)
}

pub async fn list(
    State(services): State<Services>,
    Path(issue_id): Path<i64>,
) -> Result<Json<Vec<Attachment>>> {
    blocking(move || services.attachments.list(issue_id))
        .await
        .map(Json)
}

/// Responds 204 on success.
pub async fn delete(State(services): State<Services>, Path(id): Path<i64>) -> Result<StatusCode> {
    blocking(move || services.attachments.delete(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Stream a stored file with a content type guessed from its extension.
pub async fn download(
    State(services): State<Services>,
    Path((issue_id, filename)): Path<(i64, String)>,
) -> Result<Response> {
    let path =
        blocking(move || services.attachments.resolve_download(issue_id, &filename)).await?;
    let file = tokio::fs::File::open(&path)
        .await
        .with_context(|| format!("opening attachment {}", path.display()))?;

    let mime = mime_guess::from_path(&path).first_or_octet_stream();
    debug!(path = %path.display(), %mime, "Streaming attachment");

    let body = Body::from_stream(ReaderStream::new(file));
    Ok(([(header::CONTENT_TYPE, mime.to_string())], body).into_response())
}
