use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Deserialize;
use std::io::Write;
use std::sync::Arc;

use crate::db;
use crate::error::WorkflowError;
use crate::state::AppState;
use crate::storage::BlobStore;

#[derive(Deserialize)]
pub struct SignedQuery {
    pub expires: i64,
    pub sig: String,
}

/// Resolves a signed blob URL. Signature and expiry are checked against the
/// exact blob path; anything off returns 403 without touching the store.
pub async fn fetch_blob(
    State(state): State<Arc<AppState>>,
    Path(blob_ref): Path<String>,
    Query(query): Query<SignedQuery>,
) -> impl IntoResponse {
    if !state
        .blobs
        .verify_signature(&blob_ref, query.expires, &query.sig)
    {
        return (
            StatusCode::FORBIDDEN,
            axum::Json(serde_json::json!({
                "error": "link is invalid or has expired",
                "kind": "forbidden",
            })),
        )
            .into_response();
    }

    let content = match state.blobs.get(&blob_ref) {
        Ok(content) => content,
        Err(_) => {
            return (
                StatusCode::NOT_FOUND,
                axum::Json(serde_json::json!({
                    "error": "blob not found",
                    "kind": "not_found",
                })),
            )
                .into_response()
        }
    };

    let mime = mime_guess::from_path(&blob_ref)
        .first_raw()
        .unwrap_or("application/octet-stream");
    let filename = blob_ref.rsplit('/').next().unwrap_or("document.pdf");

    axum::response::Response::builder()
        .header("Content-Type", mime)
        .header(
            "Content-Disposition",
            format!("inline; filename=\"{}\"", filename),
        )
        .body(axum::body::Body::from(content))
        .unwrap()
        .into_response()
}

/// Zip bundle of the submission's current documents.
pub async fn download_all(
    State(state): State<Arc<AppState>>,
    Path(submission_id): Path<String>,
) -> Result<impl IntoResponse, WorkflowError> {
    let submission = db::get_submission(state.pool.as_ref(), &submission_id)
        .await?
        .ok_or_else(|| WorkflowError::NotFound("submission", submission_id.clone()))?;
    let documents = db::current_documents(state.pool.as_ref(), &submission_id).await?;

    let mut zip_data = Vec::new();
    {
        let mut zip = zip::ZipWriter::new(std::io::Cursor::new(&mut zip_data));
        let options = zip::write::SimpleFileOptions::default().unix_permissions(0o644);

        for document in &documents {
            let content = match state.blobs.get(&document.blob_ref) {
                Ok(content) => content,
                Err(e) => {
                    tracing::warn!("bundle: skipping {}: {}", document.blob_ref, e);
                    continue;
                }
            };
            let entry_name = format!("{}_v{}.pdf", document.kind, document.version);
            let _ = zip.start_file(entry_name, options);
            let _ = zip.write_all(&content);
        }

        let _ = zip.finish();
    }

    let download_name = format!("{}_documents.zip", submission.tracking_code);

    Ok(axum::response::Response::builder()
        .header("Content-Type", "application/zip")
        .header(
            "Content-Disposition",
            format!("attachment; filename=\"{}\"", download_name),
        )
        .body(axum::body::Body::from(zip_data))
        .unwrap())
}
