use axum::extract::{Multipart, Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use courier_auth_types::bearer::Identity;

use crate::error::MessagingError;
use crate::response::{Reply, reply};
use crate::state::AppState;

// ── POST /file/upload ────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct UploadedFileResponse {
    /// Temporary-file reference to pass back when attaching the file.
    pub src: String,
    /// The client's original file name.
    pub name: String,
}

/// Accepts one or more parts named `files`; each is validated against the
/// temporary-folder policy and parked there until an entity claims it.
pub async fn upload(
    _identity: Identity,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<Reply<Vec<UploadedFileResponse>>>, MessagingError> {
    let mut data = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| MessagingError::bad_request("Upload file failed"))?
    {
        if field.name() != Some("files") {
            continue;
        }
        let name = field
            .file_name()
            .map(ToOwned::to_owned)
            .ok_or_else(|| MessagingError::bad_request("Upload file failed"))?;
        let bytes = field
            .bytes()
            .await
            .map_err(|_| MessagingError::bad_request("Upload file failed"))?;

        let src = state.files.save_to_temporary(&name, &bytes).await?;
        data.push(UploadedFileResponse { src, name });
    }

    Ok(Json(reply::success("Upload file success", data)))
}

// ── GET /file/client/{folder_name}/{file_name} ───────────────────────────────

/// Serve a stored file. The path is resolved through the store's traversal
/// guard; anything outside the client root is refused.
pub async fn serve_client_file(
    State(state): State<AppState>,
    Path((folder_name, file_name)): Path<(String, String)>,
) -> Result<Response, MessagingError> {
    let path = state.files.client_path(&folder_name, &file_name)?;

    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(MessagingError::not_found("File not found"));
        }
        Err(e) => {
            return Err(MessagingError::Internal(
                anyhow::Error::new(e).context("read stored file"),
            ));
        }
    };

    let mime = mime_guess::from_path(&path).first_or_octet_stream();
    Ok(([(header::CONTENT_TYPE, mime.to_string())], bytes).into_response())
}
