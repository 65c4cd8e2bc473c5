use axum::extract::{Multipart, Path, State};
use axum::response::IntoResponse;
use axum::Json;
use bytes::Bytes;
use serde::Serialize;

use common::auth::Authorized;
use common::volume::features;

use super::{bad_multipart, final_component, join_relative, store};
use crate::http_server::caller::Caller;
use crate::http_server::error::ApiError;
use crate::ServiceState;

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub url: String,
}

/// Multipart upload: `path` is the target directory, `file` the content.
///  Only the final component of the client's file name is kept.
pub async fn handler(
    State(state): State<ServiceState>,
    caller: Caller,
    Path(volume_name): Path<String>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let Authorized { volume, .. } = caller.authorize(&state, &volume_name, "", true).await?;
    volume.require_feature(features::UPLOAD)?;

    let mut dir = String::new();
    let mut upload: Option<(String, Bytes)> = None;
    while let Some(field) = multipart.next_field().await.map_err(bad_multipart)? {
        let field_name = field.name().map(str::to_string);
        match field_name.as_deref() {
            Some("path") => dir = field.text().await.map_err(bad_multipart)?,
            Some("file") => {
                let file_name = field
                    .file_name()
                    .and_then(final_component)
                    .ok_or_else(|| ApiError::bad_request("missing file name"))?;
                let data = field.bytes().await.map_err(bad_multipart)?;
                upload = Some((file_name, data));
            }
            _ => {}
        }
    }
    let (file_name, data) = upload.ok_or_else(|| ApiError::bad_request("missing file"))?;

    let destination = join_relative(&dir, &file_name);
    store(volume.clone(), destination.clone(), data).await?;

    Ok(Json(UploadResponse {
        url: format!(
            "{}/volume/{}/browse/{}",
            state.http().base_url(),
            volume.name(),
            destination
        ),
    }))
}
