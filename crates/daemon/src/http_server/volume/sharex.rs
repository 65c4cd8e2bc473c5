//! Upload endpoint for screenshot tools such as ShareX.

use axum::extract::{Multipart, Path, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;

use common::auth::{AccessError, Authorized, Capability};
use common::volume::features;

use super::{bad_multipart, final_component, store};
use crate::http_server::caller::Caller;
use crate::http_server::error::ApiError;
use crate::ServiceState;

#[derive(Debug, Serialize)]
pub struct SharexResponse {
    pub link: String,
}

/// Store the `image` field under `{user_id}/{file name}` and answer with a
///  share link for it.
pub async fn handler(
    State(state): State<ServiceState>,
    caller: Caller,
    Path(volume_name): Path<String>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let Authorized { volume, capability } =
        caller.authorize(&state, &volume_name, "", true).await?;

    // The user id becomes a directory name, so it must be one plain segment
    let user_id = capability
        .as_ref()
        .and_then(Capability::user_id)
        .filter(|id| final_component(id).as_deref() == Some(*id))
        .map(str::to_string)
        .ok_or(AccessError::NotPermitted)?;
    volume.require_feature(features::UPLOAD)?;

    let mut image = None;
    while let Some(field) = multipart.next_field().await.map_err(bad_multipart)? {
        if field.name() != Some("image") {
            continue;
        }
        let file_name = field
            .file_name()
            .and_then(final_component)
            .ok_or_else(|| ApiError::bad_request("missing file name"))?;
        image = Some((file_name, field.bytes().await.map_err(bad_multipart)?));
        break;
    }
    let (file_name, data) = image.ok_or_else(|| ApiError::bad_request("missing image"))?;

    let destination = format!("{}/{}", user_id, file_name);
    store(volume.clone(), destination.clone(), data).await?;

    let share = state.shares().get_or_create(volume.name(), &destination).await?;
    Ok(Json(SharexResponse {
        link: state.http().share_link(&share.code),
    }))
}
