use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use time::OffsetDateTime;

use common::auth::Authorized;

use super::blocking;
use crate::http_server::caller::Caller;
use crate::http_server::error::ApiError;
use crate::ServiceState;

#[derive(Debug, Serialize)]
pub struct ShareResponse {
    pub code: String,
    pub url: String,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
}

pub async fn root_handler(
    State(state): State<ServiceState>,
    caller: Caller,
    Path(volume): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    share(state, caller, volume, String::new()).await
}

pub async fn handler(
    State(state): State<ServiceState>,
    caller: Caller,
    Path((volume, path)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    share(state, caller, volume, path).await
}

/// Mint (or return the existing) share code for an existing path. Needs
///  full access, so a share code can never mint another one.
async fn share(
    state: ServiceState,
    caller: Caller,
    volume_name: String,
    path: String,
) -> Result<Json<ShareResponse>, ApiError> {
    let Authorized { volume, .. } = caller.authorize(&state, &volume_name, &path, true).await?;

    {
        let volume = volume.clone();
        let path = path.clone();
        blocking(move || volume.entry(&path)).await?;
    }

    let share = state.shares().get_or_create(volume.name(), &path).await?;
    tracing::info!(volume = volume.name(), path = %share.path, id = share.id, "share code issued");

    Ok(Json(ShareResponse {
        url: state.http().share_link(&share.code),
        code: share.code,
        expires_at: share.expires_at,
    }))
}
