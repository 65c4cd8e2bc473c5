use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;

use common::auth::AccessError;

use crate::http_server::caller::Caller;
use crate::http_server::error::ApiError;
use crate::ServiceState;

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub user_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
}

pub async fn user_handler(State(state): State<ServiceState>, caller: Caller) -> impl IntoResponse {
    let capability = caller.capability(&state).await;
    Json(UserResponse {
        user_id: capability
            .as_ref()
            .and_then(|c| c.user_id())
            .map(str::to_string),
    })
}

/// Mint a fresh token for a caller that already resolves to a user
pub async fn token_handler(
    State(state): State<ServiceState>,
    caller: Caller,
) -> Result<impl IntoResponse, ApiError> {
    let capability = caller.capability(&state).await;
    let Some(user_id) = capability.as_ref().and_then(|c| c.user_id()) else {
        return Err(AccessError::NoCredential.into());
    };

    let token = state.signer().sign(user_id).map_err(ApiError::internal)?;
    tracing::info!(user_id, "issued user token");
    Ok(Json(TokenResponse { token }))
}
