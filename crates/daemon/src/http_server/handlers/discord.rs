//! Discord login. Mounted only when a `[discord]` section is configured.

use axum::extract::{Query, State};
use axum::response::{IntoResponse, Redirect};
use axum_extra::extract::cookie::SignedCookieJar;
use serde::Deserialize;
use uuid::Uuid;

use crate::http_server::error::ApiError;
use crate::http_server::session::Session;
use crate::ServiceState;

#[derive(Debug, Default, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

pub async fn login_handler(
    State(state): State<ServiceState>,
    jar: SignedCookieJar,
) -> Result<impl IntoResponse, ApiError> {
    let identity = state.identity().ok_or(ApiError::NotFound)?;

    let login_state = Uuid::new_v4().simple().to_string();
    let url = identity
        .authorize_url(&login_state)
        .map_err(ApiError::internal)?;

    let mut session = Session::from_jar(&jar);
    session.state = Some(login_state);
    Ok((session.save(jar), Redirect::temporary(url.as_str())))
}

pub async fn callback_handler(
    State(state): State<ServiceState>,
    jar: SignedCookieJar,
    Query(query): Query<CallbackQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let identity = state.identity().ok_or(ApiError::NotFound)?;
    let mut session = Session::from_jar(&jar);

    if session.state.is_none() || query.state != session.state {
        tracing::info!("login callback with mismatched state");
        return Ok((jar, Redirect::to("/")));
    }
    if let Some(error) = query.error {
        tracing::info!(error, "login refused by provider");
        return Err(ApiError::bad_request("login was not completed"));
    }
    let code = query
        .code
        .filter(|c| !c.is_empty())
        .ok_or_else(|| ApiError::bad_request("missing authorization code"))?;

    let user_id = identity.exchange(&code).await.map_err(ApiError::internal)?;
    tracing::info!(user_id, "user logged in");

    session.user_id = Some(user_id);
    session.state = None;
    Ok((session.save(jar), Redirect::to("/")))
}

pub async fn logout_handler(jar: SignedCookieJar) -> impl IntoResponse {
    (Session::clear(jar), Redirect::to("/"))
}
