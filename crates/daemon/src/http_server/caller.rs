use std::convert::Infallible;

use axum::async_trait;
use axum::extract::{FromRef, FromRequestParts};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum_extra::extract::cookie::{Key, SignedCookieJar};

use common::auth::{Authorized, Capability, Credential, SHARE_CODE_QUERY_PARAM};

use super::error::ApiError;
use super::session::Session;
use crate::ServiceState;

/// The credential a request presented, picked from the authorization
///  header, the `sc` query parameter and the session cookie.
#[derive(Debug, Clone, Default)]
pub struct Caller {
    pub credential: Credential,
}

impl Caller {
    pub async fn capability(&self, state: &ServiceState) -> Option<Capability> {
        state.gate().capability(&self.credential).await
    }

    pub async fn authorize(
        &self,
        state: &ServiceState,
        volume: &str,
        path: &str,
        full: bool,
    ) -> Result<Authorized, ApiError> {
        Ok(state
            .gate()
            .authorize(&self.credential, volume, path, full)
            .await?)
    }
}

pub(crate) fn query_param(query: Option<&str>, name: &str) -> Option<String> {
    url::form_urlencoded::parse(query?.as_bytes())
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
}

#[async_trait]
impl FromRequestParts<ServiceState> for Caller {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &ServiceState,
    ) -> Result<Self, Self::Rejection> {
        let authorization = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok());
        let share_code = query_param(parts.uri.query(), SHARE_CODE_QUERY_PARAM);
        let jar = SignedCookieJar::from_headers(&parts.headers, Key::from_ref(state));
        let session = Session::from_jar(&jar);

        Ok(Caller {
            credential: Credential::from_parts(
                authorization,
                share_code.as_deref(),
                session.user_id.as_deref(),
            ),
        })
    }
}
