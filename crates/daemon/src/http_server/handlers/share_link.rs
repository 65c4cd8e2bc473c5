use axum::extract::{Path, State};
use axum::http::Uri;
use axum::response::{IntoResponse, Redirect};
use url::{Position, Url};

use common::auth::SHARE_CODE_QUERY_PARAM;

use crate::http_server::error::ApiError;
use crate::ServiceState;

/// Redeem a share code by redirecting to the shared path with the code
///  attached, keeping any other query parameters.
pub async fn handler(
    State(state): State<ServiceState>,
    Path(code): Path<String>,
    uri: Uri,
) -> Result<impl IntoResponse, ApiError> {
    let share = state.shares().resolve(&code).await?;
    let location = browse_location(&share.volume, &share.path, uri.query(), &share.code)?;
    tracing::debug!(volume = %share.volume, path = %share.path, "redeemed share code");
    Ok(Redirect::temporary(&location))
}

/// `/volume/{volume}/browse/{path}?{query}` with `sc` replaced by `code`
pub(crate) fn browse_location(
    volume: &str,
    path: &str,
    query: Option<&str>,
    code: &str,
) -> Result<String, ApiError> {
    let mut url = Url::parse("http://localhost/").map_err(ApiError::internal)?;
    url.path_segments_mut()
        .map_err(|_| ApiError::internal("base url cannot hold a path"))?
        .pop_if_empty()
        .extend(["volume", volume, "browse"])
        .extend(path.split('/').filter(|s| !s.is_empty()));

    {
        let mut pairs = url.query_pairs_mut();
        let kept = url::form_urlencoded::parse(query.unwrap_or_default().as_bytes())
            .filter(|(key, _)| key != SHARE_CODE_QUERY_PARAM);
        for (key, value) in kept {
            pairs.append_pair(&key, &value);
        }
        pairs.append_pair(SHARE_CODE_QUERY_PARAM, code);
    }

    Ok(url[Position::BeforePath..].to_string())
}
