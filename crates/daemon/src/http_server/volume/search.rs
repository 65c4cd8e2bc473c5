use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::{Form, Json};
use serde::{Deserialize, Serialize};

use common::auth::Authorized;
use common::volume::{features, SearchMode, VolumeEntry};

use super::blocking;
use crate::http_server::caller::Caller;
use crate::http_server::error::ApiError;
use crate::ServiceState;

pub const MAX_SEARCH_RESULTS: usize = 100;

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub path: String,
    pub fuzzy: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchForm {
    #[serde(default)]
    pub search: String,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub volume: String,
    pub path: String,
    pub query: String,
    pub results: Vec<VolumeEntry>,
}

pub async fn handler(
    State(state): State<ServiceState>,
    caller: Caller,
    Path(volume_name): Path<String>,
    Query(query): Query<SearchQuery>,
    Form(form): Form<SearchForm>,
) -> Result<impl IntoResponse, ApiError> {
    let Authorized { volume, .. } = caller
        .authorize(&state, &volume_name, &query.path, true)
        .await?;
    volume.require_feature(features::SEARCH)?;

    let term = form.search.trim().to_string();
    if term.is_empty() {
        return Err(ApiError::bad_request("missing search term"));
    }
    let mode = match query.fuzzy {
        Some(_) => SearchMode::Fuzzy,
        None => SearchMode::Substring,
    };

    let results = {
        let volume = volume.clone();
        let path = query.path.clone();
        let term = term.clone();
        blocking(move || volume.search(&path, &term, mode, MAX_SEARCH_RESULTS)).await?
    };
    tracing::debug!(volume = volume.name(), results = results.len(), "search finished");

    Ok(Json(SearchResponse {
        volume: volume.name().to_string(),
        path: query.path,
        query: term,
        results,
    }))
}
