use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;

use common::volume::Privacy;

use crate::http_server::caller::Caller;
use crate::ServiceState;

#[derive(Debug, Serialize)]
pub struct VolumeSummary {
    pub name: String,
    pub privacy: Privacy,
    pub features: Vec<String>,
    pub link: String,
}

#[derive(Debug, Serialize)]
pub struct IndexResponse {
    pub user_id: Option<String>,
    pub volumes: Vec<VolumeSummary>,
}

/// Volumes the caller may see, sorted by name
pub async fn handler(State(state): State<ServiceState>, caller: Caller) -> impl IntoResponse {
    let capability = caller.capability(&state).await;

    let volumes = state
        .registry()
        .visible_to(capability.as_ref())
        .into_iter()
        .map(|volume| {
            let mut features: Vec<String> = volume.features().map(str::to_string).collect();
            features.sort_unstable();
            VolumeSummary {
                name: volume.name().to_string(),
                privacy: volume.privacy(),
                features,
                link: format!("/volume/{}/browse", volume.name()),
            }
        })
        .collect();

    Json(IndexResponse {
        user_id: capability
            .as_ref()
            .and_then(|c| c.user_id())
            .map(str::to_string),
        volumes,
    })
}
