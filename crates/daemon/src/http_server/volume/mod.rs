//! Routes under `/volume/{volume}`. Every handler goes through the gate
//!  before touching the filesystem.

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use bytes::Bytes;

use common::volume::{PathError, Volume};

use super::error::ApiError;
use crate::ServiceState;

pub mod browse;
pub mod search;
pub mod share;
pub mod sharex;
pub mod upload;

pub fn router(state: ServiceState) -> Router<ServiceState> {
    Router::new()
        .route("/:volume/browse", get(browse::root_handler))
        .route("/:volume/browse/", get(browse::root_handler))
        .route("/:volume/browse/*path", get(browse::handler))
        .route("/:volume/share", post(share::root_handler))
        .route("/:volume/share/*path", post(share::handler))
        .route("/:volume/upload", post(upload::handler))
        .route("/:volume/sharex", post(sharex::handler))
        .route("/:volume/search", post(search::handler))
        .with_state(state)
}

/// Run blocking filesystem work off the async runtime
pub(crate) async fn blocking<T, E, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, E> + Send + 'static,
    T: Send + 'static,
    E: Into<ApiError> + Send + 'static,
{
    tokio::task::spawn_blocking(f).await?.map_err(Into::into)
}

/// Write `data` to `relative` inside the volume, creating parent
///  directories as needed.
pub(crate) async fn store(volume: Arc<Volume>, relative: String, data: Bytes) -> Result<(), ApiError> {
    blocking(move || -> Result<(), PathError> {
        let destination = volume.resolve(&relative)?;
        if let Some(parent) = destination.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&destination, &data)?;
        tracing::info!(volume = volume.name(), path = relative, size = data.len(), "stored upload");
        Ok(())
    })
    .await
}

/// The last component of a client-supplied file name, if it is usable
pub(crate) fn final_component(name: &str) -> Option<String> {
    let base = name.rsplit(['/', '\\']).next()?.trim();
    match base {
        "" | "." | ".." => None,
        base => Some(base.to_string()),
    }
}

pub(crate) fn join_relative(dir: &str, name: &str) -> String {
    let dir = dir.trim_matches('/');
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", dir, name)
    }
}

pub(crate) fn bad_multipart(err: axum::extract::multipart::MultipartError) -> ApiError {
    tracing::debug!(error = %err, "malformed multipart body");
    ApiError::bad_request("malformed multipart body")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_final_component() {
        assert_eq!(final_component("a.png").as_deref(), Some("a.png"));
        assert_eq!(final_component("../../etc/passwd").as_deref(), Some("passwd"));
        assert_eq!(final_component("C:\\Users\\me\\shot.png").as_deref(), Some("shot.png"));
        assert_eq!(final_component("dir/"), None);
        assert_eq!(final_component(".."), None);
        assert_eq!(final_component(""), None);
    }

    #[test]
    fn test_join_relative() {
        assert_eq!(join_relative("", "a"), "a");
        assert_eq!(join_relative("/x/y/", "a"), "x/y/a");
    }
}
