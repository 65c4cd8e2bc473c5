use std::time::Duration;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tokio::time::timeout;

use super::data_source::*;

const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(10);

#[tracing::instrument]
pub async fn handler(data_src: StateDataSource) -> Response {
    let (status, message) = match timeout(HEALTH_CHECK_TIMEOUT, data_src.is_ready()).await {
        Ok(Ok(())) => (StatusCode::OK, None),
        Ok(Err(DataSourceError::DependencyFailure)) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Some("one or more dependencies aren't available"),
        ),
        Ok(Err(DataSourceError::ShuttingDown)) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Some("service is shutting down"),
        ),
        Err(_) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Some("health check timed out"),
        ),
    };

    let body = match message {
        None => serde_json::json!({"status": "ok"}),
        Some(message) => {
            tracing::warn!(message, "service not ready");
            serde_json::json!({"status": "failure", "message": message})
        }
    };
    (status, Json(body)).into_response()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    use crate::http_server::health::data_source::tests::*;

    #[tokio::test]
    async fn test_handler_direct() {
        let response = handler(StateDataSource::new(Arc::new(MockReadiness::Ready))).await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = handler(StateDataSource::new(Arc::new(
            MockReadiness::DependencyFailure,
        )))
        .await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let response = handler(StateDataSource::new(Arc::new(MockReadiness::ShuttingDown))).await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
