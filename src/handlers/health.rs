//! Contains the health endpoints.

use crate::health::HealthState;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;

pub trait HealthRoutes {
    /// Provides an API for health checks.
    ///
    /// For startup, readiness and liveness probes:
    ///
    /// ```http
    /// GET /startupz HTTP/1.1
    /// GET /readyz HTTP/1.1
    /// GET /livez HTTP/1.1
    /// ```
    ///
    /// For combined health probes:
    ///
    /// ```http
    /// GET /health HTTP/1.1
    /// GET /healthz HTTP/1.1
    /// ```
    fn map_health_endpoints(self) -> Self;
}

impl<S> HealthRoutes for Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn map_health_endpoints(self) -> Self {
        self.route("/health", get(handle_health))
            .route("/startupz", get(handle_health))
            .route("/readyz", get(handle_health))
            .route("/livez", get(handle_health))
            .route("/healthz", get(handle_health))
    }
}

/// Performs a health check. The demo service has no dependencies, so every
/// probe reports healthy once the server accepts requests.
async fn handle_health() -> HealthState {
    HealthState::Healthy
}

impl IntoResponse for HealthState {
    fn into_response(self) -> Response {
        format!("{}", self).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    #[tokio::test]
    async fn every_probe_reports_healthy() {
        let app = Router::new().map_health_endpoints();

        for path in ["/health", "/startupz", "/readyz", "/livez", "/healthz"] {
            let request = Request::builder().uri(path).body(Body::empty()).unwrap();
            let response = app.clone().oneshot(request).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK, "{path}");

            let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
            assert_eq!(&body[..], b"Healthy");
        }
    }
}
