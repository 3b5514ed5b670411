//! Contains the `/metrics` endpoint.

use crate::{Metrics, MetricsError};
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, MethodRouter};
use axum::Router;
use std::sync::Arc;
use tracing::error;

const ROUTE: &str = "/metrics";
const CONTENT_TYPE: &str = "text/plain; charset=utf-8";

pub trait MetricsRoutes {
    /// Provides an API for Prometheus/OpenMetrics metrics.
    ///
    /// ```http
    /// GET /metrics HTTP/1.1
    /// ```
    fn map_metrics_endpoint(self, metrics: Arc<Metrics>) -> Self;
}

impl<S> MetricsRoutes for Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn map_metrics_endpoint(self, metrics: Arc<Metrics>) -> Self {
        // Merging a router here would replace the layered default fallback.
        let endpoint: MethodRouter<Arc<Metrics>> = get(render_metrics);
        self.route(ROUTE, endpoint.with_state(metrics))
    }
}

async fn render_metrics(
    State(metrics): State<Arc<Metrics>>,
) -> Result<impl IntoResponse, MetricsError> {
    let body = metrics.encode()?;
    Ok(([(header::CONTENT_TYPE, CONTENT_TYPE)], body))
}

impl IntoResponse for MetricsError {
    fn into_response(self) -> Response {
        error!("Unable to render metrics: {error}", error = self);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Unable to render metrics",
        )
            .into_response()
    }
}
