//! Request and log metrics for [`axum`] services, rendered in the Prometheus/OpenMetrics
//! text exposition format.
//!
//! * [`HttpCallMetricsLayer`] records `http_server_requests_seconds` and
//!   `http_server_requests_count` for every routed request.
//! * [`LogSinkLayer`] with a [`LogMessageCounter`] counts `logger_messages` by level.
//! * [`MetricsRoutes`] serves the registry on `GET /metrics`.

// only enables the `doc_cfg` feature when
// the `docsrs` configuration attribute is defined
#![cfg_attr(docsrs, feature(doc_cfg))]

mod endpoint;
mod error;
pub mod http;
mod interceptor;
mod log_sink;
pub mod logs;
mod service_name;

pub use endpoint::MetricsRoutes;
pub use error::MetricsError;
pub use interceptor::{
    HttpCallMetrics, HttpCallMetricsFuture, HttpCallMetricsLayer, RequestContext, RequestInfo,
    RequestInterceptor,
};
pub use log_sink::{LogMessageCounter, LogRecord, LogSink, LogSinkLayer};
pub use service_name::ServiceName;

use crate::http::HttpMetrics;
use crate::logs::LogMetrics;
use axum::Router;
use prometheus_client::encoding::text::encode;
use prometheus_client::registry::Registry;
use std::sync::Arc;

/// The metrics registry.
///
/// Create one per process and share it via [`Arc`].
#[derive(Debug)]
pub struct Metrics {
    registry: Registry,
    http: HttpMetrics,
    logs: LogMetrics,
}

impl Metrics {
    /// Creates a new metrics registry using the default latency buckets.
    pub fn new() -> Self {
        Self::with_latency_buckets(http::default_latency_buckets())
    }

    /// Creates a new metrics registry.
    ///
    /// ## Arguments
    /// * `buckets` - The upper bounds of the request latency histogram buckets, in seconds.
    pub fn with_latency_buckets<I: IntoIterator<Item = f64>>(buckets: I) -> Self {
        let mut registry = <Registry>::default();

        let http = HttpMetrics::new(buckets);
        http.register(&mut registry);

        let logs = LogMetrics::default();
        logs.register(&mut registry);

        Self {
            registry,
            http,
            logs,
        }
    }

    /// Gets a handle to the HTTP request metrics.
    pub fn http(&self) -> HttpMetrics {
        self.http.clone()
    }

    /// Gets a handle to the log record metrics.
    pub fn logs(&self) -> LogMetrics {
        self.logs.clone()
    }

    /// Encode the metrics into the specified buffer.
    ///
    /// ## Arguments
    /// * `buffer` - The buffer to use to encode the metrics into.
    pub fn encode_into(&self, buffer: &mut String) -> Result<(), MetricsError> {
        encode(buffer, &self.registry)?;
        Ok(())
    }

    /// Encode the metrics into a string.
    ///
    /// ## Returns
    /// The Prometheus/OpenMetrics encoded metrics as as string.
    pub fn encode(&self) -> Result<String, MetricsError> {
        let mut buffer = String::new();
        self.encode_into(&mut buffer)?;
        Ok(buffer)
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Instruments an application router.
///
/// Every route and fallback registered on `router` so far is wrapped in an
/// [`HttpCallMetricsLayer`]; `GET /metrics` is added afterwards and is not itself tracked.
pub fn instrument<S>(router: Router<S>, service: ServiceName, metrics: Arc<Metrics>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    let interceptor = RequestInterceptor::new(service, metrics.http());
    router
        .layer(HttpCallMetricsLayer::new(interceptor))
        .map_metrics_endpoint(metrics)
}
