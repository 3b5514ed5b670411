//! Contains HTTP metrics related code, notably [`HttpMetrics`].

use crate::ServiceName;
use axum::http::Method;
use prometheus_client::encoding::LabelValueEncoder;
use prometheus_client::encoding::{EncodeLabelSet, EncodeLabelValue};
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::{Family, MetricConstructor};
use prometheus_client::metrics::histogram::{exponential_buckets, Histogram};
use prometheus_client::registry::{Registry, Unit};
use std::fmt::{Display, Formatter, Write};
use std::sync::Arc;
use std::time::Duration;

/// The labels attached to every request observation.
///
/// The field order is the label order in the exposition output.
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct RequestLabels {
    /// The configured service name.
    pub service: ServiceName,
    /// The uppercase HTTP method.
    pub method: HttpMethod,
    /// The matched route pattern, or the raw path if no route matched.
    pub uri: String,
    /// The numeric HTTP status code.
    pub status: u16,
}

/// The HTTP method to track.
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub enum HttpMethod {
    /// See [`Method::OPTIONS`].
    Options,
    /// See [`Method::GET`].
    Get,
    /// See [`Method::POST`].
    Post,
    /// See [`Method::PUT`].
    Put,
    /// See [`Method::DELETE`].
    Delete,
    /// See [`Method::HEAD`].
    Head,
    /// See [`Method::PATCH`].
    Patch,
    /// Any other [`Method`].
    Unhandled(Method),
}

impl EncodeLabelValue for HttpMethod {
    fn encode(&self, encoder: &mut LabelValueEncoder) -> Result<(), std::fmt::Error> {
        encoder.write_str(self.to_string().as_str())
    }
}

impl Display for HttpMethod {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Options => write!(f, "OPTIONS"),
            Self::Get => write!(f, "GET"),
            Self::Post => write!(f, "POST"),
            Self::Put => write!(f, "PUT"),
            Self::Delete => write!(f, "DELETE"),
            Self::Head => write!(f, "HEAD"),
            Self::Patch => write!(f, "PATCH"),
            Self::Unhandled(other) => write!(f, "{}", other.as_str().to_ascii_uppercase()),
        }
    }
}

impl From<&Method> for HttpMethod {
    fn from(value: &Method) -> Self {
        match value {
            &Method::GET => Self::Get,
            &Method::OPTIONS => Self::Options,
            &Method::POST => Self::Post,
            &Method::PUT => Self::Put,
            &Method::DELETE => Self::Delete,
            &Method::HEAD => Self::Head,
            &Method::PATCH => Self::Patch,
            other => Self::Unhandled(other.clone()),
        }
    }
}

impl From<Method> for HttpMethod {
    fn from(value: Method) -> Self {
        HttpMethod::from(&value)
    }
}

/// The default latency buckets: 5 ms doubling up to roughly 41 s.
pub fn default_latency_buckets() -> impl Iterator<Item = f64> {
    exponential_buckets(0.005, 2.0, 14)
}

/// Builds latency histograms with a fixed set of bucket bounds.
#[derive(Clone, Debug)]
pub struct LatencyHistogram {
    buckets: Arc<[f64]>,
}

impl LatencyHistogram {
    fn new<I: IntoIterator<Item = f64>>(buckets: I) -> Self {
        Self {
            buckets: buckets.into_iter().collect(),
        }
    }
}

impl MetricConstructor<Histogram> for LatencyHistogram {
    fn new_metric(&self) -> Histogram {
        Histogram::new(self.buckets.iter().copied())
    }
}

/// HTTP call metrics. Can be cheaply cloned; all clones record into the same families.
/// Used by [`RequestInterceptor`](crate::RequestInterceptor).
#[derive(Clone, Debug)]
pub struct HttpMetrics {
    requests: Family<RequestLabels, Counter>,
    latency: Family<RequestLabels, Histogram, LatencyHistogram>,
}

impl HttpMetrics {
    pub(crate) fn new<I: IntoIterator<Item = f64>>(buckets: I) -> Self {
        Self {
            requests: Family::default(),
            latency: Family::new_with_constructor(LatencyHistogram::new(buckets)),
        }
    }

    /// Register the request latency and request count families with the registry.
    pub(crate) fn register(&self, registry: &mut Registry) {
        registry.register_with_unit(
            "http_server_requests",
            "HTTP request latency",
            Unit::Seconds,
            self.latency.clone(),
        );

        // Exposed as `http_server_requests_count_total`.
        registry.register(
            "http_server_requests_count",
            "HTTP request count",
            self.requests.clone(),
        );
    }

    /// Tracks one completed call.
    ///
    /// The count is always incremented; the latency is only observed if it is known.
    pub fn track(&self, labels: &RequestLabels, elapsed: Option<Duration>) {
        if let Some(elapsed) = elapsed {
            self.latency
                .get_or_create(labels)
                .observe(elapsed.as_secs_f64());
        }

        self.requests.get_or_create(labels).inc();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prometheus_client::encoding::text::encode;

    fn labels(status: u16) -> RequestLabels {
        RequestLabels {
            service: ServiceName::new("orders").unwrap(),
            method: HttpMethod::Get,
            uri: "/items/{id}".to_string(),
            status,
        }
    }

    fn render(metrics: &HttpMetrics) -> String {
        let mut registry = Registry::default();
        metrics.register(&mut registry);
        let mut buffer = String::new();
        encode(&mut buffer, &registry).unwrap();
        buffer
    }

    #[test]
    fn method_names_are_uppercase() {
        assert_eq!(HttpMethod::from(Method::GET).to_string(), "GET");
        assert_eq!(HttpMethod::from(&Method::PATCH).to_string(), "PATCH");

        let custom = Method::from_bytes(b"purge").unwrap();
        assert_eq!(HttpMethod::from(custom).to_string(), "PURGE");
    }

    #[test]
    fn track_records_count_and_latency() {
        let metrics = HttpMetrics::new(default_latency_buckets());
        metrics.track(&labels(200), Some(Duration::from_millis(3)));
        metrics.track(&labels(200), Some(Duration::from_millis(7)));

        let text = render(&metrics);
        assert!(text.contains(
            r#"http_server_requests_count_total{service="orders",method="GET",uri="/items/{id}",status="200"} 2"#
        ));
        assert!(text.contains(
            r#"http_server_requests_seconds_count{service="orders",method="GET",uri="/items/{id}",status="200"} 2"#
        ));
    }

    #[test]
    fn track_without_latency_still_counts() {
        let metrics = HttpMetrics::new(default_latency_buckets());
        metrics.track(&labels(404), None);

        let text = render(&metrics);
        assert!(text.contains(
            r#"http_server_requests_count_total{service="orders",method="GET",uri="/items/{id}",status="404"} 1"#
        ));
        assert!(!text.contains("http_server_requests_seconds_count{"));
    }

    #[test]
    fn custom_buckets_are_used() {
        let metrics = HttpMetrics::new([0.1, 1.0]);
        metrics.track(&labels(200), Some(Duration::from_millis(500)));

        let text = render(&metrics);
        assert!(text.contains(r#"le="0.1""#));
        assert!(text.contains(r#"le="1.0""#));
        assert!(!text.contains(r#"le="0.005""#));
    }
}
