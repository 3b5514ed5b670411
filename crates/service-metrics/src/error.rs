/// Errors raised by the metrics shim.
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    #[error("The service name must not be empty")]
    EmptyServiceName,
    #[error("Failed to encode the metrics registry: {0}")]
    Encode(#[from] std::fmt::Error),
}
