//! Contains the [`LogSink`] capability and the [`tracing`] layer that feeds it.

use crate::logs::{LogLevel, LogMetrics};
use crate::ServiceName;
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::Layer;

/// One emitted log record, as seen by a [`LogSink`].
#[derive(Debug, Clone, Copy)]
pub struct LogRecord<'a> {
    /// The severity of the record.
    pub level: LogLevel,
    /// The logger the record was emitted on, e.g. `orders::handlers`.
    pub target: &'a str,
}

/// Consumes emitted log records.
///
/// Implementations are called from whatever code path emitted the record
/// and must not panic.
pub trait LogSink: Send + Sync + 'static {
    fn emit(&self, record: &LogRecord<'_>);
}

/// A [`LogSink`] that counts log records by service and level. Uses [`LogMetrics`].
#[derive(Clone, Debug)]
pub struct LogMessageCounter {
    service: ServiceName,
    metrics: LogMetrics,
    target: Option<String>,
}

impl LogMessageCounter {
    /// Creates a counter for every record, regardless of its target.
    pub fn new(service: ServiceName, metrics: LogMetrics) -> Self {
        Self {
            service,
            metrics,
            target: None,
        }
    }

    /// Restricts counting to records emitted on `target` or any of its descendants
    /// (`target::*`).
    pub fn for_target<T: Into<String>>(mut self, target: T) -> Self {
        self.target = Some(target.into());
        self
    }

    /// Wraps this counter into a layer that can be added to a `tracing` subscriber.
    pub fn into_layer(self) -> LogSinkLayer<Self> {
        LogSinkLayer::new(self)
    }

    fn accepts(&self, target: &str) -> bool {
        let Some(logger) = &self.target else {
            return true;
        };

        match target.strip_prefix(logger.as_str()) {
            Some(rest) => rest.is_empty() || rest.starts_with("::"),
            None => false,
        }
    }
}

impl LogSink for LogMessageCounter {
    fn emit(&self, record: &LogRecord<'_>) {
        if self.accepts(record.target) {
            self.metrics.track(&self.service, record.level);
        }
    }
}

/// A [`Layer`] forwarding every event to a [`LogSink`].
///
/// The layer is additive: it sits next to any formatting or exporting layers
/// on the same subscriber and never formats or forwards the event itself.
#[derive(Clone, Debug)]
pub struct LogSinkLayer<T> {
    sink: T,
}

impl<T> LogSinkLayer<T>
where
    T: LogSink,
{
    /// Creates a layer forwarding every event to `sink`.
    pub fn new(sink: T) -> Self {
        Self { sink }
    }
}

impl<S, T> Layer<S> for LogSinkLayer<T>
where
    S: Subscriber,
    T: LogSink,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        self.sink.emit(&LogRecord {
            level: metadata.level().into(),
            target: metadata.target(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Metrics;
    use std::sync::Mutex;
    use tracing::{error, info, warn};
    use tracing_subscriber::layer::SubscriberExt;

    fn orders() -> ServiceName {
        ServiceName::new("orders").unwrap()
    }

    #[test]
    fn counts_records_by_level() {
        let metrics = Metrics::new();
        let layer = LogMessageCounter::new(orders(), metrics.logs()).into_layer();
        let subscriber = tracing_subscriber::registry().with(layer);

        tracing::subscriber::with_default(subscriber, || {
            warn!("Low stock");
            info!("Order placed");
            info!("Order shipped");
        });

        let text = metrics.encode().unwrap();
        assert!(text.contains(r#"logger_messages_total{service="orders",level="WARNING"} 1"#));
        assert!(text.contains(r#"logger_messages_total{service="orders",level="INFO"} 2"#));
        assert!(!text.contains(r#"level="ERROR""#));
    }

    #[test]
    fn target_filter_includes_descendants_only() {
        let counter = LogMessageCounter::new(orders(), Metrics::new().logs()).for_target("orders");

        assert!(counter.accepts("orders"));
        assert!(counter.accepts("orders::handlers"));
        assert!(!counter.accepts("orders_legacy"));
        assert!(!counter.accepts("billing::orders"));
    }

    #[test]
    fn layer_is_additive() {
        #[derive(Default)]
        struct Recorder(Mutex<Vec<LogLevel>>);

        impl LogSink for std::sync::Arc<Recorder> {
            fn emit(&self, record: &LogRecord<'_>) {
                self.0.lock().unwrap().push(record.level);
            }
        }

        let metrics = Metrics::new();
        let recorder = std::sync::Arc::new(Recorder::default());
        let subscriber = tracing_subscriber::registry()
            .with(tracing_subscriber::fmt::layer().with_test_writer())
            .with(LogSinkLayer::new(recorder.clone()))
            .with(LogMessageCounter::new(orders(), metrics.logs()).into_layer());

        tracing::subscriber::with_default(subscriber, || {
            error!("Payment failed");
        });

        assert_eq!(*recorder.0.lock().unwrap(), vec![LogLevel::Error]);
        let text = metrics.encode().unwrap();
        assert!(text.contains(r#"logger_messages_total{service="orders",level="ERROR"} 1"#));
    }
}
