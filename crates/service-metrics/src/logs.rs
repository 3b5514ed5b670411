//! Contains log record metrics, notably [`LogMetrics`].

use crate::ServiceName;
use prometheus_client::encoding::{EncodeLabelSet, EncodeLabelValue, LabelValueEncoder};
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::registry::Registry;
use std::fmt::{Display, Formatter, Write};
use tracing::Level;

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
struct LogLabels {
    service: ServiceName,
    level: LogLevel,
}

/// The severity of a log record.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warning,
    Error,
}

impl EncodeLabelValue for LogLevel {
    fn encode(&self, encoder: &mut LabelValueEncoder) -> Result<(), std::fmt::Error> {
        encoder.write_str(self.to_string().as_str())
    }
}

impl Display for LogLevel {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Trace => write!(f, "TRACE"),
            Self::Debug => write!(f, "DEBUG"),
            Self::Info => write!(f, "INFO"),
            Self::Warning => write!(f, "WARNING"),
            Self::Error => write!(f, "ERROR"),
        }
    }
}

impl From<&Level> for LogLevel {
    fn from(value: &Level) -> Self {
        if *value == Level::ERROR {
            Self::Error
        } else if *value == Level::WARN {
            Self::Warning
        } else if *value == Level::INFO {
            Self::Info
        } else if *value == Level::DEBUG {
            Self::Debug
        } else {
            Self::Trace
        }
    }
}

impl From<Level> for LogLevel {
    fn from(value: Level) -> Self {
        LogLevel::from(&value)
    }
}

/// Log record metrics. Can be cheaply cloned.
/// Used by [`LogMessageCounter`](crate::LogMessageCounter).
#[derive(Clone, Debug, Default)]
pub struct LogMetrics {
    messages: Family<LogLabels, Counter>,
}

impl LogMetrics {
    /// Register the `logger_messages` family with the registry.
    pub(crate) fn register(&self, registry: &mut Registry) {
        // Exposed as `logger_messages_total`.
        registry.register(
            "logger_messages",
            "Count of log entries by service and level",
            self.messages.clone(),
        );
    }

    /// Tracks one emitted log record.
    pub fn track(&self, service: &ServiceName, level: LogLevel) {
        self.messages
            .get_or_create(&LogLabels {
                service: service.clone(),
                level,
            })
            .inc();
    }
}
