use anyhow::Context;
use clap::ArgMatches;
use config::builder::DefaultState;
use config::{ConfigBuilder, File, FileFormat};
use serde::{Deserialize, Serialize};
use service_metrics::{MetricsError, ServiceName};
use std::path::{Path, PathBuf};

/// The application configuration.
#[derive(Default, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// The name of the service, used to label all metrics.
    pub service_name: Option<ServiceName>,
    /// The metrics configuration.
    pub metrics: MetricsConfig,
}

/// Provides metrics-specific configuration.
#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Whether requests and log records are instrumented and `/metrics` is served.
    pub enabled: bool,
    /// Upper bounds of the request latency histogram buckets, in seconds.
    pub latency_buckets: Option<Vec<f64>>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            latency_buckets: None,
        }
    }
}

impl AppConfig {
    /// Gets the configured service name.
    ///
    /// ## Errors
    /// Returns [`MetricsError::EmptyServiceName`] if no service name was configured.
    pub fn service_name(&self) -> Result<ServiceName, MetricsError> {
        self.service_name
            .clone()
            .ok_or(MetricsError::EmptyServiceName)
    }
}

/// Loads the configuration.
///
/// Sources, in increasing priority: `default.yml` and `default.yaml` in `config_dir`,
/// the file given by `--config`, and the `--service-name` argument.
///
/// Logging is not yet initialized when this runs, so errors are only returned.
pub fn load_config(config_dir: &Path, matches: &ArgMatches) -> Result<AppConfig, anyhow::Error> {
    let mut config_builder = ConfigBuilder::<DefaultState>::default();

    // Add default configuration.
    config_builder = config_builder
        .add_source(
            File::from(config_dir.join("default.yml"))
                .format(FileFormat::Yaml)
                .required(false),
        )
        .add_source(
            // The YAML FAQ requests `.yaml` to be used as the default.
            File::from(config_dir.join("default.yaml"))
                .format(FileFormat::Yaml)
                .required(false),
        );

    if let Some(path) = matches.get_one::<PathBuf>("config_file").cloned() {
        config_builder =
            config_builder.add_source(File::from(path).format(FileFormat::Yaml).required(true))
    }

    config_builder = config_builder
        .set_override_option(
            "service_name",
            matches.get_one::<String>("service_name").cloned(),
        )
        .context("Unable to apply the service name argument")?;

    let config = config_builder
        .build()
        .context("Unable to load configuration")?;

    config
        .try_deserialize()
        .context("Unable to deserialize configuration")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::build_command;

    #[test]
    fn deserialize_works() {
        let yaml = r#"
            service_name: orders
            metrics:
              latency_buckets: [0.01, 0.1, 1.0]
        "#;

        let config: AppConfig =
            serde_yaml::from_str(yaml).expect("Failed to deserialize configuration");
        assert_eq!(config.service_name().unwrap(), "orders");
        assert!(config.metrics.enabled);
        assert_eq!(config.metrics.latency_buckets, Some(vec![0.01, 0.1, 1.0]));
    }

    #[test]
    fn metrics_can_be_disabled() {
        let yaml = r#"
            metrics:
              enabled: false
        "#;

        let config: AppConfig =
            serde_yaml::from_str(yaml).expect("Failed to deserialize configuration");
        assert!(!config.metrics.enabled);
        assert!(matches!(
            config.service_name(),
            Err(MetricsError::EmptyServiceName)
        ));
    }

    #[test]
    fn empty_service_name_is_rejected() {
        let result: Result<AppConfig, _> = serde_yaml::from_str("service_name: ''");
        assert!(result.is_err());
    }

    #[test]
    fn argument_sets_service_name() {
        let matches = build_command()
            .try_get_matches_from(["demo", "--service-name", "orders"])
            .unwrap();

        let dir = std::env::temp_dir().join("service-metrics-demo-missing-config");
        let config = load_config(&dir, &matches).expect("Failed to load configuration");
        assert_eq!(config.service_name().unwrap(), "orders");
    }
}
