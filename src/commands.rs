use crate::logging::LoggingStyle;
use clap::{Arg, Command};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

pub fn build_command() -> Command {
    let command = Command::new("Service Metrics Demo")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Markus Mayer")
        .about("An HTTP service instrumented with request and log metrics")
        .arg(
            Arg::new("logging_style")
                .long("log")
                .env("APP_LOG_STYLE")
                .value_name("STYLE")
                .default_value("simple")
                .help("The logging style to use (simple, json)")
                .num_args(1)
                .value_parser(logging_style)
                .help_heading("Logging"),
        )
        .arg(
            Arg::new("bind_http")
                .long("http")
                .env("APP_SERVER_BIND_HTTP")
                .value_name("SOCKET")
                .default_value("127.0.0.1:8080")
                .help("The socket to bind insecure HTTP on")
                .num_args(1..)
                .allow_negative_numbers(false)
                .action(clap::ArgAction::Append)
                .value_parser(socket_addr)
                .help_heading("Server"),
        )
        .arg(
            Arg::new("config_file")
                .long("config")
                .env("APP_CONFIG_FILE")
                .value_name("FILE")
                .help("A YAML configuration file to load in addition to the defaults")
                .num_args(1)
                .value_parser(clap::value_parser!(PathBuf))
                .help_heading("Configuration"),
        )
        .arg(
            Arg::new("service_name")
                .long("service-name")
                .env("APP_SERVICE_NAME")
                .value_name("NAME")
                .help("The service name used to label all metrics")
                .num_args(1)
                .help_heading("Metrics"),
        );
    command
}

fn logging_style(s: &str) -> Result<LoggingStyle, String> {
    match s {
        "simple" => Ok(LoggingStyle::Compact),
        "compact" => Ok(LoggingStyle::Compact),
        "json" => Ok(LoggingStyle::Json),
        _ => Err(String::from("Either simple or json must be specified")),
    }
}

fn socket_addr(s: &str) -> Result<SocketAddr, String> {
    SocketAddr::from_str(s).map_err(|e| format!("{e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_service_name_and_sockets() {
        let matches = build_command()
            .try_get_matches_from([
                "demo",
                "--service-name",
                "orders",
                "--http",
                "127.0.0.1:9000",
                "0.0.0.0:9001",
            ])
            .expect("valid arguments");

        assert_eq!(
            matches.get_one::<String>("service_name").map(String::as_str),
            Some("orders")
        );
        let sockets: Vec<&SocketAddr> = matches.get_many("bind_http").unwrap().collect();
        assert_eq!(sockets.len(), 2);
    }

    #[test]
    fn rejects_unknown_logging_style() {
        let result = build_command().try_get_matches_from(["demo", "--log", "fancy"]);
        assert!(result.is_err());
    }
}
