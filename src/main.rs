#![forbid(unused_must_use)]
// only enables the `doc_cfg` feature when
// the `docsrs` configuration attribute is defined
#![cfg_attr(docsrs, feature(doc_cfg))]

//! # An HTTP service instrumented with request and log metrics.
//!
//! ## Endpoints
//!
//! * `/items/{id}`: Returns a demo item.
//! * `/health`, `/healthz`, `/startupz`, `/readyz`, `/livez`: Health probes.
//! * `/metrics`: Endpoint for Prometheus metrics, unless disabled by configuration.

use crate::app_config::{load_config, AppConfig};
use crate::handlers::*;
use axum::Router;
use clap::ArgMatches;
use directories::ProjectDirs;
use futures_util::stream::FuturesUnordered;
use futures_util::StreamExt;
use service_metrics::{instrument, LogMessageCounter, Metrics, ServiceName};
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

mod app_config;
mod commands;
mod handlers;
mod health;
mod logging;

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let matches = commands::build_command().get_matches();

    let dirs = match ProjectDirs::from("io.github", "sunsided", "service-metrics-demo") {
        Some(dirs) => dirs,
        None => {
            eprintln!("Could not determine the project directories");
            return ExitCode::FAILURE;
        }
    };

    // Logging needs the service name, so configuration errors go to stderr.
    let cfg: AppConfig = match load_config(dirs.config_local_dir(), &matches) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e:#}");
            return ExitCode::from(exitcode::CONFIG as u8);
        }
    };

    let service = match cfg.service_name() {
        Ok(service) => service,
        Err(e) => {
            eprintln!("{e}; use --service-name or the `service_name` configuration key");
            return ExitCode::from(exitcode::CONFIG as u8);
        }
    };

    let metrics = cfg.metrics.enabled.then(|| {
        Arc::new(match &cfg.metrics.latency_buckets {
            Some(buckets) => Metrics::with_latency_buckets(buckets.iter().copied()),
            None => Metrics::new(),
        })
    });

    let log_counter = metrics
        .as_ref()
        .map(|metrics| LogMessageCounter::new(service.clone(), metrics.logs()).into_layer());
    logging::initialize_from_matches(&matches, log_counter);

    info!("Hi. 👋");
    if metrics.is_none() {
        warn!("Metrics are disabled by configuration");
    }

    // Provide a signal that can be used to shut down the server.
    let (shutdown_tx, _) = broadcast::channel::<()>(1);
    if let Err(e) = register_shutdown_handler(shutdown_tx.clone()) {
        error!("Error setting process termination handler: {error}", error = e);
        return ExitCode::FAILURE;
    }

    let app = build_router(service, metrics);
    let exit_code = serve_requests(&matches, app, shutdown_tx.clone())
        .await
        .err();

    // If all servers are shut down, ensure the news is broadcast as well.
    stop_all_servers(shutdown_tx);

    info!("Bye. 👋");
    exit_code.unwrap_or(ExitCode::SUCCESS)
}

/// Builds the application routes and, if enabled, instruments them.
fn build_router(service: ServiceName, metrics: Option<Arc<Metrics>>) -> Router {
    let app = Router::new()
        .map_item_endpoints()
        .map_health_endpoints()
        .fallback(not_found);

    match metrics {
        Some(metrics) => instrument(app, service, metrics),
        None => app,
    }
}

fn stop_all_servers(shutdown_tx: broadcast::Sender<()>) {
    // We take ownership of this channel so that it'll be closed after.
    shutdown_tx.send(()).ok();
}

async fn serve_requests(
    matches: &ArgMatches,
    app: Router,
    shutdown_tx: broadcast::Sender<()>,
) -> Result<(), ExitCode> {
    // Get the HTTP socket addresses to bind on.
    let http_sockets: Vec<SocketAddr> = matches
        .get_many("bind_http")
        .into_iter()
        .flatten()
        .cloned()
        .collect();

    let mut servers = FuturesUnordered::new();
    for addr in http_sockets {
        let mut shutdown_rx = shutdown_tx.subscribe();

        let listener = match TcpListener::bind(addr).await {
            Ok(listener) => {
                info!("Now listening on http://{addr}", addr = addr);
                listener
            }
            Err(e) => {
                error!("Unable to bind to {addr}: {error}", addr = addr, error = e);

                // No servers are currently running since no await was called on any
                // of them yet. Therefore, exiting here is "graceful".
                return Err(ExitCode::from(exitcode::NOPERM as u8));
            }
        };

        let server = axum::serve(listener, app.clone())
            .with_graceful_shutdown(async move {
                shutdown_rx.recv().await.ok();
            })
            .into_future();

        servers.push(server);
    }

    // Wait for all servers to stop.
    let mut exit_code = None;
    while let Some(result) = servers.next().await {
        match result {
            Ok(()) => {
                debug!("A server stopped")
            }
            Err(e) => {
                error!("Server error: {}", e);

                // Apply better error code if known.
                if exit_code.is_none() {
                    exit_code = Some(ExitCode::FAILURE);
                }
            }
        }

        // Ensure that all other servers also shut down in presence
        // of an error of any one of them.
        shutdown_tx.send(()).ok();
    }

    if let Some(exit_code) = exit_code {
        Err(exit_code)
    } else {
        Ok(())
    }
}

fn register_shutdown_handler(shutdown_tx: broadcast::Sender<()>) -> Result<(), ctrlc::Error> {
    ctrlc::set_handler(move || {
        warn!("Initiating shutdown from OS");
        shutdown_tx.send(()).ok();
    })
}
