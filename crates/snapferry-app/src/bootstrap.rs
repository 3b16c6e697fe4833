//! Command line, configuration loading, service wiring, and shutdown.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use snapferry_api::{ApiServer, ApiState, BasicCredentials};
use snapferry_config::{AgentConfig, ServerSettings, load_config, resolve_config_path};
use snapferry_host::{ExportAcquirer, HostTransport, ImportFeeder, UnixSocketTransport};
use snapferry_store::{ChunkedStore, S3Backend};
use snapferry_telemetry::{LoggingConfig, Metrics, init_logging, log_format_from_str};
use tokio::signal::unix::{SignalKind, signal};
use tracing::{info, warn};

use crate::error::{AppError, AppResult};
use crate::orchestrator::TransferOrchestrator;

/// Command line accepted by the `snapferry` binary.
#[derive(Debug, Clone, Parser)]
#[command(name = "snapferry")]
#[command(about = "Streams workload snapshots between a virtualization host and an S3 bucket")]
pub struct Cli {
    /// Path to the YAML configuration file.
    #[arg(long, env = "CONFIG_PATH")]
    pub config: Option<PathBuf>,
}

/// Load configuration, install logging, and serve until SIGINT or SIGTERM.
///
/// In-flight transfers are not drained on shutdown; their connections are
/// dropped and surface as stream errors.
///
/// # Errors
///
/// Returns an error when configuration, telemetry, or the listener cannot be
/// set up, or when the server stops with an error.
pub async fn run_app(cli: Cli) -> AppResult<()> {
    let path = resolve_config_path(cli.config.as_deref())
        .map_err(|err| AppError::config("path resolution", err))?;
    let config = load_config(&path).map_err(|err| AppError::config("load", err))?;

    let logging = LoggingConfig {
        level: &config.logging.level,
        format: log_format_from_str(config.logging.format.as_deref()),
        ..LoggingConfig::default()
    };
    init_logging(&logging).map_err(|err| AppError::telemetry("logging setup", err))?;
    info!(config = %path.display(), "snapferry bootstrap starting");

    let metrics = Metrics::new().map_err(|err| AppError::telemetry("metrics setup", err))?;
    let api = build_api(&config, metrics);

    tokio::select! {
        served = serve_api(api, &config.server) => served?,
        signalled = shutdown_signal() => {
            signalled?;
            info!("shutdown signal received; in-flight transfers are abandoned");
        }
    }
    info!("API server shutdown complete");
    Ok(())
}

/// Wire the store, host collaborators, orchestrator, and router from `config`.
#[must_use]
pub fn build_api(config: &AgentConfig, metrics: Metrics) -> ApiServer {
    let store = ChunkedStore::new(S3Backend::new(&config.store), config.store.part_size)
        .with_metrics(metrics.clone());
    let transport: Arc<dyn HostTransport> = Arc::new(UnixSocketTransport::new(&config.host));
    let orchestrator = TransferOrchestrator::new(
        Arc::new(ExportAcquirer::new(Arc::clone(&transport))),
        Arc::new(ImportFeeder::new(transport)),
        Arc::new(store),
        metrics.clone(),
    );
    ApiServer::new(ApiState::new(
        Arc::new(orchestrator),
        BasicCredentials::from_settings(&config.server),
        metrics,
    ))
}

/// Serve `api` on the configured address, over HTTPS when a certificate and
/// key are configured.
///
/// # Errors
///
/// Returns an error when the TLS identity cannot be loaded, the address
/// cannot be bound, or the server stops with an error.
pub async fn serve_api(api: ApiServer, server: &ServerSettings) -> AppResult<()> {
    let addr = SocketAddr::new(server.bind_addr, server.port);
    let served = match &server.tls {
        Some(tls) => api.serve_tls(addr, tls).await,
        None => {
            warn!(%addr, "no tls identity configured; serving plain http");
            api.serve(addr).await
        }
    };
    served.map_err(|err| AppError::api_server("serve", err))
}

async fn shutdown_signal() -> AppResult<()> {
    let mut terminate =
        signal(SignalKind::terminate()).map_err(|err| AppError::io("SIGTERM handler setup", err))?;
    tokio::select! {
        interrupted = tokio::signal::ctrl_c() => {
            interrupted.map_err(|err| AppError::io("Ctrl-C handler", err))
        }
        _ = terminate.recv() => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_accepts_config_flag() -> anyhow::Result<()> {
        let cli = Cli::try_parse_from(["snapferry", "--config", "/etc/snapferry.yaml"])?;
        assert_eq!(cli.config, Some(PathBuf::from("/etc/snapferry.yaml")));
        Ok(())
    }

    #[test]
    fn cli_rejects_unknown_flags() {
        assert!(Cli::try_parse_from(["snapferry", "--tls"]).is_err());
    }
}
