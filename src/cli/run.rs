use crate::config::parse::{load_config, ConfigError};
use crate::config::types::{BackendType, Config};
use crate::config::{system_config_path, user_config_path};
use crate::handler::{GroupingLayer, RequestLogger};
use crate::ingestion::{HttpClient, IngestError, IngestionClient, StdoutClient};
use crate::shipper::BackgroundTransport;
use crate::shutdown::ShutdownRegistry;
use crate::web::run_server;
use axum::http::header::InvalidHeaderName;
use axum::http::HeaderName;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("ingestion client error: {0}")]
    Ingest(#[from] IngestError),

    #[error("failed to start log worker: {0}")]
    Worker(std::io::Error),

    #[error("invalid trace header: {0}")]
    TraceHeader(#[from] InvalidHeaderName),

    #[error("failed to install tracing subscriber: {0}")]
    Subscriber(#[from] TryInitError),

    #[error("failed to start async runtime: {0}")]
    Runtime(std::io::Error),

    #[error("web server error: {0}")]
    WebServer(std::io::Error),
}

pub fn run(config_path: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let config_path = match config_path {
        Some(path) => path,
        None => {
            eprintln!("Error: config not found");
            eprintln!("Searched locations:");
            if let Some(user_config) = user_config_path() {
                eprintln!("  {}", user_config.display());
            }
            eprintln!("  {}", system_config_path().display());
            eprintln!("\nUse --config <path> to specify a config file, or run 'log-groups config init' to generate one.");
            std::process::exit(1);
        }
    };

    run_service(&config_path).map_err(|e| e.into())
}

fn run_service(config_path: &Path) -> Result<(), RunError> {
    let config = load_config(config_path)?;
    let registry = ShutdownRegistry::new();

    let request_log = &config.streams.request.log_name;
    let application_log = &config.streams.application.log_name;

    match config.ingestion.backend {
        BackendType::Http => {
            let client = HttpClient::new(&config.ingestion)?;
            serve(
                &config,
                &registry,
                client.logger(request_log),
                client.logger(application_log),
            )
        }
        BackendType::Stdout => {
            let project_id = config.ingestion.project_id.clone();
            serve(
                &config,
                &registry,
                StdoutClient::new(project_id.clone(), request_log),
                StdoutClient::new(project_id, application_log),
            )
        }
    }
}

/// Start both streams, install the shipping layer and serve until ctrl-c.
///
/// The runtime only drives the web server. Transports are created and dropped
/// out here because blocking ingestion clients must not be dropped inside it.
fn serve<C: IngestionClient>(
    config: &Config,
    registry: &ShutdownRegistry,
    request_client: C,
    application_client: C,
) -> Result<(), RunError> {
    let request_transport = Arc::new(
        BackgroundTransport::from_stream_config(
            request_client,
            &config.streams.request,
            registry.clone(),
        )
        .map_err(RunError::Worker)?,
    );
    let application_transport = Arc::new(
        BackgroundTransport::from_stream_config(
            application_client,
            &config.streams.application,
            registry.clone(),
        )
        .map_err(RunError::Worker)?,
    );

    let shipping_layer = GroupingLayer::new(application_transport.clone(), config.min_severity)
        .with_resource(config.resource.clone())
        .with_labels(config.labels.clone());

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "log_groups=info".into()))
        .with(tracing_subscriber::fmt::layer())
        .with(shipping_layer)
        .try_init()?;

    info!(
        backend = ?config.ingestion.backend,
        request_log = %config.streams.request.log_name,
        application_log = %config.streams.application.log_name,
        "Configuration loaded"
    );

    let mut request_logger = RequestLogger::new(request_transport.clone())
        .with_resource(config.resource.clone())
        .with_labels(config.labels.clone());
    if let Some(header) = &config.trace_header {
        request_logger = request_logger.with_trace_header(HeaderName::from_bytes(header.as_bytes())?);
    }
    let request_logger = Arc::new(request_logger);

    let runtime = tokio::runtime::Runtime::new().map_err(RunError::Runtime)?;
    let served = runtime.block_on(run_server(&config.web, request_logger, shutdown_signal()));
    drop(runtime);

    if let Err(e) = &served {
        error!(error = %e, "Web server stopped with an error");
    }

    info!("Flushing log streams");
    registry.run();

    served.map_err(RunError::WebServer)
}

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
