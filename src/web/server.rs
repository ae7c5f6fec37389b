use axum::{routing::get, Router};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use crate::config::WebConfig;
use crate::handler::{with_request_logging, RequestLogger};
use crate::ingestion::IngestionClient;

use super::api::{health_check, index};

/// Demo routes, without request logging
pub fn create_router() -> Router {
    Router::new()
        .route("/", get(index))
        .route("/_ah/health", get(health_check))
}

/// Serve the demo routes until `shutdown` resolves, shipping a summary entry
/// for every request through `logger`.
pub async fn run_server<C, F>(
    web_config: &WebConfig,
    logger: Arc<RequestLogger<C>>,
    shutdown: F,
) -> std::io::Result<()>
where
    C: IngestionClient,
    F: Future<Output = ()> + Send + 'static,
{
    let app = with_request_logging(create_router(), logger);

    let listener = tokio::net::TcpListener::bind(&web_config.listen).await?;
    tracing::info!("Web server listening on {}", web_config.listen);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        shutdown.await;
        tracing::info!("Web server shutting down gracefully");
    })
    .await
}
