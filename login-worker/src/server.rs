use std::future::ready;

use axum::{routing, Router};
use login_common::health::HealthRegistry;
use login_common::metrics::setup_metrics_routes;
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::net::TcpListener;

use crate::error::WorkerError;

pub fn app(liveness: HealthRegistry, metrics: Option<PrometheusHandle>) -> Router {
    let router = Router::new()
        .route("/", routing::get(index))
        .route("/_readiness", routing::get(index))
        .route(
            "/_liveness",
            routing::get(move || ready(liveness.get_status())),
        );

    setup_metrics_routes(router, metrics)
}

pub async fn index() -> &'static str {
    "login worker"
}

/// Bind the health and metrics listener, failing startup if the address is unavailable.
pub async fn listen(bind: &str) -> Result<TcpListener, WorkerError> {
    TcpListener::bind(bind)
        .await
        .map_err(|error| WorkerError::ServerError {
            bind: bind.to_owned(),
            error,
        })
}
