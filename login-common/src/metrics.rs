use axum::{routing::get, Router};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use tokio::net::TcpListener;

/// Serve a `Router` on an already bound `TcpListener`, so bind errors surface at startup.
pub async fn serve(listener: TcpListener, router: Router) -> Result<(), std::io::Error> {
    axum::serve(listener, router).await?;

    Ok(())
}

/// Add a `/metrics` route to `router`, rendering the given recorder when installed.
pub fn setup_metrics_routes(router: Router, recorder_handle: Option<PrometheusHandle>) -> Router {
    router.route(
        "/metrics",
        get(move || match recorder_handle {
            Some(ref recorder_handle) => std::future::ready(recorder_handle.render()),
            None => std::future::ready("no metrics recorder installed".to_owned()),
        }),
    )
}

/// Install the global Prometheus recorder. Can only succeed once per process.
pub fn setup_metrics_recorder() -> Result<PrometheusHandle, BuildError> {
    const EXPONENTIAL_SECONDS: &[f64] = &[
        0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
    ];

    PrometheusBuilder::new()
        .set_buckets(EXPONENTIAL_SECONDS)?
        .install_recorder()
}
