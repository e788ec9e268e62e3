//! Consume login events from a `PgQueue`, pseudonymize them and write them to `user_logins`.
use envconfig::Envconfig;
use login_common::health::HealthRegistry;
use login_common::metrics::{serve, setup_metrics_recorder};
use login_common::pgqueue::PgQueue;
use login_common::transform::RecordTransformer;
use login_worker::config::Config;
use login_worker::error::WorkerError;
use login_worker::loader::PgLoader;
use login_worker::server::{app, listen};
use login_worker::worker::LoginWorker;
use tokio::signal::unix::SignalKind;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

fn setup_tracing() {
    let log_layer = tracing_subscriber::fmt::layer().with_filter(EnvFilter::from_default_env());
    tracing_subscriber::registry().with(log_layer).init();
}

async fn wait_for_shutdown_signal() -> Result<(), std::io::Error> {
    let mut sigterm = tokio::signal::unix::signal(SignalKind::terminate())?;

    tokio::select! {
        _ = tokio::signal::ctrl_c() => info!("received SIGINT"),
        _ = sigterm.recv() => info!("received SIGTERM"),
    }

    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), WorkerError> {
    setup_tracing();

    let config = Config::init_from_env()?;

    let liveness = HealthRegistry::new("liveness");
    let worker_liveness = liveness.register(
        "worker".to_string(),
        time::Duration::try_from(config.liveness_deadline.0)
            .unwrap_or(time::Duration::seconds(30)),
    );

    let queue = PgQueue::new(
        config.queue_table.as_str(),
        &config.worker_name,
        &config.queue_database_url,
        config.max_queue_connections,
    )
    .await?;
    let loader = PgLoader::from_url(&config.database_url)?;
    let transformer = RecordTransformer::new(config.salt_ip.clone(), config.salt_device_id.clone());

    let mut worker = LoginWorker::new(
        queue,
        loader,
        transformer,
        config.poll_interval.0,
        config.progress_report_every,
        worker_liveness,
    );

    let recorder_handle = setup_metrics_recorder()?;
    let router = app(liveness, Some(recorder_handle));
    let bind = config.bind();
    let listener = listen(&bind).await?;
    info!("serving health and metrics on {}", bind);
    tokio::spawn(async move {
        if let Err(e) = serve(listener, router).await {
            error!("health and metrics server stopped: {}", e);
        }
    });

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        match wait_for_shutdown_signal().await {
            Ok(()) => signal_token.cancel(),
            Err(e) => error!("failed to install signal handlers: {}", e),
        }
    });

    worker.run(shutdown).await;

    Ok(())
}
