//! AliceNet indexer - Main entry point

use anyhow::Context;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use alicenet_indexer::{
    cli,
    config::{Config, LoggingConfig},
    database,
    metrics::MetricsServer,
    rpc_client::RpcClient,
    Scanner, Stores,
};
use rpc_core::ChainApi;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = cli::parse_args();

    let mut config = match &args.config_path {
        Some(path) => Config::load(path).with_context(|| format!("loading {}", path.display()))?,
        None => Config::default(),
    };
    config.apply_cli_overrides(&args);
    config.validate()?;

    init_logging(&config.logging);
    info!("Starting AliceNet indexer");

    let db = database::connect(&config.database.path, config.database.max_connections)
        .await
        .with_context(|| format!("opening database {}", config.database.path.display()))?;
    info!(path = %config.database.path.display(), "database ready");

    let client = RpcClient::new(&config.chain.api_url, config.chain.request_timeout())
        .context("creating chain API client")?;
    info!(url = %client.base_url(), "chain API client ready");
    let client: Arc<dyn ChainApi> = Arc::new(client);

    let (shutdown_tx, _) = broadcast::channel(1);

    let metrics_task = config.metrics.port.map(|port| {
        let server = MetricsServer::new(port);
        let shutdown_rx = shutdown_tx.subscribe();
        tokio::spawn(async move {
            if let Err(e) = server.start(shutdown_rx).await {
                error!("Metrics server error: {}", e);
            }
        })
    });

    let mut scanner = Scanner::resume(
        client,
        Stores::in_sqlite(&db),
        config.scanner.poll_interval(),
        config.scanner.start_height,
    )
    .await
    .context("loading scanner progress")?;

    let scanner_rx = shutdown_tx.subscribe();
    let signal_tx = shutdown_tx.clone();
    tokio::spawn(async move {
        wait_for_signal().await;
        info!("Received shutdown signal");
        let _ = signal_tx.send(());
    });

    scanner.run(scanner_rx).await;

    // The scanner may also stop on its own; make sure everything else follows.
    let _ = shutdown_tx.send(());
    if let Some(task) = metrics_task {
        if let Err(e) = task.await {
            warn!("Metrics task ended abnormally: {}", e);
        }
    }
    db.close().await;

    info!(highest = scanner.highest(), "AliceNet indexer stopped");
    Ok(())
}

fn init_logging(logging: &LoggingConfig) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    if logging.json {
        fmt().json().with_env_filter(filter).with_target(true).init();
    } else {
        fmt().with_env_filter(filter).with_target(true).with_thread_ids(true).init();
    }
}

async fn wait_for_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
