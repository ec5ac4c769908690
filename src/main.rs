#[macro_use]
extern crate tracing;

use crate::{
    cert_cache::CertCache, configs::GlobalConfig, fetcher::Fetcher, metrics::CacheMetrics,
    server::CertServer,
};
use anyhow::{Context, Result as AnyResult};
use std::{num::NonZeroUsize, sync::Arc};
use tokio_util::sync::CancellationToken;

mod cert_cache;
mod configs;
mod error;
mod fetcher;
mod metrics;
mod server;
mod types;

#[cfg(test)]
mod test_upstream;

fn main() -> AnyResult<()> {
    // Load environment variables from the `.env` file
    dotenvy::dotenv().ok();
    // Initialize the logger after loading the environment variables
    tracing_subscriber::fmt::init();

    let app_config = GlobalConfig::load_config().context("Failed to parse configuration files")?;

    // Setup async runtime
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    if let Some(worker) = app_config.workers.and_then(NonZeroUsize::new) {
        runtime_builder.worker_threads(worker.into());
    }
    runtime_builder
        .enable_all()
        .build()
        .context("Failed to bootstrap the Tokio runtime")?
        .block_on(server_loop(app_config))
}

async fn server_loop(app_config: GlobalConfig) -> AnyResult<()> {
    let cancel = CancellationToken::new();
    tokio::spawn(shutdown_signal(cancel.clone()));

    let fetcher = Fetcher::new(&app_config.source.url, app_config.source.timeout)?;
    let cache = match CertCache::initialize(
        fetcher,
        app_config.refresh.interval,
        CacheMetrics::new()?,
        cancel.clone(),
    )
    .await
    {
        Ok(cache) => Arc::new(cache),
        Err(e) => {
            error!("Could not construct the certificate cache: {:?}", e.reason());
            return Err(e.into());
        }
    };
    let refresh_task = cache.spawn_refresh_loop();

    let result = CertServer::new(cache)
        .run(app_config.listen, cancel.clone())
        .await;
    if let Err(e) = &result {
        error!("Server died unexpectedly: {:?}", e);
    } else {
        info!("Server shutting down");
    }

    cancel.cancel();
    refresh_task.await?;
    result
}

async fn shutdown_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
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
        _ = ctrl_c => {},
        _ = terminate => {},
        _ = cancel.cancelled() => return,
    }
    info!("Shutdown requested");
    cancel.cancel();
}
