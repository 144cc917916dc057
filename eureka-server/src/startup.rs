//! Tracing setup and server lifecycle

use crate::config::ServerConfig;
use crate::http::{create_router, AppState};
use eureka_eye::{ModelLoader, YoloeDetector};
use std::sync::Arc;
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber. `RUST_LOG` overrides the default
/// `info` level.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // A second call (tests, embedding) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// Load the detector described by `config` through `loader`.
pub fn build_detector(config: &ServerConfig, loader: Arc<dyn ModelLoader>) -> anyhow::Result<Arc<YoloeDetector>> {
    let detector = YoloeDetector::new(loader, config.detector_config())?;
    Ok(Arc::new(detector))
}

/// Bind and serve until Ctrl+C or SIGTERM.
pub async fn serve(config: ServerConfig, loader: Arc<dyn ModelLoader>) -> anyhow::Result<()> {
    config.validate()?;
    let addr = config.bind_addr()?;

    // Weight loading is blocking file IO.
    let detector = {
        let config = config.clone();
        let loader = loader.clone();
        tokio::task::spawn_blocking(move || build_detector(&config, loader)).await??
    };

    let app = create_router(AppState::new(detector, loader), config.server.max_upload_bytes);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("EurekAnno vision server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(wait_for_shutdown())
        .await?;

    info!("Server stopped");
    Ok(())
}

/// Wait for shutdown signal
async fn wait_for_shutdown() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
