pub mod config;
pub mod error;
pub mod service;
pub mod store;
pub mod telemetry;

use axum::Router;
use config::ServerConfig;
use core::future::{Future, IntoFuture};
use service::{PickerService, handler::router};
use std::sync::Arc;
use store::DirectoryStore;
use tokio::{net::TcpListener, sync::Notify};

/// Builds a fresh store and the router serving it.
pub fn app(config: &ServerConfig) -> Router {
    let store = DirectoryStore::shared(config.base_max);
    let service = PickerService::new(store, config);
    router(service, config.static_dir.as_deref())
}

/// Serves the picker API on `listener` until `shutdown` resolves.
///
/// After the shutdown signal, in-flight requests get `shutdown_timeout` to
/// finish before the server stops waiting for them.
pub async fn serve<F>(listener: TcpListener, config: ServerConfig, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = app(&config);
    let stopping = Arc::new(Notify::new());
    let signal = {
        let stopping = Arc::clone(&stopping);
        async move {
            shutdown.await;
            tracing::info!("Shutdown signal received, draining in-flight requests");
            stopping.notify_one();
        }
    };

    let server = axum::serve(listener, app)
        .with_graceful_shutdown(signal)
        .into_future();
    tokio::pin!(server);

    tokio::select! {
        res = &mut server => res,
        () = async {
            stopping.notified().await;
            tokio::time::sleep(config.shutdown_timeout).await;
        } => {
            tracing::warn!(
                timeout = ?config.shutdown_timeout,
                "In-flight requests did not finish before the shutdown timeout"
            );
            Ok(())
        }
    }
}
