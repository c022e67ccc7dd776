//! LinkPet client daemon
//!
//! Keeps one pet view alive in the background:
//! - Polls the LinkPet backend and extrapolates the hatch countdown
//! - Tracks unread diary entries and the hatch hand-off
//! - IPC server for UI clients
//!
//! Storage locations:
//! - Linux: ~/.local/share/linkpet/
//! - Windows: %APPDATA%\linkpet\
//! - MacOS: ~/Library/Application Support/linkpet/

use std::sync::Arc;

use linkpet::engine::Engine;
use tokio::net::TcpListener;
use tracing::{error, info};

mod backend;
mod backoff;
mod config;
mod driver;
mod ipc;
mod paths;
mod surface;

use backend::HttpBackend;
use config::ClientConfig;
use paths::AppPaths;
use surface::LogSurface;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let paths = AppPaths::new()?;
    info!("Data directory: {:?}", paths.data_dir());

    let config = ClientConfig::load(&paths.config_file())?.with_env_overrides()?;
    info!(api = %config.api_base_url, user = ?config.user_id, "configuration loaded");

    let backend = HttpBackend::new(
        config.api_base_url.clone(),
        config.user_id.clone(),
        config.request_timeout(),
    )?;
    let engine = Engine::new(config.engine_config(), config.session_flags());
    let (handle, mut task) = driver::spawn(
        config.driver_config(),
        engine,
        Arc::new(backend),
        Box::new(LogSurface::new(config.auto_claim)),
    );
    handle.start_polling().await?;

    // Log status and hand-off changes, not every tick.
    let mut views = handle.subscribe();
    tokio::spawn(async move {
        let mut last = None;
        while views.changed().await.is_ok() {
            let view = views.borrow_and_update().clone();
            let key = (view.status, view.phase, view.route);
            if last != Some(key) {
                info!(
                    status = ?view.status,
                    phase = ?view.phase,
                    route = ?view.route,
                    percent = view.percent,
                    "pet state"
                );
                last = Some(key);
            }
        }
    });

    {
        let handle = handle.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Ctrl-C: shutting down");
                handle.shutdown().await;
            }
        });
    }

    let listener = TcpListener::bind(&config.listen_addr).await?;
    info!("linkpetd listening on {}", config.listen_addr);

    tokio::select! {
        result = ipc::serve(listener, handle.clone()) => {
            if let Err(e) = result {
                error!("IPC server failed: {}", e);
            }
            handle.shutdown().await;
            let _ = task.await;
        }
        result = &mut task => {
            if let Err(e) = result {
                error!("driver task failed: {}", e);
            }
        }
    }

    info!("linkpetd exited");
    Ok(())
}
