use std::time::Duration;

use anyhow::{Context, Result};
use axum::Router;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;

use crate::api;
use crate::state::SharedState;

pub fn build_router(state: SharedState) -> Router {
    api::api_router()
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve until Ctrl-C, saving periodically and once more on the way out.
pub async fn start_server(state: SharedState) -> Result<()> {
    let listener = TcpListener::bind(&state.config.bind)
        .await
        .with_context(|| format!("Failed to bind to {}", state.config.bind))?;
    tracing::info!(addr = %listener.local_addr()?, "Finfolio listening");

    if !state.config.persists() {
        tracing::warn!("No passphrase configured; changes are kept in memory only");
    }
    let autosave = spawn_autosave(state.clone());

    axum::serve(listener, build_router(state.clone()))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    autosave.abort();
    if state.save_if_dirty().await? {
        tracing::info!(path = %state.config.data_file.display(), "Saved on shutdown");
    }
    Ok(())
}

fn spawn_autosave(state: SharedState) -> JoinHandle<()> {
    let period = Duration::from_secs(state.config.autosave_secs.max(1));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        // The first tick fires immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            match state.save_if_dirty().await {
                Ok(true) => tracing::debug!("Autosaved"),
                Ok(false) => {}
                Err(e) => tracing::error!(error = %format!("{e:#}"), "Autosave failed"),
            }
        }
    })
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Cannot listen for Ctrl-C; stop the process to exit");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
