//! Shelf application library
//!
//! Wires the lending ledger modules onto the shared world state and serves
//! them over HTTP.

use std::sync::Arc;

use anyhow::Context;
use shelf_db::MemoryWorldState;
use shelf_kernel::{settings::Settings, InitCtx, ModuleRegistry};

pub mod modules;

/// Build the module registry over a fresh in-memory world state
pub fn build_registry(settings: &Settings) -> anyhow::Result<ModuleRegistry> {
    let state = Arc::new(MemoryWorldState::new());
    let mut registry = ModuleRegistry::new();
    modules::register_all(&mut registry, settings, state)?;
    Ok(registry)
}

/// Run the application until ctrl-c
pub async fn run(settings: Settings) -> anyhow::Result<()> {
    shelf_telemetry::init(&settings.telemetry).context("failed to initialize telemetry")?;

    tracing::info!(
        env = ?settings.environment,
        address = %settings.server.bind_address(),
        "shelf-app bootstrap starting"
    );

    let registry = build_registry(&settings)?;
    let ctx = InitCtx {
        settings: &settings,
    };

    registry.init_all(&ctx).await?;
    registry.start_all(&ctx).await?;
    tracing::info!(modules = registry.len(), "shelf-app bootstrap complete");

    let served = shelf_http::start_server(&registry, &settings, shutdown_signal()).await;

    registry.stop_all().await?;
    served
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
