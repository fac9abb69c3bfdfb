//! Bookshelf application library
//!
//! Wires the book catalog module into the kernel registry and serves it over
//! HTTP. Both the `bookshelf-app` binary and the CLI's `serve` command go
//! through [`run`].

pub mod modules;
pub mod utils;

use anyhow::Context;
use bookshelf_kernel::{settings::Settings, InitCtx, ModuleRegistry};

/// Build a registry with every application module registered
pub fn build_registry(settings: &Settings) -> anyhow::Result<ModuleRegistry> {
    let mut registry = ModuleRegistry::new();
    modules::register_all(&mut registry, settings)?;
    Ok(registry)
}

/// Initialize modules, serve until Ctrl-C, then stop modules in reverse order
pub async fn run(settings: Settings) -> anyhow::Result<()> {
    let registry = build_registry(&settings)?;
    let ctx = InitCtx {
        settings: &settings,
    };

    registry.init_all(&ctx).await?;
    registry.start_all(&ctx).await?;

    let served = bookshelf_http::start_server(&registry, &settings, shutdown_signal()).await;

    registry
        .stop_all()
        .await
        .context("failed to stop modules cleanly")?;
    served
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        // Without a signal handler there is no way to stop gracefully; keep serving.
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
