//! Process startup for the two services.

use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};

use videopalace_infra::{SeedOutcome, ServiceConfig};

use crate::app::services::{self, Broker};
use crate::app::{build_catalog_app, build_inventory_app};

/// Resolves on Ctrl-C (and SIGTERM on unix).
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
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
    info!("shutdown signal received");
}

pub async fn run_catalog(config: ServiceConfig) -> anyhow::Result<()> {
    let broker = Broker::from_config(&config).await?;
    let services = Arc::new(services::build_catalog_services(&config, &broker).await?);

    if config.is_development() {
        // Seeding is abandoned (not rolled back) if shutdown arrives first.
        tokio::select! {
            outcome = services.seeder.seed_if_empty() => match outcome {
                Ok(SeedOutcome::Seeded { count }) => info!(count, "sample catalog seeded"),
                Ok(SeedOutcome::Skipped) => {}
                Err(e) => warn!(error = %e, "catalog seeding failed"),
            },
            _ = shutdown_signal() => return Ok(()),
        }
    }

    let app = build_catalog_app(services);
    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    info!(service = %config.service_name, addr = %listener.local_addr()?, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

pub async fn run_inventory(config: ServiceConfig) -> anyhow::Result<()> {
    let broker = Broker::from_config(&config).await?;
    let services = Arc::new(services::build_inventory_services(&config).await?);
    let worker = services::spawn_inventory_worker(&config, &broker, services.store.clone()).await?;

    let app = build_inventory_app(services);
    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    info!(service = %config.service_name, addr = %listener.local_addr()?, "listening");

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    if let Some(worker) = worker {
        worker.shutdown().await;
    }
    served?;
    Ok(())
}
