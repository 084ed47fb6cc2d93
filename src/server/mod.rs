// src/server/mod.rs
//! installhub HTTP server
//!
//! Serves the installation endpoints:
//! - `/package/` agent package location for a platform
//! - `/template/<category>/<name>/` most specific configuration template
//! - `/broker/` broker ID for an agent mode
//! - `/install/`, `/install/config/`, `/install/rpm/` installer files
//! - `/tool/` versioned tool download redirect
//! - `/packages/` locally hosted agent packages (optional)

mod handlers;
mod local_index;
pub mod metrics;
mod routes;

pub use local_index::{Release, releases, scan_packages, update_local_index};
pub use metrics::{MetricsSnapshot, ServerMetrics};
pub use routes::create_router;

use crate::broker::BrokerSelector;
use crate::config::HubConfig;
use crate::descriptor::Validators;
use crate::packages::PackageRegistry;
use crate::templates::Templates;
use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinSet;

/// Description reported by `/`
pub const SERVER_DESCRIPTION: &str = "installhub one step install server";

/// Shared server state
///
/// Everything here is either immutable after startup or internally
/// synchronized, so handlers share it without an outer lock.
pub struct ServerState {
    pub config: HubConfig,
    pub validators: Arc<Validators>,
    pub templates: Templates,
    pub packages: PackageRegistry,
    pub brokers: BrokerSelector,
    pub metrics: ServerMetrics,
}

pub type SharedState = Arc<ServerState>;

impl ServerState {
    /// Compile validators and load templates and the package registry
    pub fn new(config: HubConfig) -> Result<Self> {
        let validators = Arc::new(
            Validators::compile(&config.validators).context("compiling validators")?,
        );

        let templates = Templates::new(
            config.template_dir(),
            Arc::clone(&validators),
            config.server.enable_template_cache,
        )
        .context("initializing templates")?;

        let package_file = config.package_config_file();
        let packages = PackageRegistry::load(&package_file, &config.content.package_base_url)
            .with_context(|| format!("initializing package list from {}", package_file.display()))?;

        let brokers = BrokerSelector::from_config(&config.brokers);

        Ok(Self {
            config,
            validators,
            templates,
            packages,
            brokers,
            metrics: ServerMetrics::new(),
        })
    }
}

/// Run the server until Ctrl-C or SIGTERM
pub async fn run_server(config: HubConfig) -> Result<()> {
    let addrs = config.listen_addrs()?;
    tracing::info!("Content root: {:?}", config.content.root);
    tracing::info!(
        "Template cache: {}",
        if config.server.enable_template_cache { "enabled" } else { "disabled" }
    );

    if config.content.local_packages {
        let dir = config.local_package_dir();
        update_local_index(&dir, &config.content.local_package_prefix)
            .with_context(|| format!("updating local package index in {}", dir.display()))?;
    }

    let state = Arc::new(ServerState::new(config)?);
    tracing::info!(
        "Package registry: {} supported platforms",
        state.packages.list_supported().len()
    );

    let app = create_router(state);
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let mut servers = JoinSet::new();

    for addr in addrs {
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("binding {}", addr))?;
        tracing::info!("Listening on {}", addr);

        let app = app.clone();
        let mut shutdown = shutdown_rx.clone();
        servers.spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown.changed().await;
                })
                .await
        });
    }

    tracing::info!("installhub is ready to serve");

    let early_exit = tokio::select! {
        _ = shutdown_signal() => {
            tracing::info!("Received shutdown signal");
            None
        }
        Some(res) = servers.join_next() => Some(res),
    };

    let _ = shutdown_tx.send(true);
    if let Some(res) = early_exit {
        res.context("listener task failed")?.context("listener stopped")?;
    }
    while let Some(res) = servers.join_next().await {
        res.context("listener task failed")?.context("listener stopped")?;
    }

    tracing::info!("installhub stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
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
