//! # janken-server
//!
//! Server binary: loads settings, wires the registry, push transport, and
//! orchestrator together, and serves HTTP until signalled.

#![deny(unsafe_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use janken_fanout::{BroadcastOrchestrator, DispatchConfig, FanoutDispatcher, OrchestratorConfig};
use janken_push::{HttpPushClient, PushConfig, SessionCache};
use janken_registry::{ConnectionRegistry, MemoryRegistry, SqliteConfig, SqliteRegistry};
use janken_server::config::ServerConfig;
use janken_server::server::JankenServer;
use janken_server::{logging, metrics, shutdown};
use janken_settings::{JankenSettings, RegistryBackend};

/// Janken Hockey broadcast server.
#[derive(Parser, Debug)]
#[command(name = "janken-server", about = "Janken Hockey broadcast server")]
struct Cli {
    /// Host to bind (overrides settings).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind (overrides settings; 0 for auto-assign).
    #[arg(long)]
    port: Option<u16>,

    /// Settings file (default `~/.janken/settings.json`).
    #[arg(long)]
    settings: Option<PathBuf>,
}

fn load_settings(args: &Cli) -> Result<JankenSettings> {
    let path = args
        .settings
        .clone()
        .unwrap_or_else(janken_settings::settings_path);
    let mut settings = janken_settings::load_settings_from_path(&path)
        .with_context(|| format!("Failed to load settings from {}", path.display()))?;

    if let Some(host) = &args.host {
        settings.server.host.clone_from(host);
    }
    if let Some(port) = args.port {
        settings.server.port = port;
    }
    Ok(settings)
}

fn open_registry(settings: &JankenSettings) -> Result<Arc<dyn ConnectionRegistry>> {
    match settings.registry.backend {
        RegistryBackend::Memory => {
            tracing::info!("using in-memory connection registry");
            Ok(Arc::new(MemoryRegistry::new()))
        }
        RegistryBackend::Sqlite => {
            let path = janken_settings::resolve_data_path(&settings.registry.sqlite_path);
            let config = SqliteConfig {
                pool_size: settings.registry.pool_size,
                ..SqliteConfig::default()
            };
            let registry = SqliteRegistry::open(&path, &config)
                .with_context(|| format!("Failed to open registry at {}", path.display()))?;
            tracing::info!(path = %path.display(), "using sqlite connection registry");
            Ok(Arc::new(registry))
        }
    }
}

fn build_orchestrator(
    settings: &JankenSettings,
    registry: Arc<dyn ConnectionRegistry>,
    session: Arc<SessionCache>,
) -> BroadcastOrchestrator {
    let push = HttpPushClient::with_session(
        PushConfig {
            base_url: settings.push.base_url(),
            auth_token: settings.push.auth_token.clone(),
            timeout: Duration::from_millis(settings.push.timeout_ms),
        },
        session,
    );
    tracing::info!(?push, "push transport configured");

    let dispatcher = FanoutDispatcher::new(
        Arc::new(push),
        DispatchConfig {
            deadline: Duration::from_millis(settings.fanout.deadline_ms),
            max_in_flight: settings.fanout.max_in_flight,
        },
    );

    BroadcastOrchestrator::new(
        registry,
        dispatcher,
        OrchestratorConfig {
            default_display_name: settings.matchmaking.default_display_name.clone(),
            cleanup_stale: settings.fanout.cleanup_stale_connections,
        },
    )
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    let settings = load_settings(&args)?;
    logging::init_subscriber(&settings.logging.level, settings.logging.json);
    let settings = janken_settings::init_settings(settings);

    let metrics_handle =
        metrics::install_recorder().context("Failed to install metrics recorder")?;

    let registry = open_registry(&settings)?;
    let session = SessionCache::new(Duration::from_millis(settings.push.timeout_ms));
    let orchestrator = Arc::new(build_orchestrator(&settings, registry, session.clone()));

    let server = JankenServer::new(ServerConfig::from(&settings.server), orchestrator.clone())
        .with_metrics(metrics_handle);
    let (addr, handle) = server.listen().await.context("Failed to bind server")?;
    tracing::info!("Janken server listening on http://{addr}");

    shutdown::wait_for_signal().await;

    tracing::info!("Shutting down...");
    let timeout = server.config().shutdown_timeout;
    let _ = server
        .shutdown()
        .graceful_shutdown(vec![handle], Some(timeout))
        .await;
    let _ = orchestrator.drain_cleanup(timeout).await;
    // Deferred until the last in-flight delivery releases its lease.
    session.close();

    tracing::info!("Shutdown complete");
    Ok(())
}
