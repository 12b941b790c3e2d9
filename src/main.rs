// Main entry point - Dependency injection and session setup
mod domain;
mod application;
mod infrastructure;
mod presentation;

use std::sync::Arc;
use anyhow::Context;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use crate::application::dashboard_session::DashboardSession;
use crate::application::ingestion_coordinator::IngestionCoordinator;
use crate::domain::viewport::Breakpoint;
use crate::infrastructure::config::load_dashboard_config;
use crate::infrastructure::relay_http_client::RelayHttpClient;
use crate::infrastructure::ws_transport::WsTransport;
use crate::presentation::console_commands::{spawn_console_commands, USAGE};
use crate::presentation::console_view::ConsoleView;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = load_dashboard_config().context("Failed to load dashboard configuration")?;

    // Relay adapters (infrastructure layer)
    let relay = Arc::new(RelayHttpClient::new(config.server.clone()));
    let transport = WsTransport::connect(&config.server)
        .await
        .with_context(|| format!("Failed to connect to {}", config.server.socket_url()))?;

    // Console input and view (presentation layer)
    let (commands_tx, commands_rx) = mpsc::unbounded_channel();
    let view = ConsoleView::new(Breakpoint::default(), commands_tx.clone());
    spawn_console_commands(commands_tx);
    tracing::info!("{}", USAGE);

    // Ingestion pipeline (application layer)
    let coordinator = IngestionCoordinator::new(&config.playback, config.window);
    let mut session = DashboardSession::new(
        coordinator,
        transport,
        view,
        relay.clone(),
        relay,
        commands_rx,
    );

    session.run().await
}
