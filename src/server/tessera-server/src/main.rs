//! Tessera Server - Main entry point.

use std::sync::Arc;

use clap::Parser;
use tessera_kms::KmsEngine;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;

#[derive(Parser)]
#[command(name = "tessera-server")]
#[command(about = "Nubster Tessera - in-memory cloud KMS emulator")]
#[command(version)]
struct Cli {
    /// Server bind address
    #[arg(long, default_value = "127.0.0.1:8080", env = "TESSERA_BIND_ADDRESS")]
    bind: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    tracing::info!("Starting Tessera server...");
    tracing::info!("Bind address: {}", cli.bind);
    tracing::warn!("Keys are held in memory only and are lost on shutdown");

    let engine = Arc::new(KmsEngine::new());
    let app = api::router(engine);

    let listener = tokio::net::TcpListener::bind(&cli.bind).await?;
    tracing::info!("Tessera server started successfully");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutting down...");
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
