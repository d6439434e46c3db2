//! Soroban IDE backend — entry point.
//!
//! Serves the project CRUD API and the compile/deploy pass-through routes
//! consumed by the browser IDE.

use std::sync::Arc;

use reqwest::Client;
use tracing::info;
use tracing_subscriber::EnvFilter;

use ide_server::compiler::CargoCompiler;
use ide_server::config::Config;
use ide_server::deployer::StellarCliDeployer;
use ide_server::{db, router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load optional .env file (ignored if missing) before RUST_LOG is read.
    let _ = dotenvy::dotenv();

    // Initialise structured logging (RUST_LOG controls verbosity).
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = Config::from_env().map_err(|e| anyhow::anyhow!("{e}"))?;

    // Set up the SQLite connection pool and run migrations.
    let pool = db::init_pool(&config.database_url).await?;

    // Shared by the deployer and the network status route.
    let client = Client::builder()
        .timeout(std::time::Duration::from_secs(30))
        .build()?;

    let state = Arc::new(AppState {
        pool,
        compiler: Arc::new(CargoCompiler::from_config(&config)),
        deployer: Arc::new(StellarCliDeployer::new(&config, client.clone())),
        client,
        config: config.clone(),
    });

    let addr = format!("0.0.0.0:{}", config.port);
    info!("API listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("Shutdown signal received");
}
