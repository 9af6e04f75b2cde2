pub mod api;
pub mod config;
pub mod db;
pub mod models;
pub mod patients;

use tracing_subscriber::EnvFilter;

/// Initialize logging, open the database and serve the API until ctrl-c.
pub async fn run() -> Result<(), String> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    std::fs::create_dir_all(config::app_data_dir())
        .map_err(|e| format!("Cannot create data directory: {e}"))?;

    // Open once up front: creates the file and runs migrations, failing
    // fast on a broken store.
    let db_path = config::database_path();
    db::open_database(&db_path).map_err(|e| format!("Cannot open database: {e}"))?;

    let addr: std::net::SocketAddr = config::DEFAULT_BIND_ADDR
        .parse()
        .map_err(|e| format!("Bad bind address: {e}"))?;

    let ctx = api::ApiContext::new(db_path);
    let mut server = api::start_server(ctx, addr).await?;

    tracing::info!(addr = %server.addr, "ready, press ctrl-c to stop");

    tokio::signal::ctrl_c()
        .await
        .map_err(|e| format!("Failed to listen for ctrl-c: {e}"))?;

    server.shutdown();
    Ok(())
}
