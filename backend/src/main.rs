// File: backend/src/main.rs
use anyhow::Result;
use floresya_backend::bootstrap;
use floresya_backend::config::ConfigManager;
use floresya_backend::database::Database;
use floresya_backend::logger::AppLogger;
use floresya_backend::web::{start_web_server, AppState};
use service_registry::ServiceRegistry;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let env_filter = EnvFilter::from_default_env()
        .add_directive("floresya_backend=info".parse()?)
        .add_directive("service_registry=info".parse()?)
        .add_directive("tower_http=warn".parse()?)
        .add_directive("hyper=warn".parse()?)
        .add_directive("sqlx=warn".parse()?);

    fmt().with_env_filter(env_filter).init();

    info!("Starting FloresYa backend");

    // Load configuration
    let config_manager = ConfigManager::new("config".to_string()).await?;
    let config = config_manager.get_current_config();

    // Initialize database
    let database = Arc::new(Database::new(&config.database_path).await?);
    info!("Database initialized");

    let logger = Arc::new(AppLogger::default());

    let registry = ServiceRegistry::with_config(config.registry.to_registry_config());
    bootstrap::initialize_registry(
        &registry,
        logger.clone(),
        database.clone(),
        &config.registry,
    )
    .await?;

    let status = bootstrap::service_registry_status(&registry).await;
    info!(
        "Service registry ready: {} services ({} healthy, {} unknown)",
        status.summary.total, status.summary.healthy, status.summary.unknown
    );

    let state = AppState::new(config, registry.clone(), database, logger);
    let result = start_web_server(state, shutdown_signal()).await;

    registry.shutdown().await;
    if let Err(e) = &result {
        error!("Web server stopped with error: {}", e);
    }
    info!("FloresYa backend stopped");
    result
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => error!("Failed to listen for shutdown signal: {}", e),
    }
}
