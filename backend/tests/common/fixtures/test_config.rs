//! Configuration and application state builders

use floresya_backend::config::{Config, RegistrySettings};
use floresya_backend::database::Database;
use floresya_backend::logger::AppLogger;
use floresya_backend::web::AppState;
use service_registry::ServiceRegistry;
use std::sync::Arc;

pub fn test_config() -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        database_path: ":memory:".to_string(),
        registry: RegistrySettings::default(),
    }
}

/// Registry with every backend service registered against `database`
pub async fn bootstrapped_registry(database: Arc<Database>) -> ServiceRegistry {
    let registry = ServiceRegistry::new();
    floresya_backend::bootstrap::initialize_registry(
        &registry,
        Arc::new(AppLogger::new("test")),
        database,
        &RegistrySettings::default(),
    )
    .await
    .expect("bootstrap should succeed");
    registry
}

pub async fn test_app_state(database: Arc<Database>) -> AppState {
    let registry = bootstrapped_registry(database.clone()).await;
    AppState::new(
        Arc::new(test_config()),
        registry,
        database,
        Arc::new(AppLogger::new("test")),
    )
}
