// File: backend/src/web/mod.rs
pub mod handlers;
pub mod server;

pub use server::{create_router, start_web_server};

use std::sync::Arc;

use crate::config::Config;
use crate::database::Database;
use crate::logger::AppLogger;
use service_registry::ServiceRegistry;

// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub registry: ServiceRegistry,
    // Kept for re-running the bootstrap from the admin endpoint
    pub database: Arc<Database>,
    pub logger: Arc<AppLogger>,
}

impl AppState {
    pub fn new(
        config: Arc<Config>,
        registry: ServiceRegistry,
        database: Arc<Database>,
        logger: Arc<AppLogger>,
    ) -> Self {
        Self {
            config,
            registry,
            database,
            logger,
        }
    }
}
