// File: backend/src/web/server.rs
use crate::web::{handlers, AppState};
use anyhow::Result;
use axum::{
    routing::{get, post},
    Router,
};
use std::future::Future;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Serve the API until `shutdown` resolves
pub async fn start_web_server<F>(state: AppState, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = format!("{}:{}", state.config.host, state.config.port);
    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server running on http://{}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        // === SERVICE HEALTH ROUTES ===
        .route(
            "/api/health/services",
            get(handlers::get_all_services_status),
        )
        .route(
            "/api/health/services/{service_name}",
            get(handlers::get_service_status),
        )
        .route(
            "/api/health/services/{service_name}/available",
            get(handlers::get_service_availability),
        )
        .route(
            "/api/health/services/{service_name}/check",
            post(handlers::run_service_health_check),
        )
        // === REGISTRY ADMIN ROUTES ===
        .route(
            "/api/admin/services/reinitialize",
            post(handlers::reinitialize_services),
        )
        .route(
            "/api/admin/services/{service_name}/reregister",
            post(handlers::reregister_service),
        )
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
