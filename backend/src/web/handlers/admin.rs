//! Registry maintenance endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use service_registry::{AllServicesStatus, ServiceStatusReport};
use tracing::{error, info};

use super::common::{not_found, ApiResponse, ApiResult};
use crate::bootstrap;
use crate::web::AppState;

/// Evict the cached instance and reset health; the next resolve rebuilds it
pub async fn reregister_service(
    Path(service_name): Path<String>,
    State(state): State<AppState>,
) -> ApiResult<ServiceStatusReport> {
    if !state.registry.is_registered(&service_name).await {
        return Err(not_found(&service_name));
    }

    state.registry.force_re_register(&service_name).await;
    state.logger.info(
        &format!("Service {} re-registered via admin API", service_name),
        None,
    );

    let report = state.registry.get_service_status(&service_name).await;
    Ok(Json(ApiResponse::success(report)))
}

pub async fn reinitialize_services(State(state): State<AppState>) -> ApiResult<AllServicesStatus> {
    info!("Reinitialization of all services requested");

    if let Err(e) = bootstrap::reinitialize_services(
        &state.registry,
        state.logger.clone(),
        state.database.clone(),
        &state.config.registry,
    )
    .await
    {
        error!("Failed to reinitialize services: {}", e);
        return Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse::error(e.to_string())),
        ));
    }

    let status = bootstrap::service_registry_status(&state.registry).await;
    Ok(Json(ApiResponse::success(status)))
}
