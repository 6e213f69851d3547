// Service health endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use service_registry::{AllServicesStatus, ServiceStatusReport};
use tracing::info;

use super::common::{not_found, ApiResponse, ApiResult, ServiceAvailability};
use crate::web::AppState;

/// Status of every registered service with per-status counts
pub async fn get_all_services_status(
    State(state): State<AppState>,
) -> ApiResult<AllServicesStatus> {
    let status = state.registry.get_all_services_status().await;
    Ok(Json(ApiResponse::success(status)))
}

pub async fn get_service_status(
    Path(service_name): Path<String>,
    State(state): State<AppState>,
) -> ApiResult<ServiceStatusReport> {
    if !state.registry.is_registered(&service_name).await {
        return Err(not_found(&service_name));
    }
    let report = state.registry.get_service_status(&service_name).await;
    Ok(Json(ApiResponse::success(report)))
}

/// Unknown names are simply unavailable
pub async fn get_service_availability(
    Path(service_name): Path<String>,
    State(state): State<AppState>,
) -> ApiResult<ServiceAvailability> {
    let available = state.registry.is_service_available(&service_name).await;
    Ok(Json(ApiResponse::success(ServiceAvailability {
        service: service_name,
        available,
    })))
}

/// Run one probe now instead of waiting for the next interval
pub async fn run_service_health_check(
    Path(service_name): Path<String>,
    State(state): State<AppState>,
) -> ApiResult<ServiceStatusReport> {
    if !state.registry.is_registered(&service_name).await {
        return Err(not_found(&service_name));
    }

    info!("Manual health check requested for {}", service_name);
    match state.registry.run_health_check(&service_name).await {
        Some(_) => {
            let report = state.registry.get_service_status(&service_name).await;
            Ok(Json(ApiResponse::success(report)))
        }
        None => Err((
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error(format!(
                "Service {} has no health check",
                service_name
            ))),
        )),
    }
}
