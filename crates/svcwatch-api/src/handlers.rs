//! REST API handlers.
//!
//! Each handler reads from the shared `HealthMonitor` and returns JSON
//! responses.

use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use tracing::debug;

use svcwatch_health::{ServiceInfo, ServiceKind, ServiceStatus};

use crate::prometheus::render_prometheus;
use crate::ApiState;

/// Response wrapper for consistent API format.
#[derive(Serialize)]
struct ApiResponse<T: Serialize> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
            error: None,
        })
    }
}

fn error_response(msg: &str, status: StatusCode) -> impl IntoResponse {
    (
        status,
        Json(ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(msg.to_string()),
        }),
    )
}

/// JSON view of a registered service.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceView {
    pub name: String,
    pub endpoint: String,
    pub kind: ServiceKind,
    pub interval_ms: u64,
    pub running: bool,
    pub available: bool,
    pub transitions: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_status: Option<ServiceStatus>,
}

impl From<ServiceInfo> for ServiceView {
    fn from(info: ServiceInfo) -> Self {
        Self {
            name: info.name,
            endpoint: info.endpoint,
            kind: info.kind,
            interval_ms: u64::try_from(info.check_interval.as_millis()).unwrap_or(u64::MAX),
            running: info.armed,
            available: info.available,
            transitions: info.transitions,
            last_status: info.last_status,
        }
    }
}

/// GET /api/v1/services
pub async fn list_services(State(state): State<ApiState>) -> impl IntoResponse {
    let services: Vec<ServiceView> = state
        .monitor
        .services()
        .into_iter()
        .map(ServiceView::from)
        .collect();
    ApiResponse::ok(services)
}

/// GET /api/v1/services/{name}
pub async fn get_service(
    State(state): State<ApiState>,
    Path(name): Path<String>,
) -> impl IntoResponse {
    match state.monitor.service(&name) {
        Some(info) => ApiResponse::ok(ServiceView::from(info)).into_response(),
        None => error_response("service not found", StatusCode::NOT_FOUND).into_response(),
    }
}

/// POST /api/v1/services/{name}/check
pub async fn check_service(
    State(state): State<ApiState>,
    Path(name): Path<String>,
) -> impl IntoResponse {
    if !state.monitor.contains(&name) {
        return error_response("service not found", StatusCode::NOT_FOUND).into_response();
    }
    match state.monitor.check_service(&name).await {
        Some(status) => ApiResponse::ok(status).into_response(),
        None => {
            debug!(service = %name, "on-demand check dropped, another check is in flight");
            error_response("a check is already in flight", StatusCode::CONFLICT).into_response()
        }
    }
}

/// GET /metrics
pub async fn prometheus_metrics(State(state): State<ApiState>) -> impl IntoResponse {
    let body = render_prometheus(&state.monitor.services());
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    )
}
