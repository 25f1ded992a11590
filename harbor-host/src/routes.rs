//! Health and resource endpoints served next to the application host.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use harbor_core::{
    AppHost, HealthCheckRegistry, InProcResourceNotifications,
    health::{HealthReport, HealthStatus},
};
use harbor_model::{ResourceId, ResourceKind, ResourceSnapshot};
use serde::Serialize;
use serde_json::json;
use tower_http::trace::TraceLayer;

#[derive(Debug, Clone)]
pub struct HostState {
    notifications: Arc<InProcResourceNotifications>,
    health: Arc<HealthCheckRegistry>,
}

impl HostState {
    pub fn from_host(host: &AppHost) -> Self {
        Self {
            notifications: host.notifications(),
            health: host.health(),
        }
    }
}

pub fn create_router(state: HostState) -> Router {
    Router::new()
        .route("/health", get(health_summary))
        .route("/health/{name}", get(health_check))
        .route("/resources", get(list_resources))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

fn status_code(status: HealthStatus) -> StatusCode {
    if status.is_healthy() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

async fn health_summary(State(state): State<HostState>) -> Response {
    let summary = state.health.check_all().await;
    (status_code(summary.status), Json(summary)).into_response()
}

async fn health_check(
    State(state): State<HostState>,
    Path(name): Path<String>,
) -> Response {
    match state.health.check(&name).await {
        Some(result) => {
            let code = status_code(result.status);
            (code, Json(HealthReport { name, result })).into_response()
        }
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": format!("no health check named '{name}'") })),
        )
            .into_response(),
    }
}

#[derive(Debug, Serialize)]
struct ResourceView {
    id: ResourceId,
    name: String,
    kind: ResourceKind,
    #[serde(flatten)]
    snapshot: ResourceSnapshot,
}

async fn list_resources(State(state): State<HostState>) -> Json<Vec<ResourceView>> {
    let resources = state
        .notifications
        .current()
        .into_iter()
        .map(|event| ResourceView {
            id: event.resource_id,
            name: event.resource.name().to_string(),
            kind: event.resource.kind(),
            snapshot: event.snapshot,
        })
        .collect();
    Json(resources)
}
