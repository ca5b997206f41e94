use crate::infra::{deserialize_optional_date, AppState};
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use chrono::{Local, NaiveDate};
use hostel_core::error::AppError;
use hostel_core::workflows::residency::requests::repository::{
    NotificationChannel, RequestStore,
};
use hostel_core::workflows::residency::requests::{request_router, EntityId, RequestService};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub(crate) struct ExpiryRunRequest {
    /// Sweep cutoff date; defaults to today when omitted.
    #[serde(default, deserialize_with = "deserialize_optional_date")]
    pub(crate) today: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ExpiryRunResponse {
    pub(crate) date: NaiveDate,
    pub(crate) expired_requests: Vec<EntityId>,
    pub(crate) expired_passes: Vec<EntityId>,
}

pub(crate) fn with_request_routes<S, N>(service: Arc<RequestService<S, N>>) -> axum::Router
where
    S: RequestStore + 'static,
    N: NotificationChannel + 'static,
{
    let ops = axum::Router::new()
        .route("/ops/expiry", axum::routing::post(expiry_endpoint::<S, N>))
        .with_state(service.clone());

    request_router(service)
        .merge(ops)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

/// Manual trigger for the scheduled expiry sweep; the cron wrapper and the
/// `check` CLI command both land here.
pub(crate) async fn expiry_endpoint<S, N>(
    State(service): State<Arc<RequestService<S, N>>>,
    Json(payload): Json<ExpiryRunRequest>,
) -> Result<Json<ExpiryRunResponse>, AppError>
where
    S: RequestStore + 'static,
    N: NotificationChannel + 'static,
{
    let date = payload.today.unwrap_or_else(|| Local::now().date_naive());
    let sweep = service.expire_overdue(date)?;
    Ok(Json(ExpiryRunResponse {
        date,
        expired_requests: sweep.expired_requests,
        expired_passes: sweep.expired_passes,
    }))
}
