use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use super::domain::{Actor, EntityId, RequestSubmission};
use super::passes::PassStatus;
use super::repository::{NotificationChannel, RequestStore, StoreError};
use super::service::{DecisionInput, RequestService, RequestServiceError};

/// Router builder exposing the request workflow over HTTP.
pub fn request_router<S, N>(service: Arc<RequestService<S, N>>) -> Router
where
    S: RequestStore + 'static,
    N: NotificationChannel + 'static,
{
    Router::new()
        .route("/requests", post(submit_handler::<S, N>))
        .route("/requests/pending", get(pending_handler::<S, N>))
        .route("/requests/:request_id", get(status_handler::<S, N>))
        .route(
            "/requests/:request_id/decision",
            post(decision_handler::<S, N>),
        )
        .route("/passes", get(pass_history_handler::<S, N>))
        .route(
            "/passes/verify/:pass_number",
            get(verify_pass_handler::<S, N>),
        )
        .route("/checks/nightly", post(nightly_check_handler::<S, N>))
        .route("/reports/morning", get(morning_report_handler::<S, N>))
        .with_state(service)
}

#[derive(Debug, Deserialize)]
pub(crate) struct SubmitRequestBody {
    student_id: EntityId,
    #[serde(flatten)]
    submission: RequestSubmission,
}

pub(crate) async fn submit_handler<S, N>(
    State(service): State<Arc<RequestService<S, N>>>,
    axum::Json(body): axum::Json<SubmitRequestBody>,
) -> Response
where
    S: RequestStore + 'static,
    N: NotificationChannel + 'static,
{
    match service.submit(body.student_id, body.submission) {
        Ok(record) => {
            let pass = match service.pass_for_request(&record.request.id) {
                Ok(pass) => pass,
                Err(error) => return error_response(error),
            };
            let payload = json!({
                "request": record.status_view(),
                "pass": pass,
            });
            (StatusCode::CREATED, axum::Json(payload)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn status_handler<S, N>(
    State(service): State<Arc<RequestService<S, N>>>,
    Path(request_id): Path<String>,
) -> Response
where
    S: RequestStore + 'static,
    N: NotificationChannel + 'static,
{
    let id = EntityId(request_id);
    match service.request(&id) {
        Ok(record) => (StatusCode::OK, axum::Json(record.status_view())).into_response(),
        Err(error) => error_response(error),
    }
}

const DEFAULT_PENDING_LIMIT: usize = 50;

#[derive(Debug, Deserialize)]
pub(crate) struct PendingParams {
    limit: Option<usize>,
}

pub(crate) async fn pending_handler<S, N>(
    State(service): State<Arc<RequestService<S, N>>>,
    Query(params): Query<PendingParams>,
) -> Response
where
    S: RequestStore + 'static,
    N: NotificationChannel + 'static,
{
    let limit = params.limit.unwrap_or(DEFAULT_PENDING_LIMIT);
    match service.pending_requests(limit) {
        Ok(records) => {
            let views: Vec<_> = records.iter().map(|record| record.status_view()).collect();
            (StatusCode::OK, axum::Json(views)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn decision_handler<S, N>(
    State(service): State<Arc<RequestService<S, N>>>,
    Path(request_id): Path<String>,
    axum::Json(input): axum::Json<DecisionInput>,
) -> Response
where
    S: RequestStore + 'static,
    N: NotificationChannel + 'static,
{
    let id = EntityId(request_id);
    match service.staff_decide(&id, input) {
        Ok(record) => {
            let pass = match service.pass_for_request(&record.request.id) {
                Ok(pass) => pass,
                Err(error) => return error_response(error),
            };
            let payload = json!({
                "request": record.status_view(),
                "pass": pass,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => error_response(error),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct PassHistoryParams {
    student_id: String,
    status: Option<PassStatus>,
}

pub(crate) async fn pass_history_handler<S, N>(
    State(service): State<Arc<RequestService<S, N>>>,
    Query(params): Query<PassHistoryParams>,
) -> Response
where
    S: RequestStore + 'static,
    N: NotificationChannel + 'static,
{
    let student_id = EntityId(params.student_id);
    match service.pass_history(&student_id, params.status) {
        Ok(passes) => (StatusCode::OK, axum::Json(passes)).into_response(),
        Err(error) => error_response(error),
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct VerifyParams {
    staff_id: Option<String>,
}

pub(crate) async fn verify_pass_handler<S, N>(
    State(service): State<Arc<RequestService<S, N>>>,
    Path(pass_number): Path<String>,
    Query(params): Query<VerifyParams>,
) -> Response
where
    S: RequestStore + 'static,
    N: NotificationChannel + 'static,
{
    let actor = params
        .staff_id
        .map(|id| Actor::Staff(EntityId(id)))
        .unwrap_or(Actor::System);
    match service.verify_pass(&pass_number, actor) {
        Ok(verification) => (StatusCode::OK, axum::Json(verification)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn nightly_check_handler<S, N>(
    State(service): State<Arc<RequestService<S, N>>>,
) -> Response
where
    S: RequestStore + 'static,
    N: NotificationChannel + 'static,
{
    let today = Utc::now().date_naive();
    match service.run_nightly_check(today) {
        Ok(conflicts) => {
            let payload = json!({
                "count": conflicts.len(),
                "conflicts": conflicts,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn morning_report_handler<S, N>(
    State(service): State<Arc<RequestService<S, N>>>,
) -> Response
where
    S: RequestStore + 'static,
    N: NotificationChannel + 'static,
{
    let today = Utc::now().date_naive();
    match service.morning_report(today) {
        Ok(report) => {
            let payload = json!({
                "report": report,
                "text": report.render_text(),
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => error_response(error),
    }
}

fn error_response(error: RequestServiceError) -> Response {
    let status = match &error {
        RequestServiceError::Validation(_) => StatusCode::BAD_REQUEST,
        RequestServiceError::Authorization(_) => StatusCode::FORBIDDEN,
        RequestServiceError::NotFound { .. } => StatusCode::NOT_FOUND,
        RequestServiceError::StateConflict { .. } => StatusCode::CONFLICT,
        RequestServiceError::Store(StoreError::Unavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
        RequestServiceError::Issuance(_) | RequestServiceError::Store(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    let payload = json!({ "error": error.to_string() });
    (status, axum::Json(payload)).into_response()
}
