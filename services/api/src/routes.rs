use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use enrollment_wizard::workflows::enrollment::{
    enrollment_router, form_router, EnrollmentIntake, EnrollmentRepository, EnrollmentSessions,
    ValidationPolicy,
};
use serde_json::json;
use std::sync::Arc;

/// Wizard sessions submit straight into the intake, which also backs the stored-form routes.
pub(crate) fn with_enrollment_routes<R>(
    intake: Arc<EnrollmentIntake<R>>,
    policy: ValidationPolicy,
) -> axum::Router
where
    R: EnrollmentRepository + 'static,
{
    let sessions = Arc::new(EnrollmentSessions::new(intake.clone(), policy));

    enrollment_router(sessions)
        .merge(form_router(intake))
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
