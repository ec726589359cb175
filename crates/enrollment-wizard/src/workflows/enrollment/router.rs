use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, patch, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::data::StepDataError;
use super::domain::{EnrollmentFormId, EnrollmentFormStatus, SignatureRole};
use super::navigation::WizardControls;
use super::repository::{
    EnrollmentFormView, EnrollmentIntake, EnrollmentRepository, IntakeError, RepositoryError,
};
use super::sessions::{EnrollmentSessions, SessionError, SessionId};
use super::state::{TransitionError, WizardAction, WizardOptions, WizardState};
use super::steps::{StepId, WIZARD_STEPS};
use super::submission::EnrollmentSubmitter;

/// What a remote client renders for one open wizard.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WizardView {
    pub session_id: SessionId,
    pub state: WizardState,
    pub controls: WizardControls,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submit_error: Option<String>,
}

impl WizardView {
    pub fn new(session_id: SessionId, state: WizardState) -> Self {
        let controls = WizardControls::from_state(&state);
        let submit_error = state.submit_error().map(str::to_string);
        Self {
            session_id,
            state,
            controls,
            submit_error,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SignRequest {
    pub(crate) signer_name: String,
    pub(crate) signature_data: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StatusRequest {
    pub(crate) status: EnrollmentFormStatus,
}

/// Router hosting wizard sessions for remote clients.
pub fn enrollment_router<S>(sessions: Arc<EnrollmentSessions<S>>) -> Router
where
    S: EnrollmentSubmitter + 'static,
{
    Router::new()
        .route("/api/v1/enrollment/steps", get(steps_handler))
        .route("/api/v1/enrollment/sessions", post(open_handler::<S>))
        .route(
            "/api/v1/enrollment/sessions/:session_id",
            get(view_handler::<S>),
        )
        .route(
            "/api/v1/enrollment/sessions/:session_id/steps/:step",
            patch(update_step_handler::<S>),
        )
        .route(
            "/api/v1/enrollment/sessions/:session_id/signatures/:role",
            post(sign_handler::<S>),
        )
        .route(
            "/api/v1/enrollment/sessions/:session_id/next",
            post(next_handler::<S>),
        )
        .route(
            "/api/v1/enrollment/sessions/:session_id/previous",
            post(previous_handler::<S>),
        )
        .route(
            "/api/v1/enrollment/sessions/:session_id/goto/:index",
            post(go_to_handler::<S>),
        )
        .route(
            "/api/v1/enrollment/sessions/:session_id/submit",
            post(submit_handler::<S>),
        )
        .route(
            "/api/v1/enrollment/sessions/:session_id/cancel",
            post(cancel_handler::<S>),
        )
        .with_state(sessions)
}

/// Router exposing stored enrollment forms and their review lifecycle.
pub fn form_router<R>(intake: Arc<EnrollmentIntake<R>>) -> Router
where
    R: EnrollmentRepository + 'static,
{
    Router::new()
        .route("/api/v1/enrollments/:form_id", get(form_handler::<R>))
        .route(
            "/api/v1/enrollments/:form_id/status",
            post(form_status_handler::<R>),
        )
        .with_state(intake)
}

async fn steps_handler() -> Response {
    (StatusCode::OK, axum::Json(&WIZARD_STEPS[..])).into_response()
}

pub(crate) async fn open_handler<S>(
    State(sessions): State<Arc<EnrollmentSessions<S>>>,
    axum::Json(options): axum::Json<WizardOptions>,
) -> Response
where
    S: EnrollmentSubmitter + 'static,
{
    let (session_id, state) = sessions.open(options).await;
    let view = WizardView::new(session_id, state);
    (StatusCode::CREATED, axum::Json(view)).into_response()
}

pub(crate) async fn view_handler<S>(
    State(sessions): State<Arc<EnrollmentSessions<S>>>,
    Path(session_id): Path<String>,
) -> Response
where
    S: EnrollmentSubmitter + 'static,
{
    let id = SessionId(session_id);
    match sessions.get(&id).await {
        Ok(state) => view_response(id, state),
        Err(err) => session_error_response(&err),
    }
}

pub(crate) async fn update_step_handler<S>(
    State(sessions): State<Arc<EnrollmentSessions<S>>>,
    Path((session_id, step)): Path<(String, String)>,
    axum::Json(changes): axum::Json<Value>,
) -> Response
where
    S: EnrollmentSubmitter + 'static,
{
    let step: StepId = match step.parse() {
        Ok(step) => step,
        Err(err) => {
            let payload = json!({ "error": err.to_string() });
            return (StatusCode::NOT_FOUND, axum::Json(payload)).into_response();
        }
    };

    apply_and_render(
        &sessions,
        SessionId(session_id),
        WizardAction::UpdateStep { step, changes },
    )
    .await
}

pub(crate) async fn sign_handler<S>(
    State(sessions): State<Arc<EnrollmentSessions<S>>>,
    Path((session_id, role)): Path<(String, SignatureRole)>,
    axum::Json(request): axum::Json<SignRequest>,
) -> Response
where
    S: EnrollmentSubmitter + 'static,
{
    let action = WizardAction::Sign {
        role,
        signer_name: request.signer_name,
        signature_data: request.signature_data,
        signed_at: chrono::Utc::now(),
    };
    apply_and_render(&sessions, SessionId(session_id), action).await
}

pub(crate) async fn next_handler<S>(
    State(sessions): State<Arc<EnrollmentSessions<S>>>,
    Path(session_id): Path<String>,
) -> Response
where
    S: EnrollmentSubmitter + 'static,
{
    apply_and_render(&sessions, SessionId(session_id), WizardAction::Next).await
}

pub(crate) async fn previous_handler<S>(
    State(sessions): State<Arc<EnrollmentSessions<S>>>,
    Path(session_id): Path<String>,
) -> Response
where
    S: EnrollmentSubmitter + 'static,
{
    apply_and_render(&sessions, SessionId(session_id), WizardAction::Previous).await
}

pub(crate) async fn go_to_handler<S>(
    State(sessions): State<Arc<EnrollmentSessions<S>>>,
    Path((session_id, index)): Path<(String, usize)>,
) -> Response
where
    S: EnrollmentSubmitter + 'static,
{
    apply_and_render(&sessions, SessionId(session_id), WizardAction::GoToStep(index)).await
}

pub(crate) async fn submit_handler<S>(
    State(sessions): State<Arc<EnrollmentSessions<S>>>,
    Path(session_id): Path<String>,
) -> Response
where
    S: EnrollmentSubmitter + 'static,
{
    let id = SessionId(session_id);
    match sessions.submit(&id).await {
        Ok(state) => view_response(id, state),
        Err(SessionError::Submit(_)) => match sessions.get(&id).await {
            Ok(state) => {
                (StatusCode::BAD_GATEWAY, axum::Json(WizardView::new(id, state))).into_response()
            }
            Err(err) => session_error_response(&err),
        },
        Err(err) => session_error_response(&err),
    }
}

pub(crate) async fn cancel_handler<S>(
    State(sessions): State<Arc<EnrollmentSessions<S>>>,
    Path(session_id): Path<String>,
) -> Response
where
    S: EnrollmentSubmitter + 'static,
{
    let id = SessionId(session_id);
    match sessions.cancel(&id).await {
        Ok(()) => {
            let payload = json!({ "sessionId": id.0, "cancelled": true });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(err) => session_error_response(&err),
    }
}

pub(crate) async fn form_handler<R>(
    State(intake): State<Arc<EnrollmentIntake<R>>>,
    Path(form_id): Path<String>,
) -> Response
where
    R: EnrollmentRepository + 'static,
{
    match intake.get(&EnrollmentFormId(form_id)) {
        Ok(form) => (StatusCode::OK, axum::Json(EnrollmentFormView::from(&form))).into_response(),
        Err(err) => intake_error_response(&err),
    }
}

pub(crate) async fn form_status_handler<R>(
    State(intake): State<Arc<EnrollmentIntake<R>>>,
    Path(form_id): Path<String>,
    axum::Json(request): axum::Json<StatusRequest>,
) -> Response
where
    R: EnrollmentRepository + 'static,
{
    match intake.set_status(&EnrollmentFormId(form_id), request.status) {
        Ok(form) => (StatusCode::OK, axum::Json(EnrollmentFormView::from(&form))).into_response(),
        Err(err) => intake_error_response(&err),
    }
}

async fn apply_and_render<S>(
    sessions: &EnrollmentSessions<S>,
    id: SessionId,
    action: WizardAction,
) -> Response
where
    S: EnrollmentSubmitter + 'static,
{
    match sessions.apply(&id, action).await {
        Ok(state) => view_response(id, state),
        Err(err) => session_error_response(&err),
    }
}

fn view_response(id: SessionId, state: WizardState) -> Response {
    (StatusCode::OK, axum::Json(WizardView::new(id, state))).into_response()
}

fn session_error_response(err: &SessionError) -> Response {
    let status = match err {
        SessionError::NotFound(_) => StatusCode::NOT_FOUND,
        SessionError::Transition(TransitionError::Data(
            StepDataError::ReadOnlyStep(_)
            | StepDataError::NotAnObject(_)
            | StepDataError::Shape { .. },
        ))
        | SessionError::Transition(TransitionError::StepOutOfRange { .. }) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        SessionError::Transition(_) => StatusCode::CONFLICT,
        SessionError::Submit(_) => StatusCode::BAD_GATEWAY,
    };

    let payload = json!({ "error": err.to_string() });
    (status, axum::Json(payload)).into_response()
}

fn intake_error_response(err: &IntakeError) -> Response {
    let status = match err {
        IntakeError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        IntakeError::Repository(RepositoryError::Conflict) | IntakeError::Status(_) => {
            StatusCode::CONFLICT
        }
        IntakeError::Repository(RepositoryError::Unavailable(_)) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    let payload = json!({ "error": err.to_string() });
    (status, axum::Json(payload)).into_response()
}
