use super::common::*;
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, Method, Request, StatusCode};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use crate::workflows::enrollment::repository::EnrollmentIntake;
use crate::workflows::enrollment::router::{
    enrollment_router, form_router, view_handler, WizardView,
};
use crate::workflows::enrollment::sessions::{EnrollmentSessions, SessionId};
use crate::workflows::enrollment::submission::{assemble, EnrollmentSubmitter};

fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(&body).expect("encode body")))
        .expect("request builds")
}

fn empty_post(uri: &str) -> Request<Body> {
    Request::post(uri).body(Body::empty()).expect("request builds")
}

async fn open_session(router: &axum::Router, initial_data: Value) -> String {
    let response = router
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/api/v1/enrollment/sessions",
            json!({ "personId": "person-17", "familyId": "family-4", "initialData": initial_data }),
        ))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::CREATED);

    let payload = read_json_body(response).await;
    payload["sessionId"]
        .as_str()
        .expect("session id")
        .to_string()
}

fn sessions_router<S>(submitter: Arc<S>) -> axum::Router
where
    S: EnrollmentSubmitter + 'static,
{
    enrollment_router(Arc::new(EnrollmentSessions::new(submitter, policy())))
}

#[tokio::test]
async fn steps_route_lists_the_registry() {
    let router = sessions_router(Arc::new(RecordingSubmitter::default()));

    let response = router
        .oneshot(
            Request::get("/api/v1/enrollment/steps")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    let steps = payload.as_array().expect("array");
    assert_eq!(steps.len(), 10);
    let optional: Vec<&Value> = steps
        .iter()
        .filter(|step| step["isOptional"] == json!(true))
        .collect();
    assert_eq!(optional.len(), 1);
    assert_eq!(optional[0]["id"], json!("parent-2"));
}

#[tokio::test]
async fn patch_merges_step_data_and_recomputes_controls() {
    let router = sessions_router(Arc::new(RecordingSubmitter::default()));
    let id = open_session(&router, Value::Null).await;

    let response = router
        .clone()
        .oneshot(json_request(
            Method::PATCH,
            &format!("/api/v1/enrollment/sessions/{id}/steps/child-info"),
            child_patch(),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(
        payload["state"]["data"]["childInfo"]["childFirstName"],
        json!("Sophie")
    );
    assert_eq!(payload["state"]["errorsByStep"]["child-info"], json!([]));
    assert_eq!(payload["controls"]["canGoNext"], json!(true));

    let response = router
        .oneshot(empty_post(&format!("/api/v1/enrollment/sessions/{id}/next")))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["controls"]["currentStep"], json!("parent-1"));
    assert_eq!(payload["controls"]["progressPercent"], json!(20));
}

#[tokio::test]
async fn blocked_next_returns_conflict_with_reason() {
    let router = sessions_router(Arc::new(RecordingSubmitter::default()));
    let id = open_session(&router, Value::Null).await;

    let response = router
        .oneshot(empty_post(&format!("/api/v1/enrollment/sessions/{id}/next")))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let payload = read_json_body(response).await;
    assert!(payload["error"]
        .as_str()
        .expect("error message")
        .starts_with("Child Information is incomplete"));
}

#[tokio::test]
async fn malformed_patches_are_unprocessable() {
    let router = sessions_router(Arc::new(RecordingSubmitter::default()));
    let id = open_session(&router, Value::Null).await;

    let not_an_object = router
        .clone()
        .oneshot(json_request(
            Method::PATCH,
            &format!("/api/v1/enrollment/sessions/{id}/steps/health"),
            json!(["hasEpiPen"]),
        ))
        .await
        .expect("route executes");
    assert_eq!(not_an_object.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let wrong_shape = router
        .clone()
        .oneshot(json_request(
            Method::PATCH,
            &format!("/api/v1/enrollment/sessions/{id}/steps/health"),
            json!({ "hasEpiPen": "sometimes" }),
        ))
        .await
        .expect("route executes");
    assert_eq!(wrong_shape.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let unknown_step = router
        .oneshot(json_request(
            Method::PATCH,
            &format!("/api/v1/enrollment/sessions/{id}/steps/pets"),
            json!({}),
        ))
        .await
        .expect("route executes");
    assert_eq!(unknown_step.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unknown_session_returns_not_found() {
    let sessions = Arc::new(EnrollmentSessions::new(
        Arc::new(RecordingSubmitter::default()),
        policy(),
    ));

    let response = view_handler::<RecordingSubmitter>(
        State(sessions),
        Path("wiz-404404".to_string()),
    )
    .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let payload = read_json_body(response).await;
    assert_eq!(payload["error"], json!("wizard session wiz-404404 not found"));
}

#[tokio::test]
async fn signature_route_captures_and_locks_signatures() {
    let router = sessions_router(Arc::new(RecordingSubmitter::default()));
    let id = open_session(&router, Value::Null).await;
    let uri = format!("/api/v1/enrollment/sessions/{id}/signatures/Parent1");
    let body = json!({
        "signerName": "Claire Martin",
        "signatureData": "data:image/png;base64,AA==",
    });

    let response = router
        .clone()
        .oneshot(json_request(Method::POST, &uri, body.clone()))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(
        payload["state"]["data"]["signatures"]["parent1"]["signerName"],
        json!("Claire Martin")
    );

    let again = router
        .oneshot(json_request(Method::POST, &uri, body))
        .await
        .expect("route executes");
    assert_eq!(again.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn rejected_submit_returns_bad_gateway_with_view() {
    let router = sessions_router(Arc::new(FlakySubmitter::failing(1)));
    let initial = serde_json::to_value(complete_data()).expect("encode data");
    let id = open_session(&router, initial).await;

    let response = router
        .clone()
        .oneshot(empty_post(&format!("/api/v1/enrollment/sessions/{id}/goto/9")))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::OK);

    let response = router
        .clone()
        .oneshot(empty_post(&format!("/api/v1/enrollment/sessions/{id}/submit")))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let payload = read_json_body(response).await;
    assert_eq!(
        payload["submitError"],
        json!("enrollment service unavailable: gateway timeout")
    );
    assert_eq!(payload["controls"]["canSubmit"], json!(true));
    assert_eq!(payload["controls"]["isSubmitting"], json!(false));

    let response = router
        .clone()
        .oneshot(empty_post(&format!("/api/v1/enrollment/sessions/{id}/submit")))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["state"]["submission"]["state"], json!("submitted"));

    let response = router
        .oneshot(
            Request::get(format!("/api/v1/enrollment/sessions/{id}"))
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn cancel_route_closes_the_session() {
    let router = sessions_router(Arc::new(RecordingSubmitter::default()));
    let id = open_session(&router, Value::Null).await;

    let response = router
        .clone()
        .oneshot(empty_post(&format!("/api/v1/enrollment/sessions/{id}/cancel")))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::OK);

    let response = router
        .oneshot(
            Request::get(format!("/api/v1/enrollment/sessions/{id}"))
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[test]
fn view_carries_the_submit_error_only_when_present() {
    let view = WizardView::new(SessionId("wiz-000001".to_string()), review_state());
    let payload = serde_json::to_value(&view).expect("serialize");
    assert!(payload.get("submitError").is_none());
    assert_eq!(payload["sessionId"], json!("wiz-000001"));
    assert_eq!(payload["controls"]["progressPercent"], json!(100));
}

#[tokio::test]
async fn form_routes_expose_stored_forms_and_their_lifecycle() {
    let intake = Arc::new(EnrollmentIntake::new(
        Arc::new(MemoryRepository::default()),
        365,
    ));
    let request = assemble(&complete_data(), &policy(), "person-17", "family-4").expect("ready");
    let form = intake.record(request).expect("recorded");
    let router = form_router(intake);

    let response = router
        .clone()
        .oneshot(
            Request::get(format!("/api/v1/enrollments/{}", form.id.0))
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["formNumber"], json!(form.form_number));
    assert_eq!(payload["status"], json!("Submitted"));

    let response = router
        .clone()
        .oneshot(json_request(
            Method::POST,
            &format!("/api/v1/enrollments/{}/status", form.id.0),
            json!({ "status": "approved" }),
        ))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["status"], json!("Approved"));
    assert!(payload.get("expiresOn").is_some());

    let response = router
        .clone()
        .oneshot(json_request(
            Method::POST,
            &format!("/api/v1/enrollments/{}/status", form.id.0),
            json!({ "status": "draft" }),
        ))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = router
        .oneshot(
            Request::get("/api/v1/enrollments/enr-999999")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
