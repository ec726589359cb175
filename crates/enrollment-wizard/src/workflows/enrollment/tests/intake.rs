use super::common::*;
use std::sync::Arc;

use chrono::{Duration, Utc};

use crate::workflows::enrollment::domain::{
    EnrollmentFormId, EnrollmentFormStatus, StatusTransitionError,
};
use crate::workflows::enrollment::repository::{
    EnrollmentFormView, EnrollmentIntake, IntakeError, RepositoryError,
};
use crate::workflows::enrollment::submission::{assemble, EnrollmentSubmitter, SubmitError};

fn request() -> crate::workflows::enrollment::submission::EnrollmentRequest {
    assemble(&complete_data(), &policy(), "person-17", "family-4").expect("ready")
}

#[test]
fn recorded_forms_are_submitted_with_identity() {
    let repository = Arc::new(MemoryRepository::default());
    let intake = EnrollmentIntake::new(repository.clone(), 365);

    let form = intake.record(request()).expect("recorded");

    assert!(form.id.0.starts_with("enr-"));
    assert!(form.form_number.starts_with("ENR-"));
    assert_eq!(form.version, 1);
    assert_eq!(form.status, EnrollmentFormStatus::Submitted);
    assert!(form.submitted_at.is_some());
    assert_eq!(form.child_name, "Sophie Martin");
    assert_eq!(
        form.child_date_of_birth.map(|date| date.to_string()),
        Some("2021-03-15".to_string())
    );
    assert_eq!(repository.forms.lock().expect("forms mutex").len(), 1);

    let view = EnrollmentFormView::from(&form);
    assert_eq!(view.status, "Submitted");
    assert_eq!(view.parent_count, 1);
    assert_eq!(view.emergency_contact_count, 2);
}

#[test]
fn each_record_gets_a_new_sequence_number() {
    let intake = EnrollmentIntake::new(Arc::new(MemoryRepository::default()), 365);

    let first = intake.record(request()).expect("first");
    let second = intake.record(request()).expect("second");
    assert_ne!(first.id, second.id);
    assert_ne!(first.form_number, second.form_number);
}

#[test]
fn approval_sets_the_expiry_window() {
    let intake = EnrollmentIntake::new(Arc::new(MemoryRepository::default()), 30);
    let form = intake.record(request()).expect("recorded");

    let approved = intake
        .set_status(&form.id, EnrollmentFormStatus::Approved)
        .expect("approval allowed");
    assert_eq!(approved.status, EnrollmentFormStatus::Approved);
    assert_eq!(
        approved.expires_on,
        Some(Utc::now().date_naive() + Duration::days(30))
    );

    let stored = intake.get(&form.id).expect("stored");
    assert_eq!(stored.status, EnrollmentFormStatus::Approved);
}

#[test]
fn approval_refuses_an_unrepresentable_expiry() {
    let intake = EnrollmentIntake::new(Arc::new(MemoryRepository::default()), u32::MAX);
    let form = intake.record(request()).expect("recorded");

    let error = intake
        .set_status(&form.id, EnrollmentFormStatus::Approved)
        .expect_err("expiry overflows the calendar");
    assert!(matches!(
        error,
        IntakeError::Status(StatusTransitionError::ExpiryOutOfRange {
            validity_days: u32::MAX
        })
    ));

    let stored = intake.get(&form.id).expect("stored");
    assert_eq!(stored.status, EnrollmentFormStatus::Submitted);
    assert!(stored.expires_on.is_none());
}

#[test]
fn rejected_forms_reopen_as_a_new_version() {
    let intake = EnrollmentIntake::new(Arc::new(MemoryRepository::default()), 365);
    let form = intake.record(request()).expect("recorded");

    intake
        .set_status(&form.id, EnrollmentFormStatus::Rejected)
        .expect("rejection allowed");
    let reopened = intake
        .set_status(&form.id, EnrollmentFormStatus::Draft)
        .expect("reopen allowed");

    assert_eq!(reopened.version, 2);
    assert!(reopened.submitted_at.is_none());
}

#[test]
fn undocumented_moves_are_refused() {
    let intake = EnrollmentIntake::new(Arc::new(MemoryRepository::default()), 365);
    let form = intake.record(request()).expect("recorded");

    let error = intake
        .set_status(&form.id, EnrollmentFormStatus::Draft)
        .expect_err("submitted forms cannot go back to draft directly");
    assert!(matches!(
        error,
        IntakeError::Status(StatusTransitionError::NotAllowed { .. })
    ));

    let approved = intake
        .set_status(&form.id, EnrollmentFormStatus::Approved)
        .expect("approval allowed");
    let error = intake
        .set_status(&approved.id, EnrollmentFormStatus::Expired)
        .expect_err("not yet expired");
    assert!(matches!(
        error,
        IntakeError::Status(StatusTransitionError::NotYetExpired { .. })
    ));
}

#[test]
fn unknown_forms_are_not_found() {
    let intake = EnrollmentIntake::new(Arc::new(MemoryRepository::default()), 365);
    let error = intake
        .get(&EnrollmentFormId("enr-999999".to_string()))
        .expect_err("missing");
    assert!(matches!(error, IntakeError::Repository(RepositoryError::NotFound)));
}

#[tokio::test]
async fn submitter_maps_outages_to_unavailable() {
    let intake = EnrollmentIntake::new(Arc::new(UnavailableRepository), 365);

    let error = intake.submit(request()).await.expect_err("outage");
    assert_eq!(error, SubmitError::Unavailable("database offline".to_string()));
}

#[tokio::test]
async fn submitter_stores_the_payload() {
    let repository = Arc::new(MemoryRepository::default());
    let intake = EnrollmentIntake::new(repository.clone(), 365);

    intake.submit(request()).await.expect("stored");

    let forms = repository.forms.lock().expect("forms mutex");
    let form = forms.values().next().expect("one form");
    assert_eq!(form.request.family_id, "family-4");
    assert!(form.request.parent2.is_none());
}
