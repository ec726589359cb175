use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::response::Response;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::{json, Value};
use tokio::sync::Notify;

use crate::workflows::enrollment::data::WizardData;
use crate::workflows::enrollment::domain::{EnrollmentForm, EnrollmentFormId, SignatureRole};
use crate::workflows::enrollment::repository::{EnrollmentRepository, RepositoryError};
use crate::workflows::enrollment::state::{WizardAction, WizardOptions, WizardState};
use crate::workflows::enrollment::steps::{StepId, STEP_COUNT};
use crate::workflows::enrollment::submission::{EnrollmentRequest, EnrollmentSubmitter, SubmitError};
use crate::workflows::enrollment::validation::ValidationPolicy;

pub(super) fn policy() -> ValidationPolicy {
    ValidationPolicy::default()
}

pub(super) fn signed_at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 9, 30, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn child_patch() -> Value {
    json!({
        "childFirstName": "Sophie",
        "childLastName": "Martin",
        "childDateOfBirth": "2021-03-15",
    })
}

pub(super) fn parent1_patch() -> Value {
    json!({
        "firstName": "Claire",
        "lastName": "Martin",
        "relationship": "Mother",
        "cellPhone": "514-555-0101",
        "email": "claire.martin@example.com",
    })
}

pub(super) fn parent2_patch() -> Value {
    json!({
        "firstName": "Julien",
        "lastName": "Martin",
        "relationship": "Father",
        "workPhone": "514-555-0199",
        "email": "julien.martin@example.com",
    })
}

pub(super) fn emergency_contacts_patch() -> Value {
    json!({
        "emergencyContacts": [
            {
                "name": "Monique Tremblay",
                "relationship": "Grandmother",
                "phone": "514-555-0142",
                "priority": 2,
            },
            {
                "name": "Paul Gagnon",
                "relationship": "Neighbour",
                "phone": "514-555-0177",
                "priority": 1,
            },
        ]
    })
}

pub(super) fn attendance_patch() -> Value {
    json!({ "mondayAm": true })
}

pub(super) fn patched(data: WizardData, step: StepId, changes: Value) -> WizardData {
    data.with_changes(step, &changes).expect("patch applies")
}

/// Sophie Martin's enrollment with only the first parent, ready for review.
pub(super) fn complete_data() -> WizardData {
    let data = WizardData::default();
    let data = patched(data, StepId::ChildInfo, child_patch());
    let data = patched(data, StepId::Parent1, parent1_patch());
    let data = patched(data, StepId::EmergencyContacts, emergency_contacts_patch());
    let data = patched(data, StepId::Attendance, attendance_patch());
    let data = patched(data, StepId::Signatures, json!({ "agreeToTerms": true }));
    data.with_signature(
        SignatureRole::Parent1,
        "Claire Martin",
        "data:image/png;base64,iVBORw0KGgo=",
        signed_at(),
    )
    .expect("signature captured")
}

pub(super) fn options(initial_data: Option<WizardData>) -> WizardOptions {
    WizardOptions {
        person_id: "person-17".to_string(),
        family_id: "family-4".to_string(),
        initial_data,
        ..WizardOptions::default()
    }
}

pub(super) fn fresh_state() -> WizardState {
    WizardState::new(options(None), policy())
}

pub(super) fn state_at(index: usize, data: WizardData) -> WizardState {
    WizardState::new(options(Some(data)), policy())
        .apply(WizardAction::GoToStep(index))
        .expect("jump is allowed")
}

pub(super) fn review_state() -> WizardState {
    state_at(STEP_COUNT - 1, complete_data())
}

#[derive(Default)]
pub(super) struct RecordingSubmitter {
    pub(super) requests: Mutex<Vec<EnrollmentRequest>>,
    pub(super) cancelled: AtomicBool,
}

impl RecordingSubmitter {
    pub(super) fn requests(&self) -> Vec<EnrollmentRequest> {
        self.requests.lock().expect("requests mutex").clone()
    }
}

#[async_trait]
impl EnrollmentSubmitter for RecordingSubmitter {
    async fn submit(&self, request: EnrollmentRequest) -> Result<(), SubmitError> {
        self.requests.lock().expect("requests mutex").push(request);
        Ok(())
    }

    fn cancelled(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }
}

/// Rejects the first `failures` attempts, then accepts.
pub(super) struct FlakySubmitter {
    pub(super) failures: usize,
    pub(super) attempts: AtomicUsize,
}

impl FlakySubmitter {
    pub(super) fn failing(failures: usize) -> Self {
        Self {
            failures,
            attempts: AtomicUsize::new(0),
        }
    }

    pub(super) fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EnrollmentSubmitter for FlakySubmitter {
    async fn submit(&self, _request: EnrollmentRequest) -> Result<(), SubmitError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        if attempt < self.failures {
            Err(SubmitError::Unavailable("gateway timeout".to_string()))
        } else {
            Ok(())
        }
    }
}

/// Holds every submission until the test releases it.
#[derive(Default)]
pub(super) struct GatedSubmitter {
    pub(super) started: Notify,
    pub(super) release: Notify,
}

#[async_trait]
impl EnrollmentSubmitter for GatedSubmitter {
    async fn submit(&self, _request: EnrollmentRequest) -> Result<(), SubmitError> {
        self.started.notify_one();
        self.release.notified().await;
        Ok(())
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryRepository {
    pub(super) forms: Arc<Mutex<HashMap<EnrollmentFormId, EnrollmentForm>>>,
}

impl EnrollmentRepository for MemoryRepository {
    fn insert(&self, form: EnrollmentForm) -> Result<EnrollmentForm, RepositoryError> {
        let mut guard = self.forms.lock().expect("forms mutex");
        if guard.contains_key(&form.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(form.id.clone(), form.clone());
        Ok(form)
    }

    fn update(&self, form: EnrollmentForm) -> Result<(), RepositoryError> {
        let mut guard = self.forms.lock().expect("forms mutex");
        match guard.get_mut(&form.id) {
            Some(existing) => {
                *existing = form;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn fetch(&self, id: &EnrollmentFormId) -> Result<Option<EnrollmentForm>, RepositoryError> {
        Ok(self.forms.lock().expect("forms mutex").get(id).cloned())
    }
}

pub(super) struct UnavailableRepository;

impl EnrollmentRepository for UnavailableRepository {
    fn insert(&self, _form: EnrollmentForm) -> Result<EnrollmentForm, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn update(&self, _form: EnrollmentForm) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch(&self, _id: &EnrollmentFormId) -> Result<Option<EnrollmentForm>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
