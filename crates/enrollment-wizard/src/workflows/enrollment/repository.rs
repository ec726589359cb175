use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Datelike, Utc};
use serde::Serialize;
use tracing::info;

use super::domain::{
    EnrollmentForm, EnrollmentFormId, EnrollmentFormStatus, StatusTransitionError,
};
use super::submission::{EnrollmentRequest, EnrollmentSubmitter, SubmitError};

/// Storage abstraction for submitted enrollment forms.
pub trait EnrollmentRepository: Send + Sync {
    fn insert(&self, form: EnrollmentForm) -> Result<EnrollmentForm, RepositoryError>;
    fn update(&self, form: EnrollmentForm) -> Result<(), RepositoryError>;
    fn fetch(&self, id: &EnrollmentFormId) -> Result<Option<EnrollmentForm>, RepositoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, thiserror::Error)]
pub enum IntakeError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Status(#[from] StatusTransitionError),
}

static FORM_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_form_identity() -> (EnrollmentFormId, String) {
    let sequence = FORM_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    let year = Utc::now().year();
    (
        EnrollmentFormId(format!("enr-{sequence:06}")),
        format!("ENR-{year}-{sequence:06}"),
    )
}

/// Sanitized view of a stored form for API responses.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentFormView {
    pub id: EnrollmentFormId,
    pub form_number: String,
    pub version: u32,
    pub status: &'static str,
    pub child_name: String,
    pub parent_count: usize,
    pub emergency_contact_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_on: Option<chrono::NaiveDate>,
}

impl From<&EnrollmentForm> for EnrollmentFormView {
    fn from(form: &EnrollmentForm) -> Self {
        Self {
            id: form.id.clone(),
            form_number: form.form_number.clone(),
            version: form.version,
            status: form.status.label(),
            child_name: form.child_name.clone(),
            parent_count: form.request.parents().len(),
            emergency_contact_count: form.request.emergency_contacts.len(),
            expires_on: form.expires_on,
        }
    }
}

/// Host-side intake: records each submitted payload as a new form and owns its lifecycle
/// from there on.
pub struct EnrollmentIntake<R> {
    repository: Arc<R>,
    validity_days: u32,
}

impl<R> EnrollmentIntake<R>
where
    R: EnrollmentRepository + 'static,
{
    pub fn new(repository: Arc<R>, validity_days: u32) -> Self {
        Self {
            repository,
            validity_days,
        }
    }

    /// Persist a payload as a `Submitted` form.
    pub fn record(&self, request: EnrollmentRequest) -> Result<EnrollmentForm, IntakeError> {
        let (id, form_number) = next_form_identity();
        let mut form = EnrollmentForm::draft(id, form_number, request);
        form.transition_to(EnrollmentFormStatus::Submitted, Utc::now(), self.validity_days)?;

        let stored = self.repository.insert(form)?;
        info!(form_id = %stored.id.0, form_number = %stored.form_number, "enrollment form recorded");
        Ok(stored)
    }

    pub fn get(&self, id: &EnrollmentFormId) -> Result<EnrollmentForm, IntakeError> {
        let form = self.repository.fetch(id)?.ok_or(RepositoryError::NotFound)?;
        Ok(form)
    }

    /// Move a stored form through its lifecycle (review decisions, re-edit, expiry).
    pub fn set_status(
        &self,
        id: &EnrollmentFormId,
        status: EnrollmentFormStatus,
    ) -> Result<EnrollmentForm, IntakeError> {
        let mut form = self.get(id)?;
        let previous = form.status;
        form.transition_to(status, Utc::now(), self.validity_days)?;
        self.repository.update(form.clone())?;

        info!(
            form_id = %form.id.0,
            from = previous.label(),
            to = form.status.label(),
            "enrollment form status changed"
        );
        Ok(form)
    }
}

#[async_trait]
impl<R> EnrollmentSubmitter for EnrollmentIntake<R>
where
    R: EnrollmentRepository + 'static,
{
    async fn submit(&self, request: EnrollmentRequest) -> Result<(), SubmitError> {
        match self.record(request) {
            Ok(_) => Ok(()),
            Err(IntakeError::Repository(RepositoryError::Unavailable(reason))) => {
                Err(SubmitError::Unavailable(reason))
            }
            Err(other) => Err(SubmitError::Rejected(other.to_string())),
        }
    }
}
