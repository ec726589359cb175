use enrollment_wizard::workflows::enrollment::{
    EnrollmentForm, EnrollmentFormId, EnrollmentRepository, RepositoryError,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryEnrollmentRepository {
    forms: Arc<Mutex<HashMap<EnrollmentFormId, EnrollmentForm>>>,
}

impl InMemoryEnrollmentRepository {
    fn guard(
        &self,
    ) -> Result<MutexGuard<'_, HashMap<EnrollmentFormId, EnrollmentForm>>, RepositoryError> {
        self.forms
            .lock()
            .map_err(|_| RepositoryError::Unavailable("repository mutex poisoned".to_string()))
    }

    /// Stored forms ordered by form number.
    pub(crate) fn forms(&self) -> Result<Vec<EnrollmentForm>, RepositoryError> {
        let mut forms: Vec<EnrollmentForm> = self.guard()?.values().cloned().collect();
        forms.sort_by(|a, b| a.form_number.cmp(&b.form_number));
        Ok(forms)
    }
}

impl EnrollmentRepository for InMemoryEnrollmentRepository {
    fn insert(&self, form: EnrollmentForm) -> Result<EnrollmentForm, RepositoryError> {
        let mut guard = self.guard()?;
        if guard.contains_key(&form.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(form.id.clone(), form.clone());
        Ok(form)
    }

    fn update(&self, form: EnrollmentForm) -> Result<(), RepositoryError> {
        let mut guard = self.guard()?;
        if guard.contains_key(&form.id) {
            guard.insert(form.id.clone(), form);
            Ok(())
        } else {
            Err(RepositoryError::NotFound)
        }
    }

    fn fetch(&self, id: &EnrollmentFormId) -> Result<Option<EnrollmentForm>, RepositoryError> {
        Ok(self.guard()?.get(id).cloned())
    }
}
