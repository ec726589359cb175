use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tracing::{info, warn};

use super::domain::SignatureRole;
use super::navigation::{self, WizardControls};
use super::state::{TransitionError, WizardAction, WizardOptions, WizardState};
use super::steps::StepId;
use super::submission::{EnrollmentSubmitter, SubmitError};
use super::validation::ValidationPolicy;

/// Outcome of a submit attempt that did not reach the host or was rejected by it.
#[derive(Debug, thiserror::Error)]
pub enum SubmitAttemptError {
    #[error(transparent)]
    Refused(#[from] TransitionError),
    #[error(transparent)]
    Failed(#[from] SubmitError),
}

/// Returned by [`EnrollmentWizard::cancel`] when the wizard must stay open.
pub struct CancelRefused<S> {
    pub wizard: EnrollmentWizard<S>,
    pub reason: TransitionError,
}

impl<S> fmt::Debug for CancelRefused<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelRefused")
            .field("reason", &self.reason)
            .finish_non_exhaustive()
    }
}

/// An open enrollment wizard bound to its host callbacks.
///
/// Every method that changes the state takes `&mut self`, so an in-flight [`submit`] holds the
/// only handle to the wizard until the host answers.
///
/// [`submit`]: EnrollmentWizard::submit
pub struct EnrollmentWizard<S> {
    state: WizardState,
    submitter: Arc<S>,
}

impl<S> EnrollmentWizard<S>
where
    S: EnrollmentSubmitter + 'static,
{
    pub fn new(options: WizardOptions, policy: ValidationPolicy, submitter: Arc<S>) -> Self {
        Self {
            state: WizardState::new(options, policy),
            submitter,
        }
    }

    pub fn state(&self) -> &WizardState {
        &self.state
    }

    pub fn controls(&self) -> WizardControls {
        WizardControls::from_state(&self.state)
    }

    pub fn dispatch(&mut self, action: WizardAction) -> Result<&WizardState, TransitionError> {
        self.state = self.state.apply(action)?;
        Ok(&self.state)
    }

    pub fn update_step(
        &mut self,
        step: StepId,
        changes: Value,
    ) -> Result<&WizardState, TransitionError> {
        self.dispatch(WizardAction::UpdateStep { step, changes })
    }

    pub fn sign(
        &mut self,
        role: SignatureRole,
        signer_name: &str,
        signature_data: &str,
    ) -> Result<&WizardState, TransitionError> {
        self.dispatch(WizardAction::Sign {
            role,
            signer_name: signer_name.to_string(),
            signature_data: signature_data.to_string(),
            signed_at: Utc::now(),
        })
    }

    pub fn next(&mut self) -> Result<&WizardState, TransitionError> {
        self.dispatch(WizardAction::Next)
    }

    pub fn previous(&mut self) -> Result<&WizardState, TransitionError> {
        self.dispatch(WizardAction::Previous)
    }

    pub fn go_to_step(&mut self, index: usize) -> Result<&WizardState, TransitionError> {
        self.dispatch(WizardAction::GoToStep(index))
    }

    /// Assemble the payload and hand it to the host exactly once. A rejection is recorded as
    /// the submit error and the wizard becomes editable again; nothing is retried.
    pub async fn submit(&mut self) -> Result<(), SubmitAttemptError> {
        let (submitting, request) = self.state.begin_submission()?;
        self.state = submitting;
        info!(
            person_id = %request.person_id,
            family_id = %request.family_id,
            signatures = request.signatures.len(),
            "submitting enrollment"
        );

        let outcome = self.submitter.submit(request).await;
        self.state = self.state.finish_submission(&outcome)?;
        match outcome {
            Ok(()) => {
                info!("enrollment submitted");
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "enrollment submission failed");
                Err(SubmitAttemptError::Failed(err))
            }
        }
    }

    /// Close the wizard without persisting anything. Refused while a submission is in flight.
    pub fn cancel(self) -> Result<(), CancelRefused<S>> {
        if !navigation::can_cancel(&self.state) {
            return Err(CancelRefused {
                wizard: self,
                reason: TransitionError::Submitting,
            });
        }

        info!(step = %self.state.current_step(), "enrollment wizard cancelled");
        self.submitter.cancelled();
        Ok(())
    }
}
