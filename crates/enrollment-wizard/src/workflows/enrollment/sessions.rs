use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{info, warn};

use super::navigation;
use super::state::{TransitionError, WizardAction, WizardOptions, WizardState};
use super::submission::{EnrollmentSubmitter, SubmitError};
use super::validation::ValidationPolicy;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("wizard session {0} not found")]
    NotFound(SessionId),
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error(transparent)]
    Submit(#[from] SubmitError),
}

/// Open wizards hosted for remote clients, keyed by session id.
///
/// The session map is never locked across the host's submit call: the state is moved to
/// `Submitting` under the lock, the lock is released for the await, and the outcome is applied
/// under a fresh lock.
pub struct EnrollmentSessions<S> {
    sessions: Mutex<HashMap<SessionId, WizardState>>,
    submitter: Arc<S>,
    policy: ValidationPolicy,
    sequence: AtomicU64,
}

impl<S> EnrollmentSessions<S>
where
    S: EnrollmentSubmitter + 'static,
{
    pub fn new(submitter: Arc<S>, policy: ValidationPolicy) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            submitter,
            policy,
            sequence: AtomicU64::new(1),
        }
    }

    pub fn policy(&self) -> &ValidationPolicy {
        &self.policy
    }

    pub async fn open(&self, options: WizardOptions) -> (SessionId, WizardState) {
        let id = SessionId(format!(
            "wiz-{:06}",
            self.sequence.fetch_add(1, Ordering::Relaxed)
        ));
        let state = WizardState::new(options, self.policy.clone());

        self.sessions.lock().await.insert(id.clone(), state.clone());
        info!(session = %id, person_id = %state.person_id(), "wizard session opened");
        (id, state)
    }

    pub async fn get(&self, id: &SessionId) -> Result<WizardState, SessionError> {
        let sessions = self.sessions.lock().await;
        sessions
            .get(id)
            .cloned()
            .ok_or_else(|| SessionError::NotFound(id.clone()))
    }

    pub async fn apply(
        &self,
        id: &SessionId,
        action: WizardAction,
    ) -> Result<WizardState, SessionError> {
        let mut sessions = self.sessions.lock().await;
        let state = sessions
            .get_mut(id)
            .ok_or_else(|| SessionError::NotFound(id.clone()))?;

        *state = state.apply(action)?;
        Ok(state.clone())
    }

    /// Run one submit attempt. A successful hand-off closes the session and returns its final
    /// state. On rejection the stored state carries the reason and the error is returned; the
    /// caller may read the session back to render it.
    pub async fn submit(&self, id: &SessionId) -> Result<WizardState, SessionError> {
        let request = {
            let mut sessions = self.sessions.lock().await;
            let state = sessions
                .get_mut(id)
                .ok_or_else(|| SessionError::NotFound(id.clone()))?;
            let (submitting, request) = state.begin_submission()?;
            *state = submitting;
            request
        };

        info!(session = %id, family_id = %request.family_id, "submitting enrollment");
        let outcome = self.submitter.submit(request).await;

        let mut sessions = self.sessions.lock().await;
        let state = sessions
            .get_mut(id)
            .ok_or_else(|| SessionError::NotFound(id.clone()))?;
        *state = state.finish_submission(&outcome)?;
        match outcome {
            Ok(()) => {
                let submitted = sessions
                    .remove(id)
                    .ok_or_else(|| SessionError::NotFound(id.clone()))?;
                info!(session = %id, "enrollment submitted, session closed");
                Ok(submitted)
            }
            Err(err) => {
                warn!(session = %id, error = %err, "enrollment submission failed");
                Err(SessionError::Submit(err))
            }
        }
    }

    /// Close a session without persisting anything. Refused while a submission is in flight.
    pub async fn cancel(&self, id: &SessionId) -> Result<(), SessionError> {
        let mut sessions = self.sessions.lock().await;
        let state = sessions
            .get(id)
            .ok_or_else(|| SessionError::NotFound(id.clone()))?;
        if !navigation::can_cancel(state) {
            return Err(TransitionError::Submitting.into());
        }

        sessions.remove(id);
        drop(sessions);
        self.submitter.cancelled();
        info!(session = %id, "wizard session cancelled");
        Ok(())
    }

    pub async fn open_count(&self) -> usize {
        self.sessions.lock().await.len()
    }
}
