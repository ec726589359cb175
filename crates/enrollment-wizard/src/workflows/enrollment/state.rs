use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use super::data::{StepDataError, WizardData};
use super::domain::SignatureRole;
use super::navigation;
use super::steps::StepId;
use super::submission::{self, AssemblyError, EnrollmentRequest, SubmitError};
use super::validation::{validate_step, ValidationPolicy};

/// Inputs handed to the wizard by its host when it is opened.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WizardOptions {
    /// Passed through to the payload untouched.
    pub person_id: String,
    /// Passed through to the payload untouched.
    pub family_id: String,
    /// Draft to resume. Seeded once; never synced afterwards.
    pub initial_data: Option<WizardData>,
    /// Host-side override that locks the wizard as if a submission were in flight.
    pub is_submitting: bool,
    pub disabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SubmissionStatus {
    Editing,
    Submitting,
    Failed { reason: String },
    Submitted,
}

/// Every transition the wizard accepts.
#[derive(Debug, Clone, PartialEq)]
pub enum WizardAction {
    UpdateStep {
        step: StepId,
        changes: Value,
    },
    Sign {
        role: SignatureRole,
        signer_name: String,
        signature_data: String,
        signed_at: DateTime<Utc>,
    },
    Next,
    Previous,
    GoToStep(usize),
    SubmitFailed(String),
    SubmitSucceeded,
}

/// Why a transition was refused. The state it was applied to is unchanged.
#[derive(Debug, thiserror::Error)]
pub enum TransitionError {
    #[error("the wizard is locked while the enrollment is being submitted")]
    Submitting,
    #[error("the wizard is disabled")]
    Disabled,
    #[error("the enrollment has already been submitted")]
    AlreadySubmitted,
    #[error("{} is incomplete: {}", .step.definition().label, .errors.join("; "))]
    StepIncomplete { step: StepId, errors: Vec<String> },
    #[error("already on the first step")]
    AtFirstStep,
    #[error("already on the last step; submit the enrollment instead")]
    AtLastStep,
    #[error("step {index} does not exist")]
    StepOutOfRange { index: usize },
    #[error("the enrollment can only be submitted from the review step")]
    NotOnReview,
    #[error("no submission is in flight")]
    NotSubmitting,
    #[error(transparent)]
    Data(#[from] StepDataError),
    #[error(transparent)]
    Assembly(#[from] AssemblyError),
}

/// Single source of truth for one open wizard. Transitions return a new value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WizardState {
    current_step_index: usize,
    data: WizardData,
    errors_by_step: BTreeMap<StepId, Vec<String>>,
    visited_steps: BTreeSet<StepId>,
    submission: SubmissionStatus,
    person_id: String,
    family_id: String,
    is_submitting_override: bool,
    disabled: bool,
    #[serde(skip)]
    policy: ValidationPolicy,
}

impl WizardState {
    pub fn new(options: WizardOptions, policy: ValidationPolicy) -> Self {
        let WizardOptions {
            person_id,
            family_id,
            initial_data,
            is_submitting,
            disabled,
        } = options;

        let data = initial_data.unwrap_or_default();
        let empty = WizardData::default();
        let mut visited_steps: BTreeSet<StepId> = StepId::ordered()
            .into_iter()
            .filter(|step| data.step(*step) != empty.step(*step))
            .filter(|step| *step != StepId::Review)
            .collect();
        visited_steps.insert(StepId::ChildInfo);

        let mut state = Self {
            current_step_index: 0,
            data,
            errors_by_step: BTreeMap::new(),
            visited_steps,
            submission: SubmissionStatus::Editing,
            person_id,
            family_id,
            is_submitting_override: is_submitting,
            disabled,
            policy,
        };
        state.refresh_errors();
        state
    }

    pub fn current_step_index(&self) -> usize {
        self.current_step_index
    }

    pub fn current_step(&self) -> StepId {
        StepId::from_index(self.current_step_index).unwrap_or(StepId::Review)
    }

    pub fn data(&self) -> &WizardData {
        &self.data
    }

    pub fn policy(&self) -> &ValidationPolicy {
        &self.policy
    }

    pub fn person_id(&self) -> &str {
        &self.person_id
    }

    pub fn family_id(&self) -> &str {
        &self.family_id
    }

    /// Messages for visited steps; unvisited steps report nothing yet.
    pub fn errors(&self, step: StepId) -> &[String] {
        self.errors_by_step
            .get(&step)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn errors_by_step(&self) -> &BTreeMap<StepId, Vec<String>> {
        &self.errors_by_step
    }

    pub fn is_visited(&self, step: StepId) -> bool {
        self.visited_steps.contains(&step)
    }

    pub fn visited_steps(&self) -> &BTreeSet<StepId> {
        &self.visited_steps
    }

    pub fn submission(&self) -> &SubmissionStatus {
        &self.submission
    }

    pub fn is_submitting(&self) -> bool {
        self.is_submitting_override || self.submission == SubmissionStatus::Submitting
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    pub fn is_submitted(&self) -> bool {
        self.submission == SubmissionStatus::Submitted
    }

    pub fn submit_error(&self) -> Option<&str> {
        match &self.submission {
            SubmissionStatus::Failed { reason } => Some(reason),
            _ => None,
        }
    }

    /// Host toggles for the `disabled` and `is_submitting` inputs.
    pub fn with_host_flags(&self, disabled: bool, is_submitting: bool) -> Self {
        let mut next = self.clone();
        next.disabled = disabled;
        next.is_submitting_override = is_submitting;
        next
    }

    /// Apply one transition, returning the next state or the reason it was refused.
    pub fn apply(&self, action: WizardAction) -> Result<Self, TransitionError> {
        let outcome = self.transition(action);
        if let Err(err) = &outcome {
            warn!(step = %self.current_step(), error = %err, "wizard transition refused");
        }
        outcome
    }

    fn transition(&self, action: WizardAction) -> Result<Self, TransitionError> {
        match action {
            WizardAction::UpdateStep { step, changes } => {
                navigation::check_editable(self)?;
                let data = self.data.with_changes(step, &changes)?;
                debug!(%step, "step data merged");
                Ok(self.with_data(step, data))
            }
            WizardAction::Sign {
                role,
                signer_name,
                signature_data,
                signed_at,
            } => {
                navigation::check_editable(self)?;
                let data =
                    self.data
                        .with_signature(role, &signer_name, &signature_data, signed_at)?;
                debug!(role = role.label(), "signature captured");
                Ok(self.with_data(StepId::Signatures, data))
            }
            WizardAction::Next => {
                navigation::check_next(self)?;
                Ok(self.moved_to(self.current_step_index + 1))
            }
            WizardAction::Previous => {
                navigation::check_previous(self)?;
                Ok(self.moved_to(self.current_step_index - 1))
            }
            WizardAction::GoToStep(index) => {
                navigation::check_go_to(self, index)?;
                Ok(self.moved_to(index))
            }
            WizardAction::SubmitFailed(reason) => {
                if self.submission != SubmissionStatus::Submitting {
                    return Err(TransitionError::NotSubmitting);
                }
                let mut next = self.clone();
                next.submission = SubmissionStatus::Failed { reason };
                Ok(next)
            }
            WizardAction::SubmitSucceeded => {
                if self.submission != SubmissionStatus::Submitting {
                    return Err(TransitionError::NotSubmitting);
                }
                let mut next = self.clone();
                next.submission = SubmissionStatus::Submitted;
                Ok(next)
            }
        }
    }

    /// Freeze the data into a payload and lock the wizard. All-or-nothing: on error the
    /// state stays editable and nothing is produced.
    pub fn begin_submission(&self) -> Result<(Self, EnrollmentRequest), TransitionError> {
        navigation::check_submit(self)?;

        let request =
            submission::assemble(&self.data, &self.policy, &self.person_id, &self.family_id)?;

        let mut next = self.clone();
        next.submission = SubmissionStatus::Submitting;
        Ok((next, request))
    }

    /// Record the host's answer to the attempt started by [`begin_submission`].
    ///
    /// [`begin_submission`]: WizardState::begin_submission
    pub fn finish_submission(
        &self,
        outcome: &Result<(), SubmitError>,
    ) -> Result<Self, TransitionError> {
        match outcome {
            Ok(()) => self.apply(WizardAction::SubmitSucceeded),
            Err(err) => self.apply(WizardAction::SubmitFailed(err.to_string())),
        }
    }

    fn with_data(&self, step: StepId, data: WizardData) -> Self {
        let mut next = self.clone();
        next.data = data;
        next.visited_steps.insert(step);
        if matches!(next.submission, SubmissionStatus::Failed { .. }) {
            next.submission = SubmissionStatus::Editing;
        }
        next.refresh_errors();
        next
    }

    fn moved_to(&self, index: usize) -> Self {
        let mut next = self.clone();
        next.current_step_index = index;
        if let Some(step) = StepId::from_index(index) {
            next.visited_steps.insert(step);
        }
        next.refresh_errors();
        debug!(step = %next.current_step(), index, "wizard moved");
        next
    }

    fn refresh_errors(&mut self) {
        self.errors_by_step = self
            .visited_steps
            .iter()
            .map(|step| (*step, validate_step(*step, &self.data, &self.policy)))
            .collect();
    }
}
