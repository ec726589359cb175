use serde::Serialize;

use super::state::{TransitionError, WizardState};
use super::steps::{StepId, STEP_COUNT, WIZARD_STEPS};
use super::validation::validate_step;

/// `round((index + 1) / total * 100)`, clamped to the last step.
pub fn progress_percent(index: usize) -> u8 {
    let position = index.min(STEP_COUNT - 1) + 1;
    ((position as f64 / STEP_COUNT as f64) * 100.0).round() as u8
}

/// A step can be left forwards when it is optional or its validator reports nothing.
pub fn step_blocker(state: &WizardState, step: StepId) -> Option<TransitionError> {
    if step.is_optional() {
        return None;
    }

    let errors = validate_step(step, state.data(), state.policy());
    if errors.is_empty() {
        None
    } else {
        Some(TransitionError::StepIncomplete { step, errors })
    }
}

pub(crate) fn check_editable(state: &WizardState) -> Result<(), TransitionError> {
    if state.is_submitting() {
        return Err(TransitionError::Submitting);
    }
    if state.is_submitted() {
        return Err(TransitionError::AlreadySubmitted);
    }
    if state.is_disabled() {
        return Err(TransitionError::Disabled);
    }
    Ok(())
}

pub(crate) fn check_next(state: &WizardState) -> Result<(), TransitionError> {
    check_editable(state)?;
    if state.current_step_index() + 1 >= STEP_COUNT {
        return Err(TransitionError::AtLastStep);
    }
    match step_blocker(state, state.current_step()) {
        Some(blocker) => Err(blocker),
        None => Ok(()),
    }
}

pub(crate) fn check_previous(state: &WizardState) -> Result<(), TransitionError> {
    check_editable(state)?;
    if state.current_step_index() == 0 {
        return Err(TransitionError::AtFirstStep);
    }
    Ok(())
}

/// Backwards jumps are always allowed; forward jumps must be able to pass every step between
/// the current one and the target.
pub(crate) fn check_go_to(state: &WizardState, target: usize) -> Result<(), TransitionError> {
    check_editable(state)?;
    if target >= STEP_COUNT {
        return Err(TransitionError::StepOutOfRange { index: target });
    }

    for definition in WIZARD_STEPS
        .iter()
        .take(target)
        .skip(state.current_step_index())
    {
        if let Some(blocker) = step_blocker(state, definition.id) {
            return Err(blocker);
        }
    }
    Ok(())
}

pub(crate) fn check_submit(state: &WizardState) -> Result<(), TransitionError> {
    check_editable(state)?;
    if state.current_step() != StepId::Review {
        return Err(TransitionError::NotOnReview);
    }
    match step_blocker(state, StepId::Review) {
        Some(blocker) => Err(blocker),
        None => Ok(()),
    }
}

pub fn can_go_next(state: &WizardState) -> bool {
    check_next(state).is_ok()
}

pub fn can_go_previous(state: &WizardState) -> bool {
    check_previous(state).is_ok()
}

pub fn can_go_to(state: &WizardState, target: usize) -> bool {
    check_go_to(state, target).is_ok()
}

pub fn can_submit(state: &WizardState) -> bool {
    check_submit(state).is_ok()
}

/// Cancelling is synchronous and only refused while a submission is in flight.
pub fn can_cancel(state: &WizardState) -> bool {
    !state.is_submitting()
}

/// Enablement of every control the wizard renders, recomputed from the state.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WizardControls {
    pub current_step: StepId,
    pub current_step_index: usize,
    pub current_step_label: &'static str,
    pub progress_percent: u8,
    pub can_go_next: bool,
    pub can_go_previous: bool,
    pub can_submit: bool,
    pub can_cancel: bool,
    pub is_submitting: bool,
    /// Why "Next" (or "Submit" on the review step) is unavailable, if it is.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocked_reason: Option<String>,
    pub steps: Vec<StepIndicator>,
}

/// One entry of the step indicator strip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepIndicator {
    pub id: StepId,
    pub label: &'static str,
    pub is_optional: bool,
    pub is_current: bool,
    pub is_visited: bool,
    pub is_complete: bool,
    pub can_jump: bool,
}

impl WizardControls {
    pub fn from_state(state: &WizardState) -> Self {
        let current_step = state.current_step();
        let blocked_reason = if current_step == StepId::Review {
            check_submit(state).err()
        } else {
            check_next(state).err()
        }
        .map(|err| err.to_string());

        let steps = WIZARD_STEPS
            .iter()
            .enumerate()
            .map(|(index, definition)| StepIndicator {
                id: definition.id,
                label: definition.label,
                is_optional: definition.is_optional,
                is_current: index == state.current_step_index(),
                is_visited: state.is_visited(definition.id),
                is_complete: validate_step(definition.id, state.data(), state.policy())
                    .is_empty(),
                can_jump: can_go_to(state, index),
            })
            .collect();

        Self {
            current_step,
            current_step_index: state.current_step_index(),
            current_step_label: current_step.definition().label,
            progress_percent: progress_percent(state.current_step_index()),
            can_go_next: can_go_next(state),
            can_go_previous: can_go_previous(state),
            can_submit: can_submit(state),
            can_cancel: can_cancel(state),
            is_submitting: state.is_submitting(),
            blocked_reason,
            steps,
        }
    }
}
