//! Per-step validators. Each returns human-readable messages; an empty list means the step is
//! complete. Validators never fail: missing data is validated as empty input.

mod policy;
pub(crate) mod rules;

pub use policy::{ValidationPolicy, DEFAULT_MAX_FREE_TEXT_LEN};

use std::collections::BTreeMap;

use super::data::{StepData, WizardData};
use super::steps::StepId;

/// Run the validator registered for `step`.
pub fn validate_step(step: StepId, data: &WizardData, policy: &ValidationPolicy) -> Vec<String> {
    match data.step(step) {
        StepData::ChildInfo(child) => rules::child_info(child),
        StepData::Parent1(parent) => rules::parent("Parent 1", parent),
        StepData::Parent2(parent) => rules::optional_parent("Parent 2", parent),
        StepData::AuthorizedPickups(pickups) => {
            rules::ranked_contacts("Authorized pickup", pickups)
        }
        StepData::EmergencyContacts(contacts) => rules::emergency_contacts(contacts, policy),
        StepData::Health(health) => rules::health(health),
        StepData::Nutrition(nutrition) => rules::nutrition(nutrition, policy),
        StepData::Attendance(pattern) => rules::attendance(pattern, policy),
        StepData::Signatures(signatures) => {
            rules::signatures(signatures, data.has_parent2(), policy)
        }
        StepData::Review(all) => rules::review(all, policy),
    }
}

/// Validation messages for every step, in wizard order. Valid steps map to an empty list.
pub fn validate_all(data: &WizardData, policy: &ValidationPolicy) -> BTreeMap<StepId, Vec<String>> {
    StepId::ordered()
        .into_iter()
        .map(|step| (step, validate_step(step, data, policy)))
        .collect()
}
