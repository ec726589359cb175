use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::data::WizardData;
use super::domain::{
    AttendancePattern, AuthorizedPickup, ChildInfo, EmergencyContact, EnrollmentParent,
    EnrollmentSignature, HealthInfo, NutritionInfo, ParentInfo, ParentNumber, SignatureRole,
};
use super::steps::StepId;
use super::validation::{validate_step, ValidationPolicy};

/// Nested payload handed to the host once the review step validates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentRequest {
    pub person_id: String,
    pub family_id: String,
    pub child_info: ChildInfo,
    pub parent1: ParentInfo,
    pub parent2: Option<ParentInfo>,
    pub authorized_pickups: Vec<AuthorizedPickup>,
    pub emergency_contacts: Vec<EmergencyContact>,
    pub health_info: HealthInfo,
    pub nutrition_info: NutritionInfo,
    pub attendance_pattern: AttendancePattern,
    pub signatures: Vec<EnrollmentSignature>,
}

impl EnrollmentRequest {
    /// Parent 1 always, parent 2 when present.
    pub fn parents(&self) -> Vec<EnrollmentParent> {
        let mut parents = vec![EnrollmentParent {
            parent_number: ParentNumber::First,
            info: self.parent1.clone(),
        }];
        if let Some(second) = &self.parent2 {
            parents.push(EnrollmentParent {
                parent_number: ParentNumber::Second,
                info: second.clone(),
            });
        }
        parents
    }

    pub fn signature(&self, role: SignatureRole) -> Option<&EnrollmentSignature> {
        self.signatures.iter().find(|signature| signature.role == role)
    }
}

/// Raised when the data bag cannot yet be frozen into a request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("enrollment is not ready to submit: {}", .errors.join("; "))]
pub struct AssemblyError {
    pub step: StepId,
    pub errors: Vec<String>,
}

/// Build the submission payload. Nothing is produced unless the review step validates.
pub fn assemble(
    data: &WizardData,
    policy: &ValidationPolicy,
    person_id: &str,
    family_id: &str,
) -> Result<EnrollmentRequest, AssemblyError> {
    let errors = validate_step(StepId::Review, data, policy);
    if !errors.is_empty() {
        return Err(AssemblyError {
            step: StepId::Review,
            errors,
        });
    }

    let mut parent1 = data.parent1.clone();
    let parent2 = data
        .parent2
        .as_ref()
        .filter(|_| data.has_parent2())
        .cloned();
    if !parent1.is_primary_contact
        && !parent2
            .as_ref()
            .is_some_and(|parent| parent.is_primary_contact)
    {
        parent1.is_primary_contact = true;
    }

    let mut emergency_contacts = data.emergency_contacts.clone();
    emergency_contacts.sort_by_key(|contact| contact.priority);
    let mut authorized_pickups = data.authorized_pickups.clone();
    authorized_pickups.sort_by_key(|pickup| pickup.priority);

    let signatures = SignatureRole::ordered()
        .into_iter()
        .filter_map(|role| {
            data.signatures
                .block(role)
                .map(|block| EnrollmentSignature {
                    role,
                    signer_name: block.signer_name.clone(),
                    signature_data: block.signature_data.clone(),
                    signed_at: block.signed_at,
                })
        })
        .collect();

    Ok(EnrollmentRequest {
        person_id: person_id.to_string(),
        family_id: family_id.to_string(),
        child_info: data.child_info.clone(),
        parent1,
        parent2,
        authorized_pickups,
        emergency_contacts,
        health_info: data.health_info.clone(),
        nutrition_info: data.nutrition_info.clone(),
        attendance_pattern: data.attendance_pattern.clone(),
        signatures,
    })
}

/// Failure reported by the host while persisting a submission.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubmitError {
    #[error("enrollment was rejected: {0}")]
    Rejected(String),
    #[error("enrollment service unavailable: {0}")]
    Unavailable(String),
}

/// Host callbacks. `submit` performs persistence; `cancelled` handles navigating away.
#[async_trait]
pub trait EnrollmentSubmitter: Send + Sync {
    async fn submit(&self, request: EnrollmentRequest) -> Result<(), SubmitError>;

    fn cancelled(&self) {}
}
