use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::domain::{
    AttendancePattern, AuthorizedPickup, ChildInfo, EmergencyContact, HealthInfo, NutritionInfo,
    ParentInfo, SignatureBlock, SignatureRole, SignaturesData,
};
use super::steps::StepId;

/// Everything the guardian has entered, one slot per step.
///
/// This is also the shape of `initialData` when resuming a draft: every field is optional on the
/// wire and missing fields load as empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WizardData {
    pub child_info: ChildInfo,
    pub parent1: ParentInfo,
    pub parent2: Option<ParentInfo>,
    pub authorized_pickups: Vec<AuthorizedPickup>,
    pub emergency_contacts: Vec<EmergencyContact>,
    pub health_info: HealthInfo,
    pub nutrition_info: NutritionInfo,
    pub attendance_pattern: AttendancePattern,
    pub signatures: SignaturesData,
}

/// Borrowed view of a single step's data.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StepData<'a> {
    ChildInfo(&'a ChildInfo),
    Parent1(&'a ParentInfo),
    Parent2(Option<&'a ParentInfo>),
    AuthorizedPickups(&'a [AuthorizedPickup]),
    EmergencyContacts(&'a [EmergencyContact]),
    Health(&'a HealthInfo),
    Nutrition(&'a NutritionInfo),
    Attendance(&'a AttendancePattern),
    Signatures(&'a SignaturesData),
    Review(&'a WizardData),
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct PickupSlice {
    authorized_pickups: Vec<AuthorizedPickup>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ContactSlice {
    emergency_contacts: Vec<EmergencyContact>,
}

/// Rejections raised while merging input into the data bag. The bag is left untouched.
#[derive(Debug, thiserror::Error)]
pub enum StepDataError {
    #[error("step {0} has no editable data")]
    ReadOnlyStep(StepId),
    #[error("changes for step {0} must be a JSON object or null")]
    NotAnObject(StepId),
    #[error("changes for step {step} do not fit its fields: {source}")]
    Shape {
        step: StepId,
        #[source]
        source: serde_json::Error,
    },
    #[error("{} signature is already captured and cannot change", .0.label())]
    SignatureLocked(SignatureRole),
    #[error("{} signature needs both a signer name and signature data", .0.label())]
    IncompleteSignature(SignatureRole),
}

impl WizardData {
    pub fn step(&self, step: StepId) -> StepData<'_> {
        match step {
            StepId::ChildInfo => StepData::ChildInfo(&self.child_info),
            StepId::Parent1 => StepData::Parent1(&self.parent1),
            StepId::Parent2 => StepData::Parent2(self.parent2.as_ref()),
            StepId::AuthorizedPickups => StepData::AuthorizedPickups(&self.authorized_pickups),
            StepId::EmergencyContacts => StepData::EmergencyContacts(&self.emergency_contacts),
            StepId::Health => StepData::Health(&self.health_info),
            StepId::Nutrition => StepData::Nutrition(&self.nutrition_info),
            StepId::Attendance => StepData::Attendance(&self.attendance_pattern),
            StepId::Signatures => StepData::Signatures(&self.signatures),
            StepId::Review => StepData::Review(self),
        }
    }

    /// Parent 2 counts as present only when it carries some input.
    pub fn has_parent2(&self) -> bool {
        self.parent2
            .as_ref()
            .is_some_and(|parent| !parent.is_blank())
    }

    /// JSON object holding the step's current fields.
    pub fn step_fields(&self, step: StepId) -> Result<Map<String, Value>, StepDataError> {
        let value = match step {
            StepId::ChildInfo => to_value(step, &self.child_info)?,
            StepId::Parent1 => to_value(step, &self.parent1)?,
            StepId::Parent2 => match &self.parent2 {
                Some(parent) => to_value(step, parent)?,
                None => Value::Object(Map::new()),
            },
            StepId::AuthorizedPickups => to_value(
                step,
                &PickupSlice {
                    authorized_pickups: self.authorized_pickups.clone(),
                },
            )?,
            StepId::EmergencyContacts => to_value(
                step,
                &ContactSlice {
                    emergency_contacts: self.emergency_contacts.clone(),
                },
            )?,
            StepId::Health => to_value(step, &self.health_info)?,
            StepId::Nutrition => to_value(step, &self.nutrition_info)?,
            StepId::Attendance => to_value(step, &self.attendance_pattern)?,
            StepId::Signatures => to_value(step, &self.signatures)?,
            StepId::Review => return Err(StepDataError::ReadOnlyStep(step)),
        };

        match value {
            Value::Object(fields) => Ok(fields),
            _ => Err(StepDataError::NotAnObject(step)),
        }
    }

    /// Shallow-merge `changes` over the step's fields. `null` resets the step, which for
    /// parent 2 means "no second parent".
    pub fn with_changes(&self, step: StepId, changes: &Value) -> Result<Self, StepDataError> {
        let merged = match changes {
            Value::Null => None,
            Value::Object(patch) => {
                let mut fields = self.step_fields(step)?;
                for (key, value) in patch {
                    fields.insert(key.clone(), value.clone());
                }
                Some(Value::Object(fields))
            }
            _ => return Err(StepDataError::NotAnObject(step)),
        };

        let mut next = self.clone();
        match step {
            StepId::ChildInfo => next.child_info = from_slice(step, merged)?,
            StepId::Parent1 => next.parent1 = from_slice(step, merged)?,
            StepId::Parent2 => {
                next.parent2 = match merged {
                    Some(value) => Some(from_value(step, value)?),
                    None => None,
                }
            }
            StepId::AuthorizedPickups => {
                next.authorized_pickups =
                    from_slice::<PickupSlice>(step, merged)?.authorized_pickups
            }
            StepId::EmergencyContacts => {
                next.emergency_contacts =
                    from_slice::<ContactSlice>(step, merged)?.emergency_contacts
            }
            StepId::Health => next.health_info = from_slice(step, merged)?,
            StepId::Nutrition => next.nutrition_info = from_slice(step, merged)?,
            StepId::Attendance => next.attendance_pattern = from_slice(step, merged)?,
            StepId::Signatures => {
                next.signatures = from_slice(step, merged)?;
                ensure_signatures_unchanged(&self.signatures, &next.signatures)?;
            }
            StepId::Review => return Err(StepDataError::ReadOnlyStep(step)),
        }

        Ok(next)
    }

    /// Capture a signature for `role`, stamped at `signed_at`.
    pub fn with_signature(
        &self,
        role: SignatureRole,
        signer_name: &str,
        signature_data: &str,
        signed_at: DateTime<Utc>,
    ) -> Result<Self, StepDataError> {
        if self.signatures.block(role).is_some() {
            return Err(StepDataError::SignatureLocked(role));
        }
        if signer_name.trim().is_empty() || signature_data.trim().is_empty() {
            return Err(StepDataError::IncompleteSignature(role));
        }

        let mut next = self.clone();
        *next.signatures.block_mut(role) = Some(SignatureBlock {
            signer_name: signer_name.trim().to_string(),
            signature_data: signature_data.to_string(),
            signed_at,
        });
        Ok(next)
    }
}

fn ensure_signatures_unchanged(
    before: &SignaturesData,
    after: &SignaturesData,
) -> Result<(), StepDataError> {
    for role in SignatureRole::ordered() {
        if let Some(existing) = before.block(role) {
            if after.block(role) != Some(existing) {
                return Err(StepDataError::SignatureLocked(role));
            }
        }
    }
    Ok(())
}

fn to_value<T: Serialize>(step: StepId, value: &T) -> Result<Value, StepDataError> {
    serde_json::to_value(value).map_err(|source| StepDataError::Shape { step, source })
}

fn from_value<T: DeserializeOwned>(step: StepId, value: Value) -> Result<T, StepDataError> {
    serde_json::from_value(value).map_err(|source| StepDataError::Shape { step, source })
}

fn from_slice<T: DeserializeOwned + Default>(
    step: StepId,
    merged: Option<Value>,
) -> Result<T, StepDataError> {
    match merged {
        Some(value) => from_value(step, value),
        None => Ok(T::default()),
    }
}
