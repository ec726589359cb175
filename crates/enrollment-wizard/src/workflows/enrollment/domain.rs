use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::submission::EnrollmentRequest;

/// Child identity captured on the first step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ChildInfo {
    pub child_first_name: String,
    pub child_last_name: String,
    /// `YYYY-MM-DD`, kept as entered so a half-typed value never fails to load.
    pub child_date_of_birth: String,
    pub child_gender: String,
    pub child_address: String,
    pub child_city: String,
    pub child_postal_code: String,
    pub languages_spoken: String,
}

impl ChildInfo {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.child_first_name.trim(), self.child_last_name.trim())
            .trim()
            .to_string()
    }

    pub fn date_of_birth(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(self.child_date_of_birth.trim(), "%Y-%m-%d").ok()
    }
}

/// Parent or guardian data shared by the two parent steps.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ParentInfo {
    pub first_name: String,
    pub last_name: String,
    pub relationship: String,
    pub email: String,
    pub home_phone: String,
    pub cell_phone: String,
    pub work_phone: String,
    pub address: String,
    pub employer: String,
    pub is_primary_contact: bool,
    pub has_custody: bool,
}

impl ParentInfo {
    pub fn phones(&self) -> impl Iterator<Item = &str> {
        [&self.home_phone, &self.cell_phone, &self.work_phone]
            .into_iter()
            .map(|phone| phone.trim())
            .filter(|phone| !phone.is_empty())
    }

    /// True when no field carries any input; such a parent counts as absent.
    pub fn is_blank(&self) -> bool {
        [
            &self.first_name,
            &self.last_name,
            &self.relationship,
            &self.email,
            &self.home_phone,
            &self.cell_phone,
            &self.work_phone,
            &self.address,
            &self.employer,
        ]
        .iter()
        .all(|field| field.trim().is_empty())
            && !self.is_primary_contact
            && !self.has_custody
    }
}

/// Which of the two parent slots a parent occupies; serialized as `1` or `2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum ParentNumber {
    First,
    Second,
}

impl From<ParentNumber> for u8 {
    fn from(value: ParentNumber) -> Self {
        match value {
            ParentNumber::First => 1,
            ParentNumber::Second => 2,
        }
    }
}

impl TryFrom<u8> for ParentNumber {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::First),
            2 => Ok(Self::Second),
            other => Err(format!("parent number must be 1 or 2, found {other}")),
        }
    }
}

/// Parent as it appears in the assembled enrollment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentParent {
    pub parent_number: ParentNumber,
    #[serde(flatten)]
    pub info: ParentInfo,
}

/// Person allowed to collect the child.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AuthorizedPickup {
    pub name: String,
    pub relationship: String,
    pub phone: String,
    pub priority: u32,
    pub notes: String,
}

/// Person called, in priority order, when a guardian cannot be reached.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EmergencyContact {
    pub name: String,
    pub relationship: String,
    pub phone: String,
    pub alternate_phone: String,
    pub priority: u32,
}

/// Shared shape of the two ranked contact lists.
pub trait RankedContact {
    fn name(&self) -> &str;
    fn relationship(&self) -> &str;
    fn phone(&self) -> &str;
    fn priority(&self) -> u32;
}

impl RankedContact for AuthorizedPickup {
    fn name(&self) -> &str {
        &self.name
    }

    fn relationship(&self) -> &str {
        &self.relationship
    }

    fn phone(&self) -> &str {
        &self.phone
    }

    fn priority(&self) -> u32 {
        self.priority
    }
}

impl RankedContact for EmergencyContact {
    fn name(&self) -> &str {
        &self.name
    }

    fn relationship(&self) -> &str {
        &self.relationship
    }

    fn phone(&self) -> &str {
        &self.phone
    }

    fn priority(&self) -> u32 {
        self.priority
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllergySeverity {
    #[default]
    Mild,
    Moderate,
    Severe,
}

impl AllergySeverity {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Mild => "Mild",
            Self::Moderate => "Moderate",
            Self::Severe => "Severe",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AllergyInfo {
    pub allergen: String,
    pub severity: AllergySeverity,
    pub reaction: String,
    pub treatment: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MedicationInfo {
    pub name: String,
    pub dosage: String,
    pub schedule: String,
    pub instructions: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HealthInfo {
    pub allergies: Vec<AllergyInfo>,
    pub medications: Vec<MedicationInfo>,
    pub has_epi_pen: bool,
    pub epi_pen_instructions: String,
    pub medical_conditions: String,
    pub doctor_name: String,
    pub doctor_phone: String,
    pub health_insurance_number: String,
}

impl HealthInfo {
    pub fn has_severe_allergy(&self) -> bool {
        self.allergies
            .iter()
            .any(|allergy| allergy.severity == AllergySeverity::Severe)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NutritionInfo {
    pub dietary_restrictions: String,
    pub food_allergies: String,
    pub feeding_instructions: String,
    pub is_bottle_feeding: bool,
    pub bottle_feeding_schedule: String,
    pub food_preferences: String,
}

impl NutritionInfo {
    /// Bottle feeding brings the feeding-instructions field into view; it stays optional.
    pub fn shows_feeding_instructions(&self) -> bool {
        self.is_bottle_feeding
    }

    pub(crate) fn free_text_fields(&self) -> [(&'static str, &str); 5] {
        [
            ("Dietary restrictions", self.dietary_restrictions.as_str()),
            ("Food allergies", self.food_allergies.as_str()),
            ("Feeding instructions", self.feeding_instructions.as_str()),
            ("Bottle feeding schedule", self.bottle_feeding_schedule.as_str()),
            ("Food preferences", self.food_preferences.as_str()),
        ]
    }
}

/// Weekly AM/PM attendance grid plus expected hours.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AttendancePattern {
    pub monday_am: bool,
    pub monday_pm: bool,
    pub tuesday_am: bool,
    pub tuesday_pm: bool,
    pub wednesday_am: bool,
    pub wednesday_pm: bool,
    pub thursday_am: bool,
    pub thursday_pm: bool,
    pub friday_am: bool,
    pub friday_pm: bool,
    pub saturday_am: bool,
    pub saturday_pm: bool,
    pub sunday_am: bool,
    pub sunday_pm: bool,
    pub expected_hours_per_week: Option<f32>,
    pub expected_arrival_time: String,
    pub expected_departure_time: String,
}

impl AttendancePattern {
    /// `(am, pm)` per day, Monday first.
    pub fn days(&self) -> [(bool, bool); 7] {
        [
            (self.monday_am, self.monday_pm),
            (self.tuesday_am, self.tuesday_pm),
            (self.wednesday_am, self.wednesday_pm),
            (self.thursday_am, self.thursday_pm),
            (self.friday_am, self.friday_pm),
            (self.saturday_am, self.saturday_pm),
            (self.sunday_am, self.sunday_pm),
        ]
    }

    pub fn scheduled_days(&self) -> usize {
        self.days().iter().filter(|(am, pm)| *am || *pm).count()
    }

    pub fn total_periods(&self) -> usize {
        self.days()
            .iter()
            .map(|(am, pm)| usize::from(*am) + usize::from(*pm))
            .sum()
    }

    pub fn is_full_time(&self, full_time_periods: usize) -> bool {
        self.total_periods() >= full_time_periods
    }

    pub fn has_weekend_care(&self) -> bool {
        self.saturday_am || self.saturday_pm || self.sunday_am || self.sunday_pm
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SignatureRole {
    Parent1,
    Parent2,
    Director,
}

impl SignatureRole {
    pub const fn ordered() -> [Self; 3] {
        [Self::Parent1, Self::Parent2, Self::Director]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Parent1 => "Parent 1",
            Self::Parent2 => "Parent 2",
            Self::Director => "Director",
        }
    }
}

/// A captured signature. Present blocks are complete; there is no draft state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureBlock {
    pub signer_name: String,
    pub signature_data: String,
    pub signed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SignaturesData {
    pub parent1: Option<SignatureBlock>,
    pub parent2: Option<SignatureBlock>,
    pub director: Option<SignatureBlock>,
    pub agree_to_terms: bool,
}

impl SignaturesData {
    pub fn block(&self, role: SignatureRole) -> Option<&SignatureBlock> {
        match role {
            SignatureRole::Parent1 => self.parent1.as_ref(),
            SignatureRole::Parent2 => self.parent2.as_ref(),
            SignatureRole::Director => self.director.as_ref(),
        }
    }

    pub(crate) fn block_mut(&mut self, role: SignatureRole) -> &mut Option<SignatureBlock> {
        match role {
            SignatureRole::Parent1 => &mut self.parent1,
            SignatureRole::Parent2 => &mut self.parent2,
            SignatureRole::Director => &mut self.director,
        }
    }
}

/// Signature entry in the submitted payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentSignature {
    pub role: SignatureRole,
    pub signer_name: String,
    pub signature_data: String,
    pub signed_at: DateTime<Utc>,
}

/// Identifier wrapper for stored enrollment forms.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EnrollmentFormId(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrollmentFormStatus {
    Draft,
    Submitted,
    Approved,
    Rejected,
    Expired,
}

impl EnrollmentFormStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Draft => "Draft",
            Self::Submitted => "Submitted",
            Self::Approved => "Approved",
            Self::Rejected => "Rejected",
            Self::Expired => "Expired",
        }
    }

    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Draft, Self::Submitted)
                | (Self::Submitted, Self::Approved)
                | (Self::Submitted, Self::Rejected)
                | (Self::Rejected, Self::Draft)
                | (Self::Approved, Self::Expired)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StatusTransitionError {
    #[error("enrollment form cannot move from {} to {}", from.label(), to.label())]
    NotAllowed {
        from: EnrollmentFormStatus,
        to: EnrollmentFormStatus,
    },
    #[error("approved enrollment form does not expire until {expires_on}")]
    NotYetExpired { expires_on: NaiveDate },
    #[error("a validity window of {validity_days} days runs past the last representable date")]
    ExpiryOutOfRange { validity_days: u32 },
}

/// Stored enrollment aggregate owned by the host after hand-off.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentForm {
    pub id: EnrollmentFormId,
    pub form_number: String,
    pub version: u32,
    pub status: EnrollmentFormStatus,
    pub child_name: String,
    pub child_date_of_birth: Option<NaiveDate>,
    pub child_address: String,
    pub submitted_at: Option<DateTime<Utc>>,
    pub expires_on: Option<NaiveDate>,
    pub request: EnrollmentRequest,
}

impl EnrollmentForm {
    pub fn draft(id: EnrollmentFormId, form_number: String, request: EnrollmentRequest) -> Self {
        Self {
            id,
            form_number,
            version: 1,
            status: EnrollmentFormStatus::Draft,
            child_name: request.child_info.full_name(),
            child_date_of_birth: request.child_info.date_of_birth(),
            child_address: request.child_info.child_address.clone(),
            submitted_at: None,
            expires_on: None,
            request,
        }
    }

    /// Apply a manual lifecycle transition. Expiry goes through [`Self::expire_if_due`].
    pub fn transition_to(
        &mut self,
        next: EnrollmentFormStatus,
        now: DateTime<Utc>,
        validity_days: u32,
    ) -> Result<(), StatusTransitionError> {
        if next == EnrollmentFormStatus::Expired {
            let today = now.date_naive();
            if self.expire_if_due(today)? {
                return Ok(());
            }
            return Err(StatusTransitionError::NotYetExpired {
                expires_on: self.expires_on.unwrap_or(today),
            });
        }

        if !self.status.can_transition_to(next) {
            return Err(StatusTransitionError::NotAllowed {
                from: self.status,
                to: next,
            });
        }

        match next {
            EnrollmentFormStatus::Submitted => {
                self.submitted_at = Some(now);
            }
            EnrollmentFormStatus::Approved => {
                let expires_on = Duration::try_days(i64::from(validity_days))
                    .and_then(|window| now.date_naive().checked_add_signed(window))
                    .ok_or(StatusTransitionError::ExpiryOutOfRange { validity_days })?;
                self.expires_on = Some(expires_on);
            }
            EnrollmentFormStatus::Draft => {
                self.version += 1;
                self.submitted_at = None;
            }
            EnrollmentFormStatus::Rejected | EnrollmentFormStatus::Expired => {}
        }

        self.status = next;
        Ok(())
    }

    /// Move an approved form to `Expired` once its validity window has passed.
    pub fn expire_if_due(&mut self, today: NaiveDate) -> Result<bool, StatusTransitionError> {
        if !self.status.can_transition_to(EnrollmentFormStatus::Expired) {
            return Err(StatusTransitionError::NotAllowed {
                from: self.status,
                to: EnrollmentFormStatus::Expired,
            });
        }

        match self.expires_on {
            Some(expires_on) if today >= expires_on => {
                self.status = EnrollmentFormStatus::Expired;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
