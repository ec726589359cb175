//! Multi-step childcare enrollment wizard.
//!
//! A [`WizardState`] owns the collected data, the current position in the ten-step sequence,
//! and the submission lifecycle. Navigation is gated by the per-step validators, and the final
//! payload is only assembled once the review step passes.

pub mod data;
pub mod domain;
pub mod navigation;
pub mod repository;
pub mod router;
pub mod sessions;
pub mod state;
pub mod steps;
pub mod submission;
pub mod validation;
pub mod wizard;

#[cfg(test)]
mod tests;

pub use data::{StepData, StepDataError, WizardData};
pub use domain::{
    AllergyInfo, AllergySeverity, AttendancePattern, AuthorizedPickup, ChildInfo,
    EmergencyContact, EnrollmentForm, EnrollmentFormId, EnrollmentFormStatus, EnrollmentParent,
    EnrollmentSignature, HealthInfo, MedicationInfo, NutritionInfo, ParentInfo, ParentNumber,
    SignatureBlock, SignatureRole, SignaturesData, StatusTransitionError,
};
pub use navigation::{progress_percent, StepIndicator, WizardControls};
pub use repository::{
    EnrollmentFormView, EnrollmentIntake, EnrollmentRepository, IntakeError, RepositoryError,
};
pub use router::{enrollment_router, form_router};
pub use sessions::{EnrollmentSessions, SessionError, SessionId};
pub use state::{SubmissionStatus, TransitionError, WizardAction, WizardOptions, WizardState};
pub use steps::{StepDefinition, StepId, UnknownStep, STEP_COUNT, WIZARD_STEPS};
pub use submission::{assemble, AssemblyError, EnrollmentRequest, EnrollmentSubmitter, SubmitError};
pub use validation::{validate_all, validate_step, ValidationPolicy};
pub use wizard::{CancelRefused, EnrollmentWizard, SubmitAttemptError};
