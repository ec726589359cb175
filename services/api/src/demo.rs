use crate::infra::InMemoryEnrollmentRepository;
use clap::Args;
use enrollment_wizard::config::WizardConfig;
use enrollment_wizard::error::AppError;
use enrollment_wizard::workflows::enrollment::{
    EnrollmentFormView, EnrollmentIntake, EnrollmentWizard, IntakeError, SignatureRole, StepId,
    WizardOptions, WIZARD_STEPS,
};
use serde_json::{json, Value};
use std::sync::Arc;

const DEMO_SIGNATURE: &str = "data:image/png;base64,iVBORw0KGgo=";

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Fill in the optional second parent and collect their signature.
    #[arg(long)]
    pub(crate) with_second_parent: bool,
}

pub(crate) fn print_steps() -> Result<(), AppError> {
    println!("Enrollment wizard steps");
    for (index, step) in WIZARD_STEPS.iter().enumerate() {
        let marker = if step.is_optional { " (optional)" } else { "" };
        println!("{:>2}. {:<20} {}{}", index + 1, step.id, step.label, marker);
    }
    Ok(())
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let config = WizardConfig::default();
    let repository = Arc::new(InMemoryEnrollmentRepository::default());
    let intake = Arc::new(EnrollmentIntake::new(
        repository.clone(),
        config.form_validity_days,
    ));

    let mut wizard = EnrollmentWizard::new(
        WizardOptions {
            person_id: "person-17".to_string(),
            family_id: "family-4".to_string(),
            ..WizardOptions::default()
        },
        config.validation_policy(),
        intake,
    );

    println!("Enrollment wizard demo");
    for step in StepId::ordered() {
        if let Some(changes) = demo_changes(step, args.with_second_parent) {
            wizard.update_step(step, changes)?;
        }
        if step == StepId::Signatures {
            wizard.sign(SignatureRole::Parent1, "Claire Martin", DEMO_SIGNATURE)?;
            if args.with_second_parent {
                wizard.sign(SignatureRole::Parent2, "Julien Martin", DEMO_SIGNATURE)?;
            }
        }

        let controls = wizard.controls();
        println!(
            "- [{:>3}%] {} complete",
            controls.progress_percent,
            step.definition().label
        );
        if step != StepId::Review {
            wizard.next()?;
        }
    }

    wizard.submit().await?;
    println!("\nSubmission accepted");

    let forms = repository.forms().map_err(IntakeError::from)?;
    for form in &forms {
        let view = EnrollmentFormView::from(form);
        println!("{}", serde_json::to_string_pretty(&view)?);
    }

    Ok(())
}

fn demo_changes(step: StepId, with_second_parent: bool) -> Option<Value> {
    let changes = match step {
        StepId::ChildInfo => json!({
            "childFirstName": "Sophie",
            "childLastName": "Martin",
            "childDateOfBirth": "2021-03-15",
            "languagesSpoken": "French, English",
        }),
        StepId::Parent1 => json!({
            "firstName": "Claire",
            "lastName": "Martin",
            "relationship": "Mother",
            "cellPhone": "514-555-0101",
            "email": "claire.martin@example.com",
            "isPrimaryContact": true,
            "hasCustody": true,
        }),
        StepId::Parent2 if with_second_parent => json!({
            "firstName": "Julien",
            "lastName": "Martin",
            "relationship": "Father",
            "workPhone": "514-555-0199",
            "email": "julien.martin@example.com",
            "hasCustody": true,
        }),
        StepId::EmergencyContacts => json!({
            "emergencyContacts": [
                { "name": "Monique Tremblay", "relationship": "Grandmother", "phone": "514-555-0142", "priority": 1 },
                { "name": "Paul Gagnon", "relationship": "Neighbour", "phone": "514-555-0177", "priority": 2 },
            ]
        }),
        StepId::Attendance => json!({ "mondayAm": true }),
        StepId::Signatures => json!({ "agreeToTerms": true }),
        _ => return None,
    };
    Some(changes)
}
