use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveTime};

use super::super::data::WizardData;
use super::super::domain::{
    AttendancePattern, ChildInfo, HealthInfo, NutritionInfo, ParentInfo, RankedContact,
    SignatureRole, SignaturesData,
};
use super::super::steps::{StepId, WIZARD_STEPS};
use super::policy::ValidationPolicy;

fn blank(value: &str) -> bool {
    value.trim().is_empty()
}

pub(crate) fn child_info(child: &ChildInfo) -> Vec<String> {
    let mut errors = Vec::new();

    if blank(&child.child_first_name) {
        errors.push("Child first name is required".to_string());
    }
    if blank(&child.child_last_name) {
        errors.push("Child last name is required".to_string());
    }
    if blank(&child.child_date_of_birth) {
        errors.push("Child date of birth is required".to_string());
    } else if NaiveDate::parse_from_str(child.child_date_of_birth.trim(), "%Y-%m-%d").is_err() {
        errors.push(format!(
            "Child date of birth '{}' must use YYYY-MM-DD",
            child.child_date_of_birth.trim()
        ));
    }

    errors
}

pub(crate) fn parent(label: &str, parent: &ParentInfo) -> Vec<String> {
    let mut errors = Vec::new();

    if blank(&parent.first_name) {
        errors.push(format!("{label}: first name is required"));
    }
    if blank(&parent.last_name) {
        errors.push(format!("{label}: last name is required"));
    }
    if blank(&parent.relationship) {
        errors.push(format!("{label}: relationship to the child is required"));
    }
    if parent.phones().next().is_none() {
        errors.push(format!("{label}: at least one phone number is required"));
    }
    if blank(&parent.email) {
        errors.push(format!("{label}: email is required"));
    } else if !parent.email.contains('@') {
        errors.push(format!("{label}: email '{}' is not valid", parent.email.trim()));
    }

    errors
}

pub(crate) fn optional_parent(label: &str, candidate: Option<&ParentInfo>) -> Vec<String> {
    match candidate {
        Some(info) if !info.is_blank() => parent(label, info),
        _ => Vec::new(),
    }
}

pub(crate) fn ranked_contacts<C: RankedContact>(label: &str, contacts: &[C]) -> Vec<String> {
    let mut errors = Vec::new();
    let mut seen: BTreeMap<u32, usize> = BTreeMap::new();

    for (index, contact) in contacts.iter().enumerate() {
        let position = index + 1;
        if blank(contact.name()) {
            errors.push(format!("{label} {position}: name is required"));
        }
        if blank(contact.relationship()) {
            errors.push(format!("{label} {position}: relationship is required"));
        }
        if blank(contact.phone()) {
            errors.push(format!("{label} {position}: phone is required"));
        }

        let priority = contact.priority();
        if priority == 0 {
            errors.push(format!("{label} {position}: priority must be 1 or higher"));
        } else if let Some(first) = seen.insert(priority, position) {
            errors.push(format!(
                "{label} {position}: priority {priority} is already used by {label} {first}"
            ));
        }
    }

    errors
}

pub(crate) fn emergency_contacts<C: RankedContact>(
    contacts: &[C],
    policy: &ValidationPolicy,
) -> Vec<String> {
    let mut errors = Vec::new();
    if contacts.len() < policy.min_emergency_contacts {
        errors.push(format!(
            "At least {} emergency contacts are required ({} provided)",
            policy.min_emergency_contacts,
            contacts.len()
        ));
    }
    errors.extend(ranked_contacts("Emergency contact", contacts));
    errors
}

pub(crate) fn health(health: &HealthInfo) -> Vec<String> {
    let mut errors = Vec::new();

    if health.has_epi_pen && blank(&health.epi_pen_instructions) {
        errors.push("EpiPen instructions are required when the child has an EpiPen".to_string());
    }
    for (index, allergy) in health.allergies.iter().enumerate() {
        if blank(&allergy.allergen) {
            errors.push(format!("Allergy {}: allergen is required", index + 1));
        }
    }
    for (index, medication) in health.medications.iter().enumerate() {
        if blank(&medication.name) {
            errors.push(format!("Medication {}: name is required", index + 1));
        }
    }

    errors
}

pub(crate) fn nutrition(nutrition: &NutritionInfo, policy: &ValidationPolicy) -> Vec<String> {
    nutrition
        .free_text_fields()
        .iter()
        .filter(|(_, text)| text.chars().count() > policy.max_free_text_len)
        .map(|(label, _)| {
            format!(
                "{label} must be at most {} characters",
                policy.max_free_text_len
            )
        })
        .collect()
}

fn parse_clock(raw: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(raw.trim(), "%H:%M").ok()
}

pub(crate) fn attendance(pattern: &AttendancePattern, policy: &ValidationPolicy) -> Vec<String> {
    let mut errors = Vec::new();

    if pattern.total_periods() == 0 {
        errors.push("Select at least one morning or afternoon attendance period".to_string());
    }

    if pattern.is_full_time(policy.full_time_periods) {
        let hours_ok = pattern
            .expected_hours_per_week
            .is_some_and(|hours| hours.is_finite() && hours > 0.0);
        if !hours_ok {
            errors.push(
                "Expected hours per week must be a positive number for full-time attendance"
                    .to_string(),
            );
        }
    } else if let Some(hours) = pattern.expected_hours_per_week {
        if !hours.is_finite() || hours < 0.0 {
            errors.push("Expected hours per week cannot be negative".to_string());
        }
    }

    let arrival = (!blank(&pattern.expected_arrival_time))
        .then(|| parse_clock(&pattern.expected_arrival_time));
    let departure = (!blank(&pattern.expected_departure_time))
        .then(|| parse_clock(&pattern.expected_departure_time));

    if let Some(None) = arrival {
        errors.push("Expected arrival time must use HH:MM".to_string());
    }
    if let Some(None) = departure {
        errors.push("Expected departure time must use HH:MM".to_string());
    }
    if let (Some(Some(arrival)), Some(Some(departure))) = (arrival, departure) {
        if arrival >= departure {
            errors.push("Expected arrival time must be before departure time".to_string());
        }
    }

    errors
}

pub(crate) fn signatures(
    signatures: &SignaturesData,
    has_parent2: bool,
    policy: &ValidationPolicy,
) -> Vec<String> {
    let mut errors = Vec::new();

    let required = SignatureRole::ordered().into_iter().filter(|role| match role {
        SignatureRole::Parent1 => true,
        SignatureRole::Parent2 => has_parent2,
        SignatureRole::Director => policy.require_director_signature,
    });

    for role in required {
        match signatures.block(role) {
            None => errors.push(format!("{} signature is required", role.label())),
            Some(block) => {
                if blank(&block.signer_name) {
                    errors.push(format!("{} signer name is required", role.label()));
                }
                if blank(&block.signature_data) {
                    errors.push(format!("{} signature is empty", role.label()));
                }
            }
        }
    }

    if !signatures.agree_to_terms {
        errors.push("You must agree to the enrollment terms before signing".to_string());
    }

    errors
}

/// Optional steps report nothing while left empty, so a filled-in optional step is held to
/// the same rules as a mandatory one here.
pub(crate) fn review(data: &WizardData, policy: &ValidationPolicy) -> Vec<String> {
    let mut errors: Vec<String> = WIZARD_STEPS
        .iter()
        .filter(|definition| definition.id != StepId::Review)
        .filter(|definition| !super::validate_step(definition.id, data, policy).is_empty())
        .map(|definition| format!("{} is incomplete", definition.label))
        .collect();

    if data.has_parent2()
        && data.parent1.is_primary_contact
        && data
            .parent2
            .as_ref()
            .is_some_and(|parent| parent.is_primary_contact)
    {
        errors.push("Only one parent can be the primary contact".to_string());
    }

    errors
}
