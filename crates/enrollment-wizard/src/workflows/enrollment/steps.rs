use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifier for one page of the enrollment wizard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StepId {
    ChildInfo,
    #[serde(rename = "parent-1")]
    Parent1,
    #[serde(rename = "parent-2")]
    Parent2,
    AuthorizedPickups,
    EmergencyContacts,
    Health,
    Nutrition,
    Attendance,
    Signatures,
    Review,
}

impl StepId {
    pub const fn ordered() -> [Self; STEP_COUNT] {
        [
            Self::ChildInfo,
            Self::Parent1,
            Self::Parent2,
            Self::AuthorizedPickups,
            Self::EmergencyContacts,
            Self::Health,
            Self::Nutrition,
            Self::Attendance,
            Self::Signatures,
            Self::Review,
        ]
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ChildInfo => "child-info",
            Self::Parent1 => "parent-1",
            Self::Parent2 => "parent-2",
            Self::AuthorizedPickups => "authorized-pickups",
            Self::EmergencyContacts => "emergency-contacts",
            Self::Health => "health",
            Self::Nutrition => "nutrition",
            Self::Attendance => "attendance",
            Self::Signatures => "signatures",
            Self::Review => "review",
        }
    }

    /// Zero-based position of the step in [`WIZARD_STEPS`].
    pub const fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ordered().get(index).copied()
    }

    pub fn definition(self) -> &'static StepDefinition {
        &WIZARD_STEPS[self.index()]
    }

    pub fn is_optional(self) -> bool {
        self.definition().is_optional
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown wizard step '{0}'")]
pub struct UnknownStep(pub String);

impl FromStr for StepId {
    type Err = UnknownStep;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Self::ordered()
            .into_iter()
            .find(|step| step.as_str() == raw.trim())
            .ok_or_else(|| UnknownStep(raw.to_string()))
    }
}

/// Static description of a wizard step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepDefinition {
    pub id: StepId,
    pub label: &'static str,
    pub is_optional: bool,
}

impl StepDefinition {
    pub fn lookup(id: StepId) -> &'static StepDefinition {
        id.definition()
    }
}

pub const STEP_COUNT: usize = 10;

pub static WIZARD_STEPS: [StepDefinition; STEP_COUNT] = [
    StepDefinition {
        id: StepId::ChildInfo,
        label: "Child Information",
        is_optional: false,
    },
    StepDefinition {
        id: StepId::Parent1,
        label: "Parent / Guardian 1",
        is_optional: false,
    },
    StepDefinition {
        id: StepId::Parent2,
        label: "Parent / Guardian 2",
        is_optional: true,
    },
    StepDefinition {
        id: StepId::AuthorizedPickups,
        label: "Authorized Pickups",
        is_optional: false,
    },
    StepDefinition {
        id: StepId::EmergencyContacts,
        label: "Emergency Contacts",
        is_optional: false,
    },
    StepDefinition {
        id: StepId::Health,
        label: "Health Information",
        is_optional: false,
    },
    StepDefinition {
        id: StepId::Nutrition,
        label: "Nutrition",
        is_optional: false,
    },
    StepDefinition {
        id: StepId::Attendance,
        label: "Attendance Schedule",
        is_optional: false,
    },
    StepDefinition {
        id: StepId::Signatures,
        label: "Signatures",
        is_optional: false,
    },
    StepDefinition {
        id: StepId::Review,
        label: "Review & Submit",
        is_optional: false,
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_has_ten_steps_with_one_optional() {
        assert_eq!(WIZARD_STEPS.len(), 10);
        let optional: Vec<StepId> = WIZARD_STEPS
            .iter()
            .filter(|step| step.is_optional)
            .map(|step| step.id)
            .collect();
        assert_eq!(optional, vec![StepId::Parent2]);
        assert_eq!(WIZARD_STEPS.iter().filter(|step| !step.is_optional).count(), 9);
    }

    #[test]
    fn registry_order_matches_step_indices() {
        for (index, definition) in WIZARD_STEPS.iter().enumerate() {
            assert_eq!(definition.id.index(), index);
            assert_eq!(StepId::from_index(index), Some(definition.id));
        }
        assert_eq!(StepId::from_index(STEP_COUNT), None);
    }

    #[test]
    fn ids_round_trip_through_strings_and_serde() {
        for step in StepId::ordered() {
            assert_eq!(step.as_str().parse::<StepId>(), Ok(step));
            let json = serde_json::to_string(&step).expect("serialize step id");
            assert_eq!(json, format!("\"{}\"", step.as_str()));
        }
        assert!("parent-3".parse::<StepId>().is_err());
    }

    #[test]
    fn lookup_returns_labels() {
        assert_eq!(StepDefinition::lookup(StepId::Health).label, "Health Information");
        assert!(StepDefinition::lookup(StepId::Parent2).is_optional);
    }
}
