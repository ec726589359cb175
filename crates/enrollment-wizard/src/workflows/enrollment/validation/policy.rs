use serde::{Deserialize, Serialize};

use crate::config::WizardConfig;

pub const DEFAULT_MAX_FREE_TEXT_LEN: usize = 2_000;

/// Dials the step validators read; everything else about a rule is fixed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationPolicy {
    pub min_emergency_contacts: usize,
    pub full_time_periods: usize,
    pub require_director_signature: bool,
    pub max_free_text_len: usize,
}

impl Default for ValidationPolicy {
    fn default() -> Self {
        Self::from(&WizardConfig::default())
    }
}

impl From<&WizardConfig> for ValidationPolicy {
    fn from(config: &WizardConfig) -> Self {
        Self {
            min_emergency_contacts: config.min_emergency_contacts,
            full_time_periods: config.full_time_periods.max(1),
            require_director_signature: config.require_director_signature,
            max_free_text_len: DEFAULT_MAX_FREE_TEXT_LEN,
        }
    }
}
