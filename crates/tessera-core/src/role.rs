//! Execution phases for model actions

use crate::error::TesseraError;
use crate::result::Result;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Phase at which a model action runs against its subject
///
/// The declaration order below is the default execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ModelActionRole {
    Discover,
    Create,
    Defaults,
    Initialize,
    Mutate,
    Finalize,
    Validate,
}

impl ModelActionRole {
    pub const ALL: [ModelActionRole; 7] = [
        ModelActionRole::Discover,
        ModelActionRole::Create,
        ModelActionRole::Defaults,
        ModelActionRole::Initialize,
        ModelActionRole::Mutate,
        ModelActionRole::Finalize,
        ModelActionRole::Validate,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ModelActionRole::Discover => "discover",
            ModelActionRole::Create => "create",
            ModelActionRole::Defaults => "defaults",
            ModelActionRole::Initialize => "initialize",
            ModelActionRole::Mutate => "mutate",
            ModelActionRole::Finalize => "finalize",
            ModelActionRole::Validate => "validate",
        }
    }
}

impl fmt::Display for ModelActionRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The ordered set of phases a registry executes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseOrder {
    phases: Vec<ModelActionRole>,
}

impl PhaseOrder {
    /// Build a phase order, rejecting empty lists and duplicates
    pub fn new(phases: Vec<ModelActionRole>) -> Result<Self> {
        if phases.is_empty() {
            return Err(TesseraError::config_error(
                "Phase order must contain at least one role",
            ));
        }
        let mut seen = HashSet::new();
        for role in &phases {
            if !seen.insert(*role) {
                return Err(TesseraError::config_error(format!(
                    "Role '{role}' appears more than once in the phase order"
                )));
            }
        }
        Ok(Self { phases })
    }

    /// Position of a role, or `None` when the registry does not run it
    pub fn position(&self, role: ModelActionRole) -> Option<usize> {
        self.phases.iter().position(|r| *r == role)
    }

    pub fn roles(&self) -> &[ModelActionRole] {
        &self.phases
    }

    pub fn len(&self) -> usize {
        self.phases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.phases.is_empty()
    }
}

impl Default for PhaseOrder {
    fn default() -> Self {
        Self {
            phases: ModelActionRole::ALL.to_vec(),
        }
    }
}
