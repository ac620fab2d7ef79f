//! Rules produced by extraction

use indexmap::IndexSet;
use std::fmt;
use std::sync::Arc;
use tessera_core::{
    ModelAction, ModelActionRole, ModelPath, ModelRegistry, ModelType, Result, RuleDescriptor,
};
use tracing::debug;

/// Registration performed by a custom rule application
pub type RuleApplicator =
    Arc<dyn Fn(&mut dyn ModelRegistry, &ModelPath) -> Result<()> + Send + Sync>;

/// What applying a rule does to the registry
#[derive(Clone)]
pub enum RuleApplication {
    /// Queue a model action against its subject at `role`
    Action {
        role: ModelActionRole,
        action: Arc<dyn ModelAction>,
    },
    /// Talk to the registry directly
    Custom(RuleApplicator),
}

impl RuleApplication {
    pub fn custom<F>(applicator: F) -> Self
    where
        F: Fn(&mut dyn ModelRegistry, &ModelPath) -> Result<()> + Send + Sync + 'static,
    {
        RuleApplication::Custom(Arc::new(applicator))
    }
}

impl fmt::Debug for RuleApplication {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleApplication::Action { role, action } => f
                .debug_struct("Action")
                .field("role", role)
                .field("action", action)
                .finish(),
            RuleApplication::Custom(_) => f.write_str("Custom"),
        }
    }
}

/// A validated, executable rule
///
/// Holds no state beyond what its application captured. Applying registers
/// the rule once per call.
#[derive(Debug, Clone)]
pub struct ExtractedRule {
    descriptor: RuleDescriptor,
    dependencies: IndexSet<ModelType>,
    application: RuleApplication,
}

impl ExtractedRule {
    pub fn new(descriptor: RuleDescriptor, application: RuleApplication) -> Self {
        Self {
            descriptor,
            dependencies: IndexSet::new(),
            application,
        }
    }

    /// Rule sources that must be applied before this rule
    pub fn with_dependencies(mut self, dependencies: impl IntoIterator<Item = ModelType>) -> Self {
        self.dependencies.extend(dependencies);
        self
    }

    pub fn descriptor(&self) -> &RuleDescriptor {
        &self.descriptor
    }

    pub fn dependencies(&self) -> &IndexSet<ModelType> {
        &self.dependencies
    }

    pub fn application(&self) -> &RuleApplication {
        &self.application
    }

    /// Role of the registered action, for action-based rules
    pub fn role(&self) -> Option<ModelActionRole> {
        match &self.application {
            RuleApplication::Action { role, .. } => Some(*role),
            RuleApplication::Custom(_) => None,
        }
    }

    /// Register the rule with `registry`, resolving references within `scope`
    pub fn apply(&self, registry: &mut dyn ModelRegistry, scope: &ModelPath) -> Result<()> {
        debug!("Applying rule {} in scope '{}'", self.descriptor, scope);
        match &self.application {
            RuleApplication::Action { role, action } => {
                registry.configure(*role, Arc::clone(action), scope)
            }
            RuleApplication::Custom(applicator) => applicator(registry, scope),
        }
    }
}
