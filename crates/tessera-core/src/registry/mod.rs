//! Model registry contract
//!
//! The registry owns the model graph. Extracted rules only talk to it through
//! [`ModelRegistry::configure`], which queues a model action against a
//! subject at a given role. [`DefaultModelRegistry`] is a minimal in-memory
//! implementation that binds references and runs actions in phase order.

mod default;

pub use default::{DefaultModelRegistry, RegisteredAction};

use crate::action::ModelAction;
use crate::error::TesseraError;
use crate::path::ModelPath;
use crate::result::Result;
use crate::role::ModelActionRole;
use crate::types::{Instance, ModelType};
use std::sync::Arc;

/// Sink for rules produced by extraction
pub trait ModelRegistry {
    /// Queue `action` to run against its subject at `role`
    ///
    /// References held by the action are resolved relative to `scope`.
    fn configure(
        &mut self,
        role: ModelActionRole,
        action: Arc<dyn ModelAction>,
        scope: &ModelPath,
    ) -> Result<()>;

    /// Access to constructible type registration, when supported
    fn constructible_types(&mut self) -> Option<&mut dyn ConstructibleTypesRegistry> {
        None
    }
}

/// Creates the initial value of nodes of a public type
#[derive(Debug, Clone)]
pub struct NodeInitializer {
    public_type: ModelType,
    implementation: ModelType,
}

impl NodeInitializer {
    pub fn new(public_type: ModelType, implementation: ModelType) -> Self {
        Self {
            public_type,
            implementation,
        }
    }

    pub fn public_type(&self) -> &ModelType {
        &self.public_type
    }

    pub fn implementation(&self) -> &ModelType {
        &self.implementation
    }

    /// Build a fresh value from the implementation's constructor
    pub fn initialize(&self) -> Result<Instance> {
        self.implementation
            .new_instance()
            .ok_or_else(|| TesseraError::NotConstructible {
                model_type: self.implementation.to_string(),
            })
    }
}

/// Registry of types the model knows how to instantiate
pub trait ConstructibleTypesRegistry {
    fn register_constructible_type(&mut self, model_type: ModelType, initializer: NodeInitializer);
}

/// Applies the rules of a rule source type to a node
///
/// Installed on a registry so that actions can ask for a rule source to be
/// layered onto their subject node.
pub trait RuleSourceApplier: Send + Sync {
    fn apply_rule_source(
        &self,
        registry: &mut dyn ModelRegistry,
        scope: &ModelPath,
        rule_source: &ModelType,
    ) -> Result<()>;
}
