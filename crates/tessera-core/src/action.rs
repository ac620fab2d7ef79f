//! Executable model actions and the views they receive

use crate::descriptor::RuleDescriptor;
use crate::error::TesseraError;
use crate::path::ModelPath;
use crate::reference::ModelReference;
use crate::result::Result;
use crate::types::ModelType;
use std::any::Any;
use std::fmt;

/// Read-only view of a realized model node
pub struct ModelView<'a> {
    path: &'a ModelPath,
    model_type: &'a ModelType,
    instance: &'a (dyn Any + Send + Sync),
}

impl<'a> ModelView<'a> {
    pub fn new(
        path: &'a ModelPath,
        model_type: &'a ModelType,
        instance: &'a (dyn Any + Send + Sync),
    ) -> Self {
        Self {
            path,
            model_type,
            instance,
        }
    }

    pub fn path(&self) -> &ModelPath {
        self.path
    }

    pub fn model_type(&self) -> &ModelType {
        self.model_type
    }

    /// The underlying instance
    pub fn instance(&self) -> &'a (dyn Any + Send + Sync) {
        self.instance
    }

    pub fn downcast<T: Any>(&self) -> Option<&'a T> {
        self.instance.downcast_ref::<T>()
    }
}

impl fmt::Debug for ModelView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelView")
            .field("path", &self.path.to_string())
            .field("type", &self.model_type.to_string())
            .finish()
    }
}

/// The subject node handed to an executing action
///
/// Gives mutable access to the node's value and lets the action request
/// that a rule source be applied to the node once the action returns.
pub struct MutableModelNode<'a> {
    path: &'a ModelPath,
    model_type: &'a ModelType,
    value: &'a mut (dyn Any + Send + Sync),
    applied_rule_sources: &'a mut Vec<ModelType>,
}

impl<'a> MutableModelNode<'a> {
    pub fn new(
        path: &'a ModelPath,
        model_type: &'a ModelType,
        value: &'a mut (dyn Any + Send + Sync),
        applied_rule_sources: &'a mut Vec<ModelType>,
    ) -> Self {
        Self {
            path,
            model_type,
            value,
            applied_rule_sources,
        }
    }

    pub fn path(&self) -> &ModelPath {
        self.path
    }

    pub fn model_type(&self) -> &ModelType {
        self.model_type
    }

    /// Mutable access to the node value, viewed as `requested`
    pub fn as_mutable(
        &mut self,
        requested: &ModelType,
        descriptor: &RuleDescriptor,
    ) -> Result<&mut (dyn Any + Send + Sync)> {
        self.check_view(requested, descriptor)?;
        Ok(&mut *self.value)
    }

    /// Immutable view of the node, viewed as `requested`
    pub fn as_immutable(
        &self,
        requested: &ModelType,
        descriptor: &RuleDescriptor,
    ) -> Result<ModelView<'_>> {
        self.check_view(requested, descriptor)?;
        Ok(ModelView::new(self.path, self.model_type, &*self.value))
    }

    /// Apply the rules of `rule_source` to this node after the current action
    pub fn apply_to_self(&mut self, rule_source: ModelType) {
        self.applied_rule_sources.push(rule_source);
    }

    fn check_view(&self, requested: &ModelType, descriptor: &RuleDescriptor) -> Result<()> {
        if requested.is_assignable_from(self.model_type) {
            Ok(())
        } else {
            Err(TesseraError::ViewTypeMismatch {
                path: self.path.to_string(),
                requested: requested.to_string(),
                actual: self.model_type.to_string(),
                descriptor: descriptor.to_string(),
            })
        }
    }
}

/// A runtime-executable unit bound to a subject and its inputs
pub trait ModelAction: Send + Sync {
    fn subject(&self) -> &ModelReference;

    fn inputs(&self) -> &[ModelReference];

    fn descriptor(&self) -> &RuleDescriptor;

    /// Run the action; `inputs` are positionally aligned with [`ModelAction::inputs`]
    fn execute(&self, node: &mut MutableModelNode<'_>, inputs: &[ModelView<'_>]) -> Result<()>;
}

impl fmt::Debug for dyn ModelAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelAction")
            .field("descriptor", &self.descriptor().to_string())
            .field("subject", &self.subject().to_string())
            .field("inputs", &self.inputs().len())
            .finish()
    }
}
