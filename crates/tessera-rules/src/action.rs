//! Model actions built from rule declarations

use crate::declaration::{RuleArg, RuleArgs, RuleDeclaration};
use std::sync::Arc;
use tessera_core::{
    ModelAction, ModelReference, ModelView, MutableModelNode, Result, RuleDescriptor,
};

/// Invokes a declaration with the subject followed by its inputs
///
/// Argument 0 is the mutable subject; arguments 1.. are the input views in
/// declared order.
pub struct MethodBackedModelAction {
    subject: ModelReference,
    inputs: Vec<ModelReference>,
    declaration: RuleDeclaration,
}

impl MethodBackedModelAction {
    pub fn new(
        subject: ModelReference,
        inputs: Vec<ModelReference>,
        declaration: RuleDeclaration,
    ) -> Self {
        Self {
            subject,
            inputs,
            declaration,
        }
    }
}

impl ModelAction for MethodBackedModelAction {
    fn subject(&self) -> &ModelReference {
        &self.subject
    }

    fn inputs(&self) -> &[ModelReference] {
        &self.inputs
    }

    fn descriptor(&self) -> &RuleDescriptor {
        self.declaration.descriptor()
    }

    fn execute(&self, node: &mut MutableModelNode<'_>, inputs: &[ModelView<'_>]) -> Result<()> {
        let mut args = RuleArgs::with_capacity(1 + inputs.len());
        args.push(RuleArg::Mutable(
            node.as_mutable(self.subject.model_type(), self.declaration.descriptor())?,
        ));
        for view in inputs {
            args.push(RuleArg::Immutable(view.instance()));
        }
        self.declaration.invoke(&mut args)
    }
}

type ActionBody =
    dyn Fn(&mut MutableModelNode<'_>, &[ModelView<'_>]) -> Result<()> + Send + Sync;

/// Action whose body works on the subject node directly
pub struct DirectNodeInputUsingModelAction {
    descriptor: RuleDescriptor,
    subject: ModelReference,
    inputs: Vec<ModelReference>,
    body: Arc<ActionBody>,
}

impl DirectNodeInputUsingModelAction {
    pub fn new<F>(
        descriptor: RuleDescriptor,
        subject: ModelReference,
        inputs: Vec<ModelReference>,
        body: F,
    ) -> Self
    where
        F: Fn(&mut MutableModelNode<'_>, &[ModelView<'_>]) -> Result<()> + Send + Sync + 'static,
    {
        Self {
            descriptor,
            subject,
            inputs,
            body: Arc::new(body),
        }
    }
}

impl ModelAction for DirectNodeInputUsingModelAction {
    fn subject(&self) -> &ModelReference {
        &self.subject
    }

    fn inputs(&self) -> &[ModelReference] {
        &self.inputs
    }

    fn descriptor(&self) -> &RuleDescriptor {
        &self.descriptor
    }

    fn execute(&self, node: &mut MutableModelNode<'_>, inputs: &[ModelView<'_>]) -> Result<()> {
        (self.body)(node, inputs)
    }
}
