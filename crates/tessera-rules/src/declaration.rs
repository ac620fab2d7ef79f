//! Raw rule declarations and the arguments they are invoked with
//!
//! A declaration is a described procedure plus the typed references it reads
//! or writes. The procedure receives its arguments positionally, in the order
//! the extractor that handles the declaration documents.

use std::any::{Any, type_name};
use std::fmt;
use std::sync::Arc;
use tessera_core::{Instance, ModelReference, ModelType, Result, RuleDescriptor, TesseraError};

/// The procedure behind a rule declaration
pub type RuleInvoker = Arc<dyn Fn(&mut RuleArgs<'_>) -> Result<()> + Send + Sync>;

/// A single positional argument
pub enum RuleArg<'a> {
    /// The subject being configured
    Mutable(&'a mut (dyn Any + Send + Sync)),
    /// A read-only input view
    Immutable(&'a (dyn Any + Send + Sync)),
    /// A value created for this invocation, such as a rule source instance
    Owned(Instance),
}

/// Positional arguments passed to a [`RuleInvoker`]
#[derive(Default)]
pub struct RuleArgs<'a> {
    args: Vec<RuleArg<'a>>,
}

impl<'a> RuleArgs<'a> {
    pub fn new() -> Self {
        Self { args: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            args: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, arg: RuleArg<'a>) {
        self.args.push(arg);
    }

    pub fn len(&self) -> usize {
        self.args.len()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    /// Borrow argument `index` as a `T`
    pub fn get<T: Any>(&self, index: usize) -> Result<&T> {
        let found = match self.args.get(index) {
            Some(RuleArg::Mutable(value)) => (**value).downcast_ref::<T>(),
            Some(RuleArg::Immutable(value)) => (**value).downcast_ref::<T>(),
            Some(RuleArg::Owned(value)) => (**value).downcast_ref::<T>(),
            None => return Err(self.missing(index)),
        };
        found.ok_or_else(|| mismatch::<T>(index))
    }

    /// Mutably borrow argument `index` as a `T`
    ///
    /// Only the subject and owned values can be borrowed mutably.
    pub fn get_mut<T: Any>(&mut self, index: usize) -> Result<&mut T> {
        let missing = self.missing(index);
        let found = match self.args.get_mut(index) {
            Some(RuleArg::Mutable(value)) => (**value).downcast_mut::<T>(),
            Some(RuleArg::Owned(value)) => (**value).downcast_mut::<T>(),
            Some(RuleArg::Immutable(_)) => {
                return Err(TesseraError::rule_argument(index, "is read-only"));
            }
            None => return Err(missing),
        };
        found.ok_or_else(|| mismatch::<T>(index))
    }

    fn missing(&self, index: usize) -> TesseraError {
        TesseraError::rule_argument(
            index,
            format!("is missing, only {} arguments were supplied", self.args.len()),
        )
    }
}

fn mismatch<T>(index: usize) -> TesseraError {
    TesseraError::rule_argument(index, format!("is not a '{}'", type_name::<T>()))
}

/// A raw rule declaration
#[derive(Clone)]
pub struct RuleDeclaration {
    descriptor: RuleDescriptor,
    references: Vec<ModelReference>,
    return_type: Option<ModelType>,
    invoker: RuleInvoker,
}

impl RuleDeclaration {
    pub fn new<F>(descriptor: RuleDescriptor, invoker: F) -> Self
    where
        F: Fn(&mut RuleArgs<'_>) -> Result<()> + Send + Sync + 'static,
    {
        Self {
            descriptor,
            references: Vec::new(),
            return_type: None,
            invoker: Arc::new(invoker),
        }
    }

    /// Append a reference; order is significant
    pub fn reference(mut self, reference: ModelReference) -> Self {
        self.references.push(reference);
        self
    }

    /// Declare that the procedure returns a value
    pub fn returns(mut self, return_type: &ModelType) -> Self {
        self.return_type = Some(return_type.clone());
        self
    }

    pub fn descriptor(&self) -> &RuleDescriptor {
        &self.descriptor
    }

    pub fn references(&self) -> &[ModelReference] {
        &self.references
    }

    pub fn return_type(&self) -> Option<&ModelType> {
        self.return_type.as_ref()
    }

    /// The first reference, which mutation-style rules treat as the subject
    pub fn subject_reference(&self) -> Option<&ModelReference> {
        self.references.first()
    }

    /// Every reference after the subject
    pub fn tail_references(&self) -> &[ModelReference] {
        self.references.get(1..).unwrap_or_default()
    }

    pub fn invoke(&self, args: &mut RuleArgs<'_>) -> Result<()> {
        (self.invoker)(args)
    }
}

impl fmt::Debug for RuleDeclaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleDeclaration")
            .field("descriptor", &self.descriptor.to_string())
            .field(
                "references",
                &self
                    .references
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>(),
            )
            .field("return_type", &self.return_type.as_ref().map(ToString::to_string))
            .finish()
    }
}
