//! Registration variants for type registration rules
//!
//! [`ComponentTypeRegistration`] records registered types on a
//! [`TypeFactory`] node, so that later rules can create instances of the
//! public type. [`ConstructibleTypeRegistration`] hands the type straight to
//! a registry that supports constructible types.

use crate::action::DirectNodeInputUsingModelAction;
use crate::declaration::RuleDeclaration;
use crate::extracted::{ExtractedRule, RuleApplication};
use crate::extractor::{TypeRegistration, TypeRegistrationVariant};
use indexmap::{IndexMap, IndexSet};
use once_cell::sync::Lazy;
use std::sync::Arc;
use tessera_core::{
    Instance, ModelActionRole, ModelReference, ModelType, NodeInitializer, Result,
    RuleDescriptor, TesseraError,
};
use tracing::debug;

static TYPE_FACTORY: Lazy<ModelType> = Lazy::new(|| {
    ModelType::class("TypeFactory")
        .constructor(TypeFactory::default)
        .build()
});

/// Model type of [`TypeFactory`] nodes
pub fn type_factory_type() -> &'static ModelType {
    &TYPE_FACTORY
}

/// A type registered with a [`TypeFactory`]
#[derive(Debug, Clone, PartialEq)]
pub struct TypeFactoryEntry {
    pub public_type: ModelType,
    pub implementation: Option<ModelType>,
    pub internal_views: Vec<ModelType>,
    /// Rule that registered the type
    pub descriptor: RuleDescriptor,
}

/// Registry of public types and the implementations that back them
#[derive(Debug, Default)]
pub struct TypeFactory {
    entries: IndexMap<ModelType, TypeFactoryEntry>,
}

impl TypeFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a public type; each type can be registered once
    pub fn register(&mut self, entry: TypeFactoryEntry) -> Result<()> {
        if let Some(existing) = self.entries.get(&entry.public_type) {
            return Err(TesseraError::invalid_model(format!(
                "Cannot register implementation for type '{}' because an implementation for this type was already registered by {}",
                entry.public_type, existing.descriptor
            )));
        }
        debug!(
            "Registered type '{}' from {}",
            entry.public_type, entry.descriptor
        );
        self.entries.insert(entry.public_type.clone(), entry);
        Ok(())
    }

    pub fn entry(&self, public_type: &ModelType) -> Option<&TypeFactoryEntry> {
        self.entries.get(public_type)
    }

    pub fn implementation_for(&self, public_type: &ModelType) -> Option<&ModelType> {
        self.entry(public_type)
            .and_then(|entry| entry.implementation.as_ref())
    }

    /// Public types in registration order
    pub fn public_types(&self) -> impl Iterator<Item = &ModelType> {
        self.entries.keys()
    }

    /// Instantiate the implementation registered for `public_type`
    pub fn create(&self, public_type: &ModelType) -> Result<Instance> {
        self.implementation_for(public_type)
            .and_then(ModelType::new_instance)
            .ok_or_else(|| TesseraError::NotConstructible {
                model_type: public_type.to_string(),
            })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Records registrations on a [`TypeFactory`] node at the `Defaults` role
#[derive(Debug, Clone)]
pub struct ComponentTypeRegistration {
    factory: ModelReference,
    dependencies: IndexSet<ModelType>,
}

impl ComponentTypeRegistration {
    /// Register with the factory node at `factory`
    pub fn new(factory: ModelReference) -> Self {
        Self {
            factory,
            dependencies: IndexSet::new(),
        }
    }

    /// Require a rule source to be applied before the registration
    pub fn with_dependency(mut self, rule_source: &ModelType) -> Self {
        self.dependencies.insert(rule_source.clone());
        self
    }

    pub fn factory(&self) -> &ModelReference {
        &self.factory
    }
}

impl Default for ComponentTypeRegistration {
    /// Bind to the single [`TypeFactory`] node in scope
    fn default() -> Self {
        Self::new(ModelReference::of_type(type_factory_type()))
    }
}

impl TypeRegistrationVariant for ComponentTypeRegistration {
    fn create_registration(
        &self,
        declaration: &RuleDeclaration,
        registration: TypeRegistration,
    ) -> Result<Option<ExtractedRule>> {
        let descriptor = declaration.descriptor().clone();
        let entry = TypeFactoryEntry {
            public_type: registration.declared_type,
            implementation: registration.implementation,
            internal_views: registration.internal_views,
            descriptor: descriptor.clone(),
        };
        let factory_type = self.factory.model_type().clone();
        let action = DirectNodeInputUsingModelAction::new(
            descriptor.clone(),
            self.factory.clone(),
            Vec::new(),
            move |node, _| {
                let path = node.path().clone();
                let factory = node
                    .as_mutable(&factory_type, &entry.descriptor)?
                    .downcast_mut::<TypeFactory>()
                    .ok_or_else(|| {
                        TesseraError::internal_error(format!(
                            "model node '{path}' does not hold a TypeFactory"
                        ))
                    })?;
                factory.register(entry.clone())
            },
        );

        Ok(Some(
            ExtractedRule::new(
                descriptor,
                RuleApplication::Action {
                    role: ModelActionRole::Defaults,
                    action: Arc::new(action),
                },
            )
            .with_dependencies(self.dependencies.iter().cloned()),
        ))
    }
}

/// Registers the type as constructible with the registry itself
///
/// Types registered without a default implementation cannot be constructed,
/// so they produce no rule.
#[derive(Debug, Clone, Default)]
pub struct ConstructibleTypeRegistration;

impl TypeRegistrationVariant for ConstructibleTypeRegistration {
    fn create_registration(
        &self,
        declaration: &RuleDeclaration,
        registration: TypeRegistration,
    ) -> Result<Option<ExtractedRule>> {
        let Some(implementation) = registration.implementation else {
            debug!(
                "Type '{}' has no default implementation, nothing to register",
                registration.declared_type
            );
            return Ok(None);
        };
        let public_type = registration.declared_type;

        Ok(Some(ExtractedRule::new(
            declaration.descriptor().clone(),
            RuleApplication::custom(move |registry, _scope| {
                let types = registry.constructible_types().ok_or_else(|| {
                    TesseraError::internal_error(format!(
                        "cannot register constructible type '{public_type}': registry does not support constructible types"
                    ))
                })?;
                types.register_constructible_type(
                    public_type.clone(),
                    NodeInitializer::new(public_type.clone(), implementation.clone()),
                );
                Ok(())
            }),
        )))
    }
}
