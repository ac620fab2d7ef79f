//! Tessera Rules
//!
//! Rule extraction for the tessera model engine. Raw rule declarations are
//! validated by a [`RuleExtractor`] and turned into [`ExtractedRule`]s, which
//! register [`tessera_core::ModelAction`]s with a model registry when applied.
//!
//! Rule sources group declarations; [`ModelRuleExtractor`] extracts a whole
//! source at once and [`RuleApplicationPlan`] applies several sources in
//! dependency order.

pub mod action;
pub mod builder;
pub mod component;
pub mod declaration;
pub mod extracted;
pub mod extractor;
pub mod plan;
pub mod problems;
pub mod source;

pub use action::{DirectNodeInputUsingModelAction, MethodBackedModelAction};
pub use builder::TypeBuilder;
pub use component::{
    ComponentTypeRegistration, ConstructibleTypeRegistration, TypeFactory, TypeFactoryEntry,
    type_factory_type,
};
pub use declaration::{RuleArg, RuleArgs, RuleDeclaration, RuleInvoker};
pub use extracted::{ExtractedRule, RuleApplication};
pub use extractor::{
    MutationRuleExtractor, RuleDefinitionRuleExtractor, RuleExtractor, TypeModelRuleExtractor,
    TypeRegistration, TypeRegistrationVariant,
};
pub use plan::RuleApplicationPlan;
pub use problems::{ValidationProblem, ValidationProblemCollector};
pub use source::{
    ExtractedRuleSource, ModelRuleExtractor, RuleMethod, RuleSourceApplicator, RuleSourceCatalog,
    RuleSourceDefinition,
};
