//! Rule extractors
//!
//! Each extractor accepts one declaration shape. Mutation-style and
//! delegating extractors record every structural problem with the
//! declaration and produce no rule when any were found. The
//! type-registration extractor stops at its first structural error.

mod mutation;
mod rule_definition;
mod type_registration;

pub use mutation::MutationRuleExtractor;
pub use rule_definition::RuleDefinitionRuleExtractor;
pub use type_registration::{TypeModelRuleExtractor, TypeRegistration, TypeRegistrationVariant};

use crate::declaration::RuleDeclaration;
use crate::extracted::ExtractedRule;
use crate::problems::ValidationProblemCollector;
use tessera_core::Result;

/// The closed set of extractor variants
pub enum RuleExtractor {
    Mutation(MutationRuleExtractor),
    RuleDefinition(RuleDefinitionRuleExtractor),
    TypeRegistration(TypeModelRuleExtractor),
}

impl RuleExtractor {
    /// Kind of rule declaration this extractor handles, e.g. `mutate`
    pub fn kind(&self) -> &str {
        match self {
            RuleExtractor::Mutation(extractor) => extractor.kind(),
            RuleExtractor::RuleDefinition(extractor) => extractor.kind(),
            RuleExtractor::TypeRegistration(extractor) => extractor.kind(),
        }
    }

    /// Turn a declaration into a rule
    ///
    /// `Ok(None)` means the declaration was rejected with problems recorded
    /// in `problems`, or that there was nothing to register.
    pub fn registration(
        &self,
        declaration: &RuleDeclaration,
        problems: &mut ValidationProblemCollector,
    ) -> Result<Option<ExtractedRule>> {
        match self {
            RuleExtractor::Mutation(extractor) => Ok(extractor.registration(declaration, problems)),
            RuleExtractor::RuleDefinition(extractor) => {
                Ok(extractor.registration(declaration, problems))
            }
            RuleExtractor::TypeRegistration(extractor) => extractor.registration(declaration),
        }
    }
}

impl From<MutationRuleExtractor> for RuleExtractor {
    fn from(extractor: MutationRuleExtractor) -> Self {
        RuleExtractor::Mutation(extractor)
    }
}

impl From<RuleDefinitionRuleExtractor> for RuleExtractor {
    fn from(extractor: RuleDefinitionRuleExtractor) -> Self {
        RuleExtractor::RuleDefinition(extractor)
    }
}

impl From<TypeModelRuleExtractor> for RuleExtractor {
    fn from(extractor: TypeModelRuleExtractor) -> Self {
        RuleExtractor::TypeRegistration(extractor)
    }
}

/// Record a problem when the declaration returns a value
fn validate_is_void(
    declaration: &RuleDeclaration,
    description: &str,
    problems: &mut ValidationProblemCollector,
) {
    if declaration.return_type().is_some() {
        problems.add(format!("A method {description} must have void return type."));
    }
}
