use super::validate_is_void;
use crate::action::MethodBackedModelAction;
use crate::declaration::RuleDeclaration;
use crate::extracted::{ExtractedRule, RuleApplication};
use crate::problems::ValidationProblemCollector;
use std::sync::Arc;
use tessera_core::ModelActionRole;
use tracing::debug;

/// Binds a rule to an existing subject at a fixed role
///
/// The first reference is the subject, the rest are inputs.
#[derive(Debug, Clone)]
pub struct MutationRuleExtractor {
    kind: &'static str,
    role: ModelActionRole,
    description: &'static str,
}

impl MutationRuleExtractor {
    pub fn defaults() -> Self {
        Self::new("defaults", ModelActionRole::Defaults)
    }

    pub fn mutate() -> Self {
        Self::new("mutate", ModelActionRole::Mutate)
    }

    pub fn finalize() -> Self {
        Self::new("finalize", ModelActionRole::Finalize)
    }

    pub fn validate() -> Self {
        Self::new("validate", ModelActionRole::Validate)
    }

    fn new(kind: &'static str, role: ModelActionRole) -> Self {
        let description = match role {
            ModelActionRole::Defaults => "declared with #[defaults]",
            ModelActionRole::Finalize => "declared with #[finalize]",
            ModelActionRole::Validate => "declared with #[validate]",
            _ => "declared with #[mutate]",
        };
        Self {
            kind,
            role,
            description,
        }
    }

    pub fn kind(&self) -> &str {
        self.kind
    }

    pub fn role(&self) -> ModelActionRole {
        self.role
    }

    pub fn description(&self) -> &str {
        self.description
    }

    pub fn registration(
        &self,
        declaration: &RuleDeclaration,
        problems: &mut ValidationProblemCollector,
    ) -> Option<ExtractedRule> {
        validate_is_void(declaration, self.description, problems);
        let Some(subject) = declaration.subject_reference() else {
            problems.add(format!(
                "A method {} must have at least one parameter",
                self.description
            ));
            return None;
        };
        if problems.has_problems() {
            return None;
        }

        debug!("Extracted {} rule {}", self.role, declaration.descriptor());
        let action = MethodBackedModelAction::new(
            subject.clone(),
            declaration.tail_references().to_vec(),
            declaration.clone(),
        );
        Some(ExtractedRule::new(
            declaration.descriptor().clone(),
            RuleApplication::Action {
                role: self.role,
                action: Arc::new(action),
            },
        ))
    }
}
