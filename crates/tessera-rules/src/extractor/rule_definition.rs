use super::validate_is_void;
use crate::action::DirectNodeInputUsingModelAction;
use crate::declaration::{RuleArg, RuleArgs, RuleDeclaration};
use crate::extracted::{ExtractedRule, RuleApplication};
use crate::problems::ValidationProblemCollector;
use std::sync::Arc;
use tessera_core::{ModelActionRole, TesseraError, rule_source};
use tracing::debug;

const DESCRIPTION: &str = "declared with #[rules]";

/// Applies a nested rule source to a target node
///
/// The declaration takes `[rule source, target, inputs...]`. At execution the
/// rule source is instantiated, the procedure configures it against the
/// target, and the rule source's own rules are then applied to the target.
#[derive(Debug, Clone, Default)]
pub struct RuleDefinitionRuleExtractor;

impl RuleDefinitionRuleExtractor {
    pub fn new() -> Self {
        Self
    }

    pub fn kind(&self) -> &str {
        "rules"
    }

    pub fn registration(
        &self,
        declaration: &RuleDeclaration,
        problems: &mut ValidationProblemCollector,
    ) -> Option<ExtractedRule> {
        validate_is_void(declaration, DESCRIPTION, problems);

        let references = declaration.references();
        if references.len() < 2 {
            problems.add(format!("A method {DESCRIPTION} must have at least two parameters"));
            return None;
        }

        let source_type = references[0].model_type().clone();
        if !rule_source().is_assignable_from(&source_type) {
            problems.add(format!(
                "The first parameter of a method {DESCRIPTION} must be a subtype of RuleSource"
            ));
        } else if !source_type.has_default_constructor() {
            problems.add(format!(
                "The rule source type '{source_type}' must have a public default constructor"
            ));
        }
        if problems.has_problems() {
            return None;
        }

        let subject = references[1].clone();
        let inputs = references[2..].to_vec();
        let descriptor = declaration.descriptor().clone();
        let target_type = subject.model_type().clone();
        let declaration = declaration.clone();
        debug!("Extracted rule source definition {}", descriptor);

        let action = DirectNodeInputUsingModelAction::new(
            descriptor.clone(),
            subject,
            inputs,
            move |node, input_views| {
                let instance =
                    source_type
                        .new_instance()
                        .ok_or_else(|| TesseraError::NotConstructible {
                            model_type: source_type.to_string(),
                        })?;
                {
                    let target = node.as_immutable(&target_type, declaration.descriptor())?;
                    let mut args = RuleArgs::with_capacity(2 + input_views.len());
                    args.push(RuleArg::Owned(instance));
                    args.push(RuleArg::Immutable(target.instance()));
                    for view in input_views {
                        args.push(RuleArg::Immutable(view.instance()));
                    }
                    declaration.invoke(&mut args)?;
                }
                node.apply_to_self(source_type.clone());
                Ok(())
            },
        );

        Some(ExtractedRule::new(
            descriptor,
            RuleApplication::Action {
                role: ModelActionRole::Defaults,
                action: Arc::new(action),
            },
        ))
    }
}
