//! Rule sources and whole-source extraction
//!
//! A rule source is a named type that groups rule declarations. Extraction of
//! a source validates the source type, hands each declaration to the
//! extractor registered for its kind and reports every problem in one error.
//! Extracted sources are cached per source type.

use crate::declaration::RuleDeclaration;
use crate::extracted::ExtractedRule;
use crate::extractor::{MutationRuleExtractor, RuleDefinitionRuleExtractor, RuleExtractor};
use crate::problems::{ValidationProblem, ValidationProblemCollector};
use indexmap::{IndexMap, IndexSet};
use rayon::prelude::*;
use std::sync::Arc;
use tessera_core::{
    ExtractionConfiguration, ModelPath, ModelRegistry, ModelType, Result, RuleSourceApplier,
    SingleFlightCache, TesseraError, rule_source,
};
use tracing::{debug, warn};

/// A declaration tagged with the kind of extractor that handles it
#[derive(Debug, Clone)]
pub struct RuleMethod {
    kind: String,
    declaration: RuleDeclaration,
}

impl RuleMethod {
    pub fn new(kind: impl Into<String>, declaration: RuleDeclaration) -> Self {
        Self {
            kind: kind.into(),
            declaration,
        }
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn declaration(&self) -> &RuleDeclaration {
        &self.declaration
    }
}

/// A rule source type and its declarations, in declaration order
#[derive(Debug, Clone)]
pub struct RuleSourceDefinition {
    source_type: ModelType,
    methods: Vec<RuleMethod>,
}

impl RuleSourceDefinition {
    pub fn new(source_type: &ModelType) -> Self {
        Self {
            source_type: source_type.clone(),
            methods: Vec::new(),
        }
    }

    /// Add a declaration handled by the extractor of `kind`
    pub fn rule(mut self, kind: impl Into<String>, declaration: RuleDeclaration) -> Self {
        self.methods.push(RuleMethod::new(kind, declaration));
        self
    }

    pub fn source_type(&self) -> &ModelType {
        &self.source_type
    }

    pub fn methods(&self) -> &[RuleMethod] {
        &self.methods
    }
}

/// Known rule sources, by type
#[derive(Debug, Clone, Default)]
pub struct RuleSourceCatalog {
    definitions: IndexMap<ModelType, Arc<RuleSourceDefinition>>,
}

impl RuleSourceCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a definition, replacing any previous one for the same type
    pub fn register(&mut self, definition: RuleSourceDefinition) {
        self.definitions
            .insert(definition.source_type().clone(), Arc::new(definition));
    }

    pub fn get(&self, source_type: &ModelType) -> Option<&Arc<RuleSourceDefinition>> {
        self.definitions.get(source_type)
    }

    /// Definition for `source_type`, or a `MissingRuleSource` error
    pub fn require(&self, source_type: &ModelType) -> Result<&Arc<RuleSourceDefinition>> {
        self.get(source_type)
            .ok_or_else(|| TesseraError::MissingRuleSource {
                source_type: source_type.to_string(),
            })
    }

    pub fn contains(&self, source_type: &ModelType) -> bool {
        self.definitions.contains_key(source_type)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

/// Rules extracted from one rule source
#[derive(Debug)]
pub struct ExtractedRuleSource {
    source_type: ModelType,
    rules: Vec<ExtractedRule>,
    dependencies: IndexSet<ModelType>,
}

impl ExtractedRuleSource {
    pub fn source_type(&self) -> &ModelType {
        &self.source_type
    }

    pub fn rules(&self) -> &[ExtractedRule] {
        &self.rules
    }

    /// Union of the rules' dependencies
    pub fn dependencies(&self) -> &IndexSet<ModelType> {
        &self.dependencies
    }

    pub fn has_dependencies(&self) -> bool {
        !self.dependencies.is_empty()
    }

    /// Apply every rule, in declaration order
    pub fn apply(&self, registry: &mut dyn ModelRegistry, scope: &ModelPath) -> Result<()> {
        debug!(
            "Applying {} rules from '{}' in scope '{}'",
            self.rules.len(),
            self.source_type,
            scope
        );
        for rule in &self.rules {
            rule.apply(registry, scope)?;
        }
        Ok(())
    }
}

type MethodOutcome = Result<(Option<ExtractedRule>, Vec<ValidationProblem>)>;

/// Extracts whole rule sources using a fixed set of extractors
pub struct ModelRuleExtractor {
    extractors: Vec<RuleExtractor>,
    cache: SingleFlightCache<ModelType, Result<Arc<ExtractedRuleSource>>>,
    config: ExtractionConfiguration,
}

impl ModelRuleExtractor {
    pub fn new(extractors: impl IntoIterator<Item = RuleExtractor>) -> Self {
        Self {
            extractors: extractors.into_iter().collect(),
            cache: SingleFlightCache::new(),
            config: ExtractionConfiguration::default(),
        }
    }

    /// The mutation extractors plus the `rules` extractor
    pub fn with_default_extractors() -> Self {
        Self::new([
            MutationRuleExtractor::defaults().into(),
            MutationRuleExtractor::mutate().into(),
            MutationRuleExtractor::finalize().into(),
            MutationRuleExtractor::validate().into(),
            RuleDefinitionRuleExtractor::new().into(),
        ])
    }

    pub fn with_config(mut self, config: ExtractionConfiguration) -> Self {
        self.config = config;
        self
    }

    /// Add an extractor; the first extractor registered for a kind wins
    pub fn with_extractor(mut self, extractor: impl Into<RuleExtractor>) -> Self {
        self.extractors.push(extractor.into());
        self
    }

    pub fn extractors(&self) -> &[RuleExtractor] {
        &self.extractors
    }

    pub fn extractor_for(&self, kind: &str) -> Option<&RuleExtractor> {
        self.extractors.iter().find(|extractor| extractor.kind() == kind)
    }

    /// Number of rule source types extracted so far
    pub fn cached_sources(&self) -> usize {
        self.cache.len()
    }

    /// Extract a rule source
    ///
    /// Results, including failures, are cached by source type: a second
    /// definition for an already extracted type is not looked at.
    pub fn extract(&self, definition: &RuleSourceDefinition) -> Result<Arc<ExtractedRuleSource>> {
        self.cache
            .get_or_compute(definition.source_type(), || self.extract_source(definition))
    }

    fn extract_source(&self, definition: &RuleSourceDefinition) -> Result<Arc<ExtractedRuleSource>> {
        let source_type = definition.source_type();
        debug!(
            "Extracting {} rules from '{}'",
            definition.methods().len(),
            source_type
        );

        let mut problems = Vec::new();
        if !rule_source().is_assignable_from(source_type) {
            problems.push("Rule source types must extend RuleSource".to_string());
        }
        if !source_type.has_default_constructor() {
            problems.push("Rule source types must have a public default constructor".to_string());
        }

        let methods = definition.methods();
        let outcomes: Vec<MethodOutcome> =
            if self.config.parallel && methods.len() >= self.config.parallel_threshold {
                methods.par_iter().map(|method| self.extract_method(method)).collect()
            } else {
                methods.iter().map(|method| self.extract_method(method)).collect()
            };

        let mut rules = Vec::new();
        let mut dependencies = IndexSet::new();
        for outcome in outcomes {
            let (rule, method_problems) = match outcome {
                Ok(outcome) => outcome,
                Err(err) => {
                    problems.push(describe_failure(&err));
                    continue;
                }
            };
            problems.extend(method_problems.into_iter().map(|problem| {
                format!(
                    "Method {} is not a valid rule method: {}",
                    problem.descriptor, problem.message
                )
            }));
            if let Some(rule) = rule {
                dependencies.extend(rule.dependencies().iter().cloned());
                rules.push(rule);
            }
        }

        if !problems.is_empty() {
            warn!(
                "Rule source '{}' has {} problems",
                source_type,
                problems.len()
            );
            return Err(TesseraError::InvalidRuleSource {
                source_type: source_type.to_string(),
                problems,
            });
        }

        Ok(Arc::new(ExtractedRuleSource {
            source_type: source_type.clone(),
            rules,
            dependencies,
        }))
    }

    fn extract_method(&self, method: &RuleMethod) -> MethodOutcome {
        let declaration = method.declaration();
        let mut problems = ValidationProblemCollector::new(declaration.descriptor().clone());
        let rule = match self.extractor_for(method.kind()) {
            Some(extractor) => extractor.registration(declaration, &mut problems)?,
            None => {
                problems.add(format!(
                    "No rule extractor handles rules of kind '{}'",
                    method.kind()
                ));
                None
            }
        };
        Ok((rule, problems.into_problems()))
    }
}

/// A failed declaration as a problem line, with its root cause when it has one
fn describe_failure(err: &TesseraError) -> String {
    let message = err.to_string();
    let cause = err.root_cause_message();
    if cause == message {
        message
    } else {
        format!("{}: {cause}", message.trim_end_matches('.'))
    }
}

impl Default for ModelRuleExtractor {
    fn default() -> Self {
        Self::with_default_extractors()
    }
}

/// Applies rule sources requested by actions to their subject node
pub struct RuleSourceApplicator {
    extractor: Arc<ModelRuleExtractor>,
    catalog: Arc<RuleSourceCatalog>,
}

impl RuleSourceApplicator {
    pub fn new(extractor: Arc<ModelRuleExtractor>, catalog: Arc<RuleSourceCatalog>) -> Self {
        Self { extractor, catalog }
    }
}

impl RuleSourceApplier for RuleSourceApplicator {
    fn apply_rule_source(
        &self,
        registry: &mut dyn ModelRegistry,
        scope: &ModelPath,
        rule_source: &ModelType,
    ) -> Result<()> {
        let extracted = self.extractor.extract(self.catalog.require(rule_source)?)?;
        if extracted.has_dependencies() {
            let dependencies: Vec<String> =
                extracted.dependencies().iter().map(ToString::to_string).collect();
            return Err(TesseraError::invalid_model(format!(
                "Rule source '{}' cannot be applied to model node '{}' because it declares dependencies on {}",
                rule_source,
                scope,
                dependencies.join(", ")
            )));
        }
        extracted.apply(registry, scope)
    }
}
