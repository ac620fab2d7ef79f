//! Dependency-ordered application of rule sources
//!
//! Rules may declare rule sources that must be applied before them. A plan
//! extracts the requested sources together with their transitive
//! dependencies and orders them so that every dependency is applied first.

use crate::source::{ExtractedRuleSource, ModelRuleExtractor, RuleSourceCatalog};
use petgraph::algo::{tarjan_scc, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tessera_core::{ModelPath, ModelRegistry, ModelType, Result, TesseraError};
use tracing::{debug, trace};

/// Rule sources in application order
#[derive(Debug)]
pub struct RuleApplicationPlan {
    sources: Vec<Arc<ExtractedRuleSource>>,
}

impl RuleApplicationPlan {
    /// Extract `requested` and their dependencies and order them
    pub fn build(
        requested: &[ModelType],
        catalog: &RuleSourceCatalog,
        extractor: &ModelRuleExtractor,
    ) -> Result<Self> {
        // Edges point from a source to the sources it depends on
        let mut graph: DiGraph<ModelType, ()> = DiGraph::new();
        let mut node_map: HashMap<ModelType, NodeIndex> = HashMap::new();
        let mut extracted: HashMap<ModelType, Arc<ExtractedRuleSource>> = HashMap::new();
        let mut pending: VecDeque<ModelType> = requested.iter().cloned().collect();

        let mut node_for = |graph: &mut DiGraph<ModelType, ()>, source_type: &ModelType| {
            *node_map
                .entry(source_type.clone())
                .or_insert_with(|| graph.add_node(source_type.clone()))
        };

        while let Some(source_type) = pending.pop_front() {
            if extracted.contains_key(&source_type) {
                continue;
            }
            let source = extractor.extract(catalog.require(&source_type)?)?;
            let dependent = node_for(&mut graph, &source_type);
            for dependency in source.dependencies() {
                trace!("'{}' depends on '{}'", source_type, dependency);
                let dependency_node = node_for(&mut graph, dependency);
                graph.add_edge(dependent, dependency_node, ());
                pending.push_back(dependency.clone());
            }
            extracted.insert(source_type, source);
        }

        let mut order = toposort(&graph, None).map_err(|_| TesseraError::CircularRuleDependency {
            cycle: find_cycle(&graph),
        })?;
        // Dependencies come last in the sort; apply them first
        order.reverse();

        let sources = order
            .into_iter()
            .filter_map(|index| extracted.get(&graph[index]).cloned())
            .collect::<Vec<_>>();
        debug!("Planned application of {} rule sources", sources.len());
        Ok(Self { sources })
    }

    pub fn sources(&self) -> &[Arc<ExtractedRuleSource>] {
        &self.sources
    }

    /// Source types in application order
    pub fn source_types(&self) -> Vec<&ModelType> {
        self.sources.iter().map(|source| source.source_type()).collect()
    }

    /// Apply every source in order
    pub fn apply(&self, registry: &mut dyn ModelRegistry, scope: &ModelPath) -> Result<()> {
        for source in &self.sources {
            source.apply(registry, scope)?;
        }
        Ok(())
    }
}

/// Names of the first cycle in the graph, with the first repeated at the end
fn find_cycle(graph: &DiGraph<ModelType, ()>) -> Vec<String> {
    tarjan_scc(graph)
        .into_iter()
        .find(|scc| scc.len() > 1 || graph.contains_edge(scc[0], scc[0]))
        .map(|scc| {
            let mut cycle: Vec<String> = scc.iter().map(|&index| graph[index].to_string()).collect();
            cycle.push(cycle[0].clone());
            cycle
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::ComponentTypeRegistration;
    use crate::declaration::RuleDeclaration;
    use crate::extractor::TypeModelRuleExtractor;
    use crate::source::RuleSourceDefinition;
    use tessera_core::{DefaultModelSchemaStore, ModelReference, RuleDescriptor, rule_source};

    #[derive(Default)]
    struct Rules;

    struct Fixture {
        component: ModelType,
        builder: ModelType,
        base_rules: ModelType,
        app_rules: ModelType,
        plugin_rules: ModelType,
    }

    fn rules_type(name: &str) -> ModelType {
        ModelType::class(name)
            .extends(rule_source())
            .constructor(Rules::default)
            .build()
    }

    fn fixture() -> Fixture {
        Fixture {
            component: ModelType::interface("ComponentSpec").build(),
            builder: ModelType::interface("ComponentTypeBuilder")
                .type_parameter("T")
                .build(),
            base_rules: rules_type("BaseRules"),
            app_rules: rules_type("AppRules"),
            plugin_rules: rules_type("PluginRules"),
        }
    }

    /// Extractor where rules of kind `after_<name>` depend on the given source
    fn extractor(fixture: &Fixture, after: &[(&str, &ModelType)]) -> ModelRuleExtractor {
        let base_implementation = ModelType::class("BaseComponentSpec")
            .extends(&fixture.component)
            .build();
        after.iter().fold(ModelRuleExtractor::default(), |extractor, (kind, dependency)| {
            extractor.with_extractor(TypeModelRuleExtractor::new(
                *kind,
                "component",
                &fixture.component,
                &base_implementation,
                &fixture.builder,
                Arc::new(DefaultModelSchemaStore::new()),
                Arc::new(ComponentTypeRegistration::default().with_dependency(dependency)),
            ))
        })
    }

    fn register_type(fixture: &Fixture, descriptor: &str, name: &str) -> RuleDeclaration {
        let declared = ModelType::interface(name).extends(&fixture.component).build();
        RuleDeclaration::new(RuleDescriptor::new(descriptor), |_| Ok(())).reference(
            ModelReference::of_type(&ModelType::parameterized(&fixture.builder, [declared])),
        )
    }

    fn mutate(descriptor: &str) -> RuleDeclaration {
        let target = ModelType::class("Target").build();
        RuleDeclaration::new(RuleDescriptor::new(descriptor), |_| Ok(()))
            .reference(ModelReference::of_type(&target))
    }

    #[test]
    fn test_dependencies_are_applied_first() {
        let fixture = fixture();
        let extractor = extractor(
            &fixture,
            &[
                ("after_base", &fixture.base_rules),
                ("after_app", &fixture.app_rules),
            ],
        );
        let mut catalog = RuleSourceCatalog::new();
        catalog.register(
            RuleSourceDefinition::new(&fixture.plugin_rules).rule(
                "after_app",
                register_type(&fixture, "PluginRules#tool", "ToolSpec"),
            ),
        );
        catalog.register(
            RuleSourceDefinition::new(&fixture.app_rules).rule(
                "after_base",
                register_type(&fixture, "AppRules#library", "LibrarySpec"),
            ),
        );
        catalog.register(
            RuleSourceDefinition::new(&fixture.base_rules).rule("mutate", mutate("BaseRules#touch")),
        );

        let plan =
            RuleApplicationPlan::build(&[fixture.plugin_rules.clone()], &catalog, &extractor)
                .unwrap();
        assert_eq!(
            plan.source_types(),
            vec![&fixture.base_rules, &fixture.app_rules, &fixture.plugin_rules]
        );
        assert_eq!(plan.sources().len(), 3);
    }

    #[test]
    fn test_shared_dependency_is_planned_once() {
        let fixture = fixture();
        let extractor = extractor(&fixture, &[("after_base", &fixture.base_rules)]);
        let mut catalog = RuleSourceCatalog::new();
        catalog.register(RuleSourceDefinition::new(&fixture.base_rules));
        catalog.register(
            RuleSourceDefinition::new(&fixture.app_rules).rule(
                "after_base",
                register_type(&fixture, "AppRules#library", "LibrarySpec"),
            ),
        );
        catalog.register(
            RuleSourceDefinition::new(&fixture.plugin_rules).rule(
                "after_base",
                register_type(&fixture, "PluginRules#tool", "ToolSpec"),
            ),
        );

        let plan = RuleApplicationPlan::build(
            &[fixture.app_rules.clone(), fixture.plugin_rules.clone()],
            &catalog,
            &extractor,
        )
        .unwrap();
        let order = plan.source_types();
        assert_eq!(order.len(), 3);
        assert_eq!(order[0], &fixture.base_rules);
    }

    #[test]
    fn test_cycle_is_reported() {
        let fixture = fixture();
        let extractor = extractor(
            &fixture,
            &[
                ("after_base", &fixture.base_rules),
                ("after_app", &fixture.app_rules),
            ],
        );
        let mut catalog = RuleSourceCatalog::new();
        catalog.register(
            RuleSourceDefinition::new(&fixture.app_rules).rule(
                "after_base",
                register_type(&fixture, "AppRules#library", "LibrarySpec"),
            ),
        );
        catalog.register(
            RuleSourceDefinition::new(&fixture.base_rules).rule(
                "after_app",
                register_type(&fixture, "BaseRules#tool", "ToolSpec"),
            ),
        );

        let err = RuleApplicationPlan::build(&[fixture.app_rules.clone()], &catalog, &extractor)
            .unwrap_err();
        let TesseraError::CircularRuleDependency { cycle } = &err else {
            panic!("expected a circular dependency, got {err}");
        };
        assert_eq!(cycle.len(), 3);
        assert_eq!(cycle.first(), cycle.last());
        assert!(cycle.contains(&"AppRules".to_string()));
        assert!(cycle.contains(&"BaseRules".to_string()));
    }

    #[test]
    fn test_missing_dependency_is_reported() {
        let fixture = fixture();
        let extractor = extractor(&fixture, &[("after_base", &fixture.base_rules)]);
        let mut catalog = RuleSourceCatalog::new();
        catalog.register(
            RuleSourceDefinition::new(&fixture.app_rules).rule(
                "after_base",
                register_type(&fixture, "AppRules#library", "LibrarySpec"),
            ),
        );

        let err = RuleApplicationPlan::build(&[fixture.app_rules.clone()], &catalog, &extractor)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Rule source 'BaseRules' is not known to the rule source catalog"
        );
    }
}
