//! In-memory model registry

use super::{ConstructibleTypesRegistry, ModelRegistry, NodeInitializer, RuleSourceApplier};
use crate::action::{ModelAction, ModelView, MutableModelNode};
use crate::config::RegistryConfiguration;
use crate::descriptor::RuleDescriptor;
use crate::error::TesseraError;
use crate::path::ModelPath;
use crate::reference::ModelReference;
use crate::result::Result;
use crate::role::{ModelActionRole, PhaseOrder};
use crate::types::{Instance, ModelType};
use indexmap::IndexMap;
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, trace};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NodeState {
    Registered,
    Realizing { phase: usize },
    Realized,
}

#[derive(Clone)]
struct BoundAction {
    role: ModelActionRole,
    action: Arc<dyn ModelAction>,
    scope: ModelPath,
}

struct ModelNode {
    model_type: ModelType,
    value: Option<Instance>,
    /// Queued actions, indexed by phase position
    actions: Vec<Vec<BoundAction>>,
    state: NodeState,
}

/// Snapshot of an action queued against a node
#[derive(Debug, Clone, PartialEq)]
pub struct RegisteredAction {
    pub role: ModelActionRole,
    pub descriptor: RuleDescriptor,
    pub subject: ModelReference,
    pub inputs: Vec<ModelReference>,
}

/// Minimal in-memory model graph
///
/// Nodes are registered up front. Actions are bound to nodes when they are
/// configured and executed when the node is realized, phase by phase, in
/// registration order within a phase.
pub struct DefaultModelRegistry {
    phases: PhaseOrder,
    nodes: IndexMap<ModelPath, ModelNode>,
    initializers: HashMap<ModelType, NodeInitializer>,
    rule_source_applier: Option<Arc<dyn RuleSourceApplier>>,
}

impl DefaultModelRegistry {
    pub fn new() -> Self {
        Self::with_phases(PhaseOrder::default())
    }

    pub fn with_phases(phases: PhaseOrder) -> Self {
        Self {
            phases,
            nodes: IndexMap::new(),
            initializers: HashMap::new(),
            rule_source_applier: None,
        }
    }

    /// Registry running the configured phase order
    pub fn from_config(config: &RegistryConfiguration) -> Result<Self> {
        Ok(Self::with_phases(config.phase_order()?))
    }

    /// Install the hook used when actions apply rule sources to their subject
    pub fn with_rule_source_applier(mut self, applier: Arc<dyn RuleSourceApplier>) -> Self {
        self.rule_source_applier = Some(applier);
        self
    }

    pub fn phases(&self) -> &PhaseOrder {
        &self.phases
    }

    /// Register a node holding `value`
    pub fn register<T>(&mut self, path: ModelPath, model_type: ModelType, value: T) -> Result<()>
    where
        T: Any + Send + Sync,
    {
        self.insert_node(path, model_type, Box::new(value))
    }

    /// Register a node whose value is built by the type's initializer
    ///
    /// Registered constructible types take precedence over the type's own
    /// constructor.
    pub fn create(&mut self, path: ModelPath, model_type: ModelType) -> Result<()> {
        let value = match self.initializers.get(&model_type) {
            Some(initializer) => initializer.initialize()?,
            None => model_type
                .new_instance()
                .ok_or_else(|| TesseraError::NotConstructible {
                    model_type: model_type.to_string(),
                })?,
        };
        self.insert_node(path, model_type, value)
    }

    fn insert_node(&mut self, path: ModelPath, model_type: ModelType, value: Instance) -> Result<()> {
        if self.nodes.contains_key(&path) {
            return Err(TesseraError::DuplicateNode {
                path: path.to_string(),
            });
        }
        debug!("Registering model node '{}' of type '{}'", path, model_type);
        let actions = (0..self.phases.len()).map(|_| Vec::new()).collect();
        self.nodes.insert(
            path,
            ModelNode {
                model_type,
                value: Some(value),
                actions,
                state: NodeState::Registered,
            },
        );
        Ok(())
    }

    pub fn contains(&self, path: &ModelPath) -> bool {
        self.nodes.contains_key(path)
    }

    pub fn node_type(&self, path: &ModelPath) -> Option<&ModelType> {
        self.nodes.get(path).map(|node| &node.model_type)
    }

    pub fn is_realized(&self, path: &ModelPath) -> bool {
        self.nodes
            .get(path)
            .is_some_and(|node| node.state == NodeState::Realized)
    }

    /// Initializer registered for a public type
    pub fn initializer(&self, model_type: &ModelType) -> Option<&NodeInitializer> {
        self.initializers.get(model_type)
    }

    /// Actions still queued against a node, in execution order
    pub fn actions_for(&self, path: &ModelPath) -> Vec<RegisteredAction> {
        self.nodes
            .get(path)
            .map(|node| {
                node.actions
                    .iter()
                    .flatten()
                    .map(|bound| RegisteredAction {
                        role: bound.role,
                        descriptor: bound.action.descriptor().clone(),
                        subject: bound.action.subject().clone(),
                        inputs: bound.action.inputs().to_vec(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Realize a node and return its value
    pub fn get<T: Any>(&mut self, path: &ModelPath) -> Result<&T> {
        self.realize(path)?;
        let node = self.node(path)?;
        node.value
            .as_deref()
            .and_then(|value| value.downcast_ref::<T>())
            .ok_or_else(|| TesseraError::ViewTypeMismatch {
                path: path.to_string(),
                requested: std::any::type_name::<T>().to_string(),
                actual: node.model_type.to_string(),
                descriptor: "registry lookup".to_string(),
            })
    }

    /// Realize every node, in registration order
    pub fn realize_all(&mut self) -> Result<()> {
        let paths: Vec<ModelPath> = self.nodes.keys().cloned().collect();
        for path in &paths {
            self.realize(path)?;
        }
        Ok(())
    }

    /// Run all queued actions of a node, phase by phase
    ///
    /// Inputs of each action are realized first. Actions may queue further
    /// actions on the node for the current or a later phase.
    pub fn realize(&mut self, path: &ModelPath) -> Result<()> {
        match self.node(path)?.state {
            NodeState::Realized => return Ok(()),
            NodeState::Realizing { .. } => {
                return Err(TesseraError::CyclicRealization {
                    path: path.to_string(),
                });
            }
            NodeState::Registered => {}
        }

        debug!("Realizing model node '{}'", path);
        for phase in 0..self.phases.len() {
            self.node_mut(path)?.state = NodeState::Realizing { phase };
            let mut index = 0;
            while let Some(bound) = self.node(path)?.actions[phase].get(index).cloned() {
                index += 1;
                self.execute(path, &bound)?;
            }
        }

        let node = self.node_mut(path)?;
        node.state = NodeState::Realized;
        node.actions.iter_mut().for_each(Vec::clear);
        Ok(())
    }

    fn execute(&mut self, path: &ModelPath, bound: &BoundAction) -> Result<()> {
        let descriptor = bound.action.descriptor().clone();
        let wrap = |source: TesseraError| TesseraError::RuleExecution {
            descriptor: descriptor.to_string(),
            path: path.to_string(),
            source: Box::new(source),
        };
        trace!(
            "Executing {} action {} on '{}'",
            bound.role, descriptor, path
        );

        let mut input_paths = Vec::with_capacity(bound.action.inputs().len());
        for input in bound.action.inputs() {
            let input_path = self
                .bind(&bound.scope, input, &descriptor)
                .map_err(&wrap)?;
            self.realize(&input_path).map_err(&wrap)?;
            input_paths.push(input_path);
        }

        let node = self.node_mut(path)?;
        let model_type = node.model_type.clone();
        let mut value = node.value.take().ok_or_else(|| {
            TesseraError::internal_error(format!("value of model node '{path}' is not available"))
        })?;

        let mut applied_rule_sources = Vec::new();
        let outcome = self.input_views(&input_paths).and_then(|views| {
            let mut subject =
                MutableModelNode::new(path, &model_type, &mut *value, &mut applied_rule_sources);
            bound.action.execute(&mut subject, &views)
        });
        self.node_mut(path)?.value = Some(value);
        outcome.map_err(&wrap)?;

        for rule_source in applied_rule_sources {
            let applier = self.rule_source_applier.clone().ok_or_else(|| {
                wrap(TesseraError::internal_error(format!(
                    "cannot apply rule source '{rule_source}': no rule source applier is installed"
                )))
            })?;
            debug!("Applying rule source '{}' to '{}'", rule_source, path);
            applier
                .apply_rule_source(self, path, &rule_source)
                .map_err(&wrap)?;
        }
        Ok(())
    }

    fn input_views<'a>(&'a self, input_paths: &'a [ModelPath]) -> Result<Vec<ModelView<'a>>> {
        input_paths
            .iter()
            .map(|input_path| {
                let node = self.node(input_path)?;
                let value = node.value.as_deref().ok_or_else(|| {
                    TesseraError::internal_error(format!(
                        "value of model node '{input_path}' is not available"
                    ))
                })?;
                Ok(ModelView::new(input_path, &node.model_type, value))
            })
            .collect()
    }

    /// Resolve a reference to a node path within `scope`
    fn bind(
        &self,
        scope: &ModelPath,
        reference: &ModelReference,
        descriptor: &RuleDescriptor,
    ) -> Result<ModelPath> {
        let unbound = || TesseraError::UnboundReference {
            reference: reference.to_string(),
            scope: scope.to_string(),
            descriptor: descriptor.to_string(),
        };

        if let Some(path) = reference.in_scope(scope).path().cloned() {
            let node = self.nodes.get(&path).ok_or_else(unbound)?;
            if !reference.model_type().is_assignable_from(&node.model_type) {
                return Err(TesseraError::ViewTypeMismatch {
                    path: path.to_string(),
                    requested: reference.model_type().to_string(),
                    actual: node.model_type.to_string(),
                    descriptor: descriptor.to_string(),
                });
            }
            return Ok(path);
        }

        let candidates: Vec<&ModelPath> = self
            .nodes
            .iter()
            .filter(|(path, node)| {
                (*path == scope || scope.is_direct_parent_of(path))
                    && reference.model_type().is_assignable_from(&node.model_type)
            })
            .map(|(path, _)| path)
            .collect();

        match candidates.as_slice() {
            [] => Err(unbound()),
            [single] => Ok((*single).clone()),
            _ => Err(TesseraError::AmbiguousReference {
                reference: reference.to_string(),
                scope: scope.to_string(),
                descriptor: descriptor.to_string(),
                candidates: candidates.iter().map(ToString::to_string).collect(),
            }),
        }
    }

    fn node(&self, path: &ModelPath) -> Result<&ModelNode> {
        self.nodes.get(path).ok_or_else(|| TesseraError::UnknownNode {
            path: path.to_string(),
        })
    }

    fn node_mut(&mut self, path: &ModelPath) -> Result<&mut ModelNode> {
        self.nodes
            .get_mut(path)
            .ok_or_else(|| TesseraError::UnknownNode {
                path: path.to_string(),
            })
    }
}

impl Default for DefaultModelRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelRegistry for DefaultModelRegistry {
    fn configure(
        &mut self,
        role: ModelActionRole,
        action: Arc<dyn ModelAction>,
        scope: &ModelPath,
    ) -> Result<()> {
        let position = self
            .phases
            .position(role)
            .ok_or_else(|| TesseraError::UnknownPhase {
                role: role.to_string(),
            })?;
        let descriptor = action.descriptor().clone();
        let path = self.bind(scope, action.subject(), &descriptor)?;
        let node = self.node_mut(&path)?;

        match node.state {
            NodeState::Realized => {
                return Err(TesseraError::NodeAlreadyRealized {
                    path: path.to_string(),
                    descriptor: descriptor.to_string(),
                });
            }
            NodeState::Realizing { phase } if position < phase => {
                return Err(TesseraError::PhaseAlreadyExecuted {
                    path: path.to_string(),
                    role: role.to_string(),
                    descriptor: descriptor.to_string(),
                });
            }
            _ => {}
        }

        debug!("Queued {} rule {} for '{}'", role, descriptor, path);
        node.actions[position].push(BoundAction {
            role,
            action,
            scope: scope.clone(),
        });
        Ok(())
    }

    fn constructible_types(&mut self) -> Option<&mut dyn ConstructibleTypesRegistry> {
        Some(self)
    }
}

impl ConstructibleTypesRegistry for DefaultModelRegistry {
    fn register_constructible_type(&mut self, model_type: ModelType, initializer: NodeInitializer) {
        debug!(
            "Registering constructible type '{}' implemented by '{}'",
            model_type,
            initializer.implementation()
        );
        self.initializers.insert(model_type, initializer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    type Body = dyn Fn(&mut MutableModelNode<'_>, &[ModelView<'_>]) -> Result<()> + Send + Sync;

    struct TestAction {
        descriptor: RuleDescriptor,
        subject: ModelReference,
        inputs: Vec<ModelReference>,
        body: Box<Body>,
    }

    impl ModelAction for TestAction {
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

    fn action(
        name: &str,
        subject: ModelReference,
        inputs: Vec<ModelReference>,
        body: impl Fn(&mut MutableModelNode<'_>, &[ModelView<'_>]) -> Result<()> + Send + Sync + 'static,
    ) -> Arc<dyn ModelAction> {
        Arc::new(TestAction {
            descriptor: RuleDescriptor::new(name),
            subject,
            inputs,
            body: Box::new(body),
        })
    }

    fn log_type() -> ModelType {
        ModelType::class("Log").build()
    }

    fn push(node: &mut MutableModelNode<'_>, entry: &str) -> Result<()> {
        let descriptor = RuleDescriptor::new("push");
        node.as_mutable(&log_type(), &descriptor)?
            .downcast_mut::<Vec<String>>()
            .ok_or_else(|| TesseraError::rule_failure("log is not a Vec"))?
            .push(entry.to_string());
        Ok(())
    }

    #[test]
    fn test_actions_run_in_phase_then_registration_order() {
        let mut registry = DefaultModelRegistry::new();
        let path = ModelPath::parse("log").unwrap();
        registry
            .register(path.clone(), log_type(), Vec::<String>::new())
            .unwrap();

        let subject = ModelReference::of(path.clone(), &log_type());
        let root = ModelPath::root();
        for (role, entry) in [
            (ModelActionRole::Finalize, "finalize"),
            (ModelActionRole::Mutate, "mutate-1"),
            (ModelActionRole::Defaults, "defaults"),
            (ModelActionRole::Mutate, "mutate-2"),
        ] {
            let name = format!("Rules#{entry}");
            registry
                .configure(
                    role,
                    action(&name, subject.clone(), vec![], move |node, _| push(node, entry)),
                    &root,
                )
                .unwrap();
        }

        let roles: Vec<ModelActionRole> = registry.actions_for(&path).iter().map(|a| a.role).collect();
        assert_eq!(
            roles,
            vec![
                ModelActionRole::Defaults,
                ModelActionRole::Mutate,
                ModelActionRole::Mutate,
                ModelActionRole::Finalize
            ]
        );

        let log = registry.get::<Vec<String>>(&path).unwrap();
        assert_eq!(log, &vec!["defaults", "mutate-1", "mutate-2", "finalize"]);
        assert!(registry.is_realized(&path));
        assert!(registry.actions_for(&path).is_empty());
    }

    #[test]
    fn test_inputs_are_realized_before_subject() {
        let counter_type = ModelType::class("Counter").build();
        let mut registry = DefaultModelRegistry::new();
        let log_path = ModelPath::parse("log").unwrap();
        let counter_path = ModelPath::parse("counter").unwrap();
        registry
            .register(log_path.clone(), log_type(), Vec::<String>::new())
            .unwrap();
        registry
            .register(counter_path.clone(), counter_type.clone(), 1u32)
            .unwrap();

        let root = ModelPath::root();
        registry
            .configure(
                ModelActionRole::Mutate,
                action(
                    "Rules#copyCounter",
                    ModelReference::of_type(&log_type()),
                    vec![ModelReference::of_type(&counter_type)],
                    |node, inputs| {
                        let count = inputs[0].downcast::<u32>().copied().unwrap_or_default();
                        push(node, &format!("counter={count}"))
                    },
                ),
                &root,
            )
            .unwrap();
        registry
            .configure(
                ModelActionRole::Finalize,
                action(
                    "Rules#bump",
                    ModelReference::of_type(&counter_type),
                    vec![],
                    |node, _| {
                        let descriptor = RuleDescriptor::new("bump");
                        let counter_type = node.model_type().clone();
                        if let Some(count) = node
                            .as_mutable(&counter_type, &descriptor)?
                            .downcast_mut::<u32>()
                        {
                            *count += 41;
                        }
                        Ok(())
                    },
                ),
                &root,
            )
            .unwrap();

        let log = registry.get::<Vec<String>>(&log_path).unwrap();
        assert_eq!(log, &vec!["counter=42"]);
        assert!(registry.is_realized(&counter_path));
    }

    #[test]
    fn test_configure_rejects_unknown_phase_and_ambiguous_subject() {
        let mut registry = DefaultModelRegistry::with_phases(
            PhaseOrder::new(vec![ModelActionRole::Defaults, ModelActionRole::Finalize]).unwrap(),
        );
        registry
            .register(ModelPath::parse("a").unwrap(), log_type(), Vec::<String>::new())
            .unwrap();
        registry
            .register(ModelPath::parse("b").unwrap(), log_type(), Vec::<String>::new())
            .unwrap();
        let root = ModelPath::root();

        let err = registry
            .configure(
                ModelActionRole::Mutate,
                action("Rules#mutate", ModelReference::of_type(&log_type()), vec![], |_, _| Ok(())),
                &root,
            )
            .unwrap_err();
        assert!(matches!(err, TesseraError::UnknownPhase { .. }));

        let err = registry
            .configure(
                ModelActionRole::Defaults,
                action("Rules#defaults", ModelReference::of_type(&log_type()), vec![], |_, _| Ok(())),
                &root,
            )
            .unwrap_err();
        assert!(err.to_string().contains("candidates: a, b"));
    }

    #[test]
    fn test_phase_order_from_config() {
        let config: RegistryConfiguration =
            serde_json::from_str(r#"{"phases": ["defaults", "validate"]}"#).unwrap();
        let registry = DefaultModelRegistry::from_config(&config).unwrap();
        assert_eq!(
            registry.phases().roles(),
            &[ModelActionRole::Defaults, ModelActionRole::Validate]
        );

        let config = RegistryConfiguration { phases: Vec::new() };
        assert!(DefaultModelRegistry::from_config(&config).is_err());
    }

    #[test]
    fn test_configure_after_realization_fails() {
        let mut registry = DefaultModelRegistry::new();
        let path = ModelPath::parse("log").unwrap();
        registry
            .register(path.clone(), log_type(), Vec::<String>::new())
            .unwrap();
        registry.realize(&path).unwrap();

        let err = registry
            .configure(
                ModelActionRole::Mutate,
                action("Rules#late", ModelReference::of(path.clone(), &log_type()), vec![], |_, _| Ok(())),
                &ModelPath::root(),
            )
            .unwrap_err();
        assert!(matches!(err, TesseraError::NodeAlreadyRealized { .. }));
    }

    #[test]
    fn test_rule_failures_carry_descriptor_and_path() {
        let mut registry = DefaultModelRegistry::new();
        let path = ModelPath::parse("log").unwrap();
        registry
            .register(path.clone(), log_type(), Vec::<String>::new())
            .unwrap();
        registry
            .configure(
                ModelActionRole::Validate,
                action("Rules#check", ModelReference::of_type(&log_type()), vec![], |_, _| {
                    Err(TesseraError::rule_failure("log must not be empty"))
                }),
                &ModelPath::root(),
            )
            .unwrap();

        let err = registry.realize(&path).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Exception thrown while executing model rule: Rules#check (node 'log')"
        );
        assert_eq!(err.root_cause_message(), "log must not be empty");
    }

    #[test]
    fn test_self_input_is_a_cycle() {
        let mut registry = DefaultModelRegistry::new();
        let path = ModelPath::parse("log").unwrap();
        registry
            .register(path.clone(), log_type(), Vec::<String>::new())
            .unwrap();
        registry
            .configure(
                ModelActionRole::Mutate,
                action(
                    "Rules#selfInput",
                    ModelReference::of_type(&log_type()),
                    vec![ModelReference::of(path.clone(), &log_type())],
                    |_, _| Ok(()),
                ),
                &ModelPath::root(),
            )
            .unwrap();

        let err = registry.realize(&path).unwrap_err();
        assert_eq!(
            err.root_cause_message(),
            "Cycle detected while realizing model node 'log'"
        );
    }

    #[test]
    fn test_create_prefers_registered_initializer() {
        #[derive(Default)]
        struct DefaultLibrary;
        #[derive(Default)]
        struct CustomLibrary;

        let public = ModelType::interface("LibrarySpec").build();
        let own = ModelType::class("DefaultLibrary")
            .extends(&public)
            .constructor(DefaultLibrary::default)
            .build();
        let custom = ModelType::class("CustomLibrary")
            .extends(&public)
            .constructor(CustomLibrary::default)
            .build();

        let mut registry = DefaultModelRegistry::new();
        registry.create(ModelPath::parse("own").unwrap(), own).unwrap();

        let err = registry
            .create(ModelPath::parse("lib").unwrap(), public.clone())
            .unwrap_err();
        assert!(matches!(err, TesseraError::NotConstructible { .. }));

        registry
            .constructible_types()
            .unwrap()
            .register_constructible_type(public.clone(), NodeInitializer::new(public.clone(), custom));
        registry
            .create(ModelPath::parse("lib").unwrap(), public)
            .unwrap();
        assert!(
            registry
                .get::<CustomLibrary>(&ModelPath::parse("lib").unwrap())
                .is_ok()
        );
    }

    #[test]
    fn test_missing_rule_source_applier_is_reported() {
        let rules = ModelType::class("NestedRules").build();
        let requested = Arc::new(Mutex::new(false));
        let mut registry = DefaultModelRegistry::new();
        let path = ModelPath::parse("log").unwrap();
        registry
            .register(path.clone(), log_type(), Vec::<String>::new())
            .unwrap();

        let flag = Arc::clone(&requested);
        registry
            .configure(
                ModelActionRole::Defaults,
                action("Rules#nested", ModelReference::of_type(&log_type()), vec![], move |node, _| {
                    node.apply_to_self(rules.clone());
                    *flag.lock().unwrap() = true;
                    Ok(())
                }),
                &ModelPath::root(),
            )
            .unwrap();

        let err = registry.realize(&path).unwrap_err();
        assert!(*requested.lock().unwrap());
        assert!(err.root_cause_message().contains("no rule source applier is installed"));
    }
}
