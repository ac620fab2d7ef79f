//! Model type descriptors
//!
//! A small type algebra that stands in for a reflective type system. Types
//! are declared once (interfaces, classes, abstract classes) with their
//! supertypes, generic type parameters, properties and an optional
//! constructor. Parameterized types and wildcards are built on top of
//! declared types.
//!
//! Declared types are identified by name: two declarations with the same name
//! compare equal.
//!
//! # Example
//!
//! ```rust
//! use tessera_core::types::ModelType;
//!
//! let component = ModelType::interface("ComponentSpec").build();
//! let library = ModelType::interface("LibrarySpec").extends(&component).build();
//! let builder = ModelType::interface("ComponentTypeBuilder")
//!     .type_parameter("T")
//!     .build();
//!
//! assert!(component.is_assignable_from(&library));
//! assert!(!library.is_assignable_from(&component));
//!
//! let parameterized = ModelType::parameterized(&builder, [library.clone()]);
//! assert_eq!(parameterized.to_string(), "ComponentTypeBuilder<LibrarySpec>");
//! assert!(builder.is_assignable_from(&parameterized));
//! ```

use once_cell::sync::Lazy;
use std::any::Any;
use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// A live value held by a model node or created by a constructor
pub type Instance = Box<dyn Any + Send + Sync>;

/// Registered constructor producing a fresh instance of a class
pub type Constructor = Arc<dyn Fn() -> Instance + Send + Sync>;

static RULE_SOURCE: Lazy<ModelType> =
    Lazy::new(|| ModelType::abstract_class("RuleSource").build());

/// The marker type every rule source must extend
pub fn rule_source() -> &'static ModelType {
    &RULE_SOURCE
}

/// What kind of declaration a named type is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeclaredKind {
    /// Pure interface: no state and no constructor
    Interface,
    /// Concrete class
    Class,
    /// Class that cannot be instantiated directly
    AbstractClass,
}

/// A property declared directly on a type
#[derive(Debug, Clone)]
pub struct PropertyDeclaration {
    pub name: String,
    pub model_type: ModelType,
    pub writable: bool,
}

struct DeclaredType {
    name: String,
    kind: DeclaredKind,
    type_parameters: Vec<String>,
    supertypes: Vec<ModelType>,
    properties: Vec<PropertyDeclaration>,
    constructor: Option<Constructor>,
}

enum TypeShape {
    Declared(DeclaredType),
    Parameterized {
        raw: ModelType,
        arguments: Vec<ModelType>,
    },
    Wildcard {
        upper_bound: Option<ModelType>,
        lower_bound: Option<ModelType>,
    },
}

/// Descriptor for a type participating in the model
#[derive(Clone)]
pub struct ModelType {
    shape: Arc<TypeShape>,
}

/// Builder for declared types
pub struct ModelTypeBuilder {
    declared: DeclaredType,
}

impl ModelTypeBuilder {
    fn new(name: impl Into<String>, kind: DeclaredKind) -> Self {
        Self {
            declared: DeclaredType {
                name: name.into(),
                kind,
                type_parameters: Vec::new(),
                supertypes: Vec::new(),
                properties: Vec::new(),
                constructor: None,
            },
        }
    }

    /// Declare a direct supertype (superclass or implemented interface)
    pub fn extends(mut self, supertype: &ModelType) -> Self {
        self.declared.supertypes.push(supertype.clone());
        self
    }

    /// Declare a generic type parameter
    pub fn type_parameter(mut self, name: impl Into<String>) -> Self {
        self.declared.type_parameters.push(name.into());
        self
    }

    /// Declare a writable property
    pub fn property(mut self, name: impl Into<String>, model_type: &ModelType) -> Self {
        self.declared.properties.push(PropertyDeclaration {
            name: name.into(),
            model_type: model_type.clone(),
            writable: true,
        });
        self
    }

    /// Declare a read-only property
    pub fn read_only_property(mut self, name: impl Into<String>, model_type: &ModelType) -> Self {
        self.declared.properties.push(PropertyDeclaration {
            name: name.into(),
            model_type: model_type.clone(),
            writable: false,
        });
        self
    }

    /// Register the public no-argument constructor of a class
    pub fn constructor<T, F>(mut self, factory: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.declared.constructor = Some(Arc::new(move || Box::new(factory()) as Instance));
        self
    }

    pub fn build(self) -> ModelType {
        ModelType {
            shape: Arc::new(TypeShape::Declared(self.declared)),
        }
    }
}

impl ModelType {
    /// Start declaring an interface
    pub fn interface(name: impl Into<String>) -> ModelTypeBuilder {
        ModelTypeBuilder::new(name, DeclaredKind::Interface)
    }

    /// Start declaring a concrete class
    pub fn class(name: impl Into<String>) -> ModelTypeBuilder {
        ModelTypeBuilder::new(name, DeclaredKind::Class)
    }

    /// Start declaring an abstract class
    pub fn abstract_class(name: impl Into<String>) -> ModelTypeBuilder {
        ModelTypeBuilder::new(name, DeclaredKind::AbstractClass)
    }

    /// Parameterize a generic type with concrete arguments
    ///
    /// Parameterizing an already parameterized type replaces its arguments.
    pub fn parameterized(raw: &ModelType, arguments: impl IntoIterator<Item = ModelType>) -> Self {
        Self {
            shape: Arc::new(TypeShape::Parameterized {
                raw: raw.raw_type().clone(),
                arguments: arguments.into_iter().collect(),
            }),
        }
    }

    /// Unbounded wildcard (`?`)
    pub fn wildcard() -> Self {
        Self {
            shape: Arc::new(TypeShape::Wildcard {
                upper_bound: None,
                lower_bound: None,
            }),
        }
    }

    /// Upper-bounded wildcard (`? extends T`)
    pub fn wildcard_extends(bound: &ModelType) -> Self {
        Self {
            shape: Arc::new(TypeShape::Wildcard {
                upper_bound: Some(bound.clone()),
                lower_bound: None,
            }),
        }
    }

    /// Lower-bounded wildcard (`? super T`)
    pub fn wildcard_super(bound: &ModelType) -> Self {
        Self {
            shape: Arc::new(TypeShape::Wildcard {
                upper_bound: None,
                lower_bound: Some(bound.clone()),
            }),
        }
    }

    fn declared(&self) -> Option<&DeclaredType> {
        match &*self.raw_type().shape {
            TypeShape::Declared(declared) => Some(declared),
            _ => None,
        }
    }

    /// Simple name of the type (`?` for wildcards)
    pub fn name(&self) -> &str {
        match &*self.shape {
            TypeShape::Declared(declared) => &declared.name,
            TypeShape::Parameterized { raw, .. } => raw.name(),
            TypeShape::Wildcard { .. } => "?",
        }
    }

    /// The declared type behind a parameterization, or the type itself
    pub fn raw_type(&self) -> &ModelType {
        match &*self.shape {
            TypeShape::Parameterized { raw, .. } => raw,
            _ => self,
        }
    }

    pub fn kind(&self) -> Option<DeclaredKind> {
        self.declared().map(|d| d.kind)
    }

    pub fn is_interface(&self) -> bool {
        self.kind() == Some(DeclaredKind::Interface)
    }

    pub fn is_wildcard(&self) -> bool {
        matches!(&*self.shape, TypeShape::Wildcard { .. })
    }

    pub fn upper_bound(&self) -> Option<&ModelType> {
        match &*self.shape {
            TypeShape::Wildcard { upper_bound, .. } => upper_bound.as_ref(),
            _ => None,
        }
    }

    pub fn lower_bound(&self) -> Option<&ModelType> {
        match &*self.shape {
            TypeShape::Wildcard { lower_bound, .. } => lower_bound.as_ref(),
            _ => None,
        }
    }

    /// Generic parameters declared by the raw type
    pub fn type_parameters(&self) -> &[String] {
        self.declared().map_or(&[], |d| d.type_parameters.as_slice())
    }

    /// Arguments of a parameterized type; empty for anything else
    pub fn type_arguments(&self) -> &[ModelType] {
        match &*self.shape {
            TypeShape::Parameterized { arguments, .. } => arguments,
            _ => &[],
        }
    }

    /// Direct supertypes of the raw type
    pub fn supertypes(&self) -> &[ModelType] {
        self.declared().map_or(&[], |d| d.supertypes.as_slice())
    }

    /// All transitive supertypes, nearest first, without duplicates
    pub fn all_supertypes(&self) -> Vec<ModelType> {
        let mut seen = HashSet::new();
        let mut ordered = Vec::new();
        let mut pending: Vec<ModelType> = self.supertypes().iter().rev().cloned().collect();
        while let Some(next) = pending.pop() {
            if !seen.insert(next.clone()) {
                continue;
            }
            pending.extend(next.supertypes().iter().rev().cloned());
            ordered.push(next);
        }
        ordered
    }

    /// Properties declared directly on the raw type
    pub fn declared_properties(&self) -> &[PropertyDeclaration] {
        self.declared().map_or(&[], |d| d.properties.as_slice())
    }

    pub fn has_default_constructor(&self) -> bool {
        self.declared().is_some_and(|d| d.constructor.is_some())
    }

    /// Registered constructor, if the type has one
    pub fn constructor(&self) -> Option<Constructor> {
        self.declared().and_then(|d| d.constructor.clone())
    }

    /// Invoke the registered constructor
    pub fn new_instance(&self) -> Option<Instance> {
        self.declared()
            .and_then(|d| d.constructor.as_ref())
            .map(|construct| construct())
    }

    /// Whether a value of type `other` can be used where `self` is expected
    ///
    /// Type arguments are invariant unless the target argument is a wildcard.
    /// A raw target accepts every parameterization of itself or its subtypes.
    pub fn is_assignable_from(&self, other: &ModelType) -> bool {
        if self == other {
            return true;
        }
        match (&*self.shape, &*other.shape) {
            (
                TypeShape::Wildcard {
                    upper_bound,
                    lower_bound,
                },
                _,
            ) => {
                upper_bound
                    .as_ref()
                    .is_none_or(|upper| upper.is_assignable_from(other))
                    && lower_bound
                        .as_ref()
                        .is_none_or(|lower| other.is_assignable_from(lower))
            }
            (_, TypeShape::Wildcard { upper_bound, .. }) => upper_bound
                .as_ref()
                .is_some_and(|upper| self.is_assignable_from(upper)),
            _ => {
                if self.raw_type() == other.raw_type() {
                    self.arguments_contain(other)
                } else {
                    other
                        .supertypes()
                        .iter()
                        .any(|supertype| self.is_assignable_from(supertype))
                }
            }
        }
    }

    fn arguments_contain(&self, other: &ModelType) -> bool {
        let expected = self.type_arguments();
        if expected.is_empty() {
            return true;
        }
        let actual = other.type_arguments();
        expected.len() == actual.len()
            && expected.iter().zip(actual).all(|(e, a)| {
                if e.is_wildcard() {
                    e.is_assignable_from(a)
                } else {
                    e == a
                }
            })
    }
}

impl PartialEq for ModelType {
    fn eq(&self, other: &Self) -> bool {
        if Arc::ptr_eq(&self.shape, &other.shape) {
            return true;
        }
        match (&*self.shape, &*other.shape) {
            (TypeShape::Declared(a), TypeShape::Declared(b)) => a.name == b.name,
            (
                TypeShape::Parameterized {
                    raw: raw_a,
                    arguments: args_a,
                },
                TypeShape::Parameterized {
                    raw: raw_b,
                    arguments: args_b,
                },
            ) => raw_a == raw_b && args_a == args_b,
            (
                TypeShape::Wildcard {
                    upper_bound: upper_a,
                    lower_bound: lower_a,
                },
                TypeShape::Wildcard {
                    upper_bound: upper_b,
                    lower_bound: lower_b,
                },
            ) => upper_a == upper_b && lower_a == lower_b,
            _ => false,
        }
    }
}

impl Eq for ModelType {}

impl Hash for ModelType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match &*self.shape {
            TypeShape::Declared(declared) => {
                0u8.hash(state);
                declared.name.hash(state);
            }
            TypeShape::Parameterized { raw, arguments } => {
                1u8.hash(state);
                raw.hash(state);
                arguments.hash(state);
            }
            TypeShape::Wildcard {
                upper_bound,
                lower_bound,
            } => {
                2u8.hash(state);
                upper_bound.hash(state);
                lower_bound.hash(state);
            }
        }
    }
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &*self.shape {
            TypeShape::Declared(declared) => f.write_str(&declared.name),
            TypeShape::Parameterized { raw, arguments } => {
                write!(f, "{raw}<")?;
                for (i, argument) in arguments.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{argument}")?;
                }
                f.write_str(">")
            }
            TypeShape::Wildcard {
                upper_bound: Some(upper),
                ..
            } => write!(f, "? extends {upper}"),
            TypeShape::Wildcard {
                lower_bound: Some(lower),
                ..
            } => write!(f, "? super {lower}"),
            TypeShape::Wildcard { .. } => f.write_str("?"),
        }
    }
}

impl fmt::Debug for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ModelType({self})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hierarchy() -> (ModelType, ModelType, ModelType) {
        let base = ModelType::interface("ComponentSpec").build();
        let library = ModelType::interface("LibrarySpec").extends(&base).build();
        let native = ModelType::interface("NativeLibrarySpec")
            .extends(&library)
            .build();
        (base, library, native)
    }

    #[test]
    fn test_declared_subtyping_is_transitive() {
        let (base, library, native) = hierarchy();
        assert!(base.is_assignable_from(&native));
        assert!(library.is_assignable_from(&native));
        assert!(!native.is_assignable_from(&base));
        assert!(base.is_assignable_from(&base));
    }

    #[test]
    fn test_raw_target_accepts_any_parameterization() {
        let (_, library, _) = hierarchy();
        let builder = ModelType::interface("TypeBuilder").type_parameter("T").build();
        let component_builder = ModelType::interface("ComponentTypeBuilder")
            .type_parameter("T")
            .extends(&builder)
            .build();

        let parameterized = ModelType::parameterized(&component_builder, [library]);
        assert!(builder.is_assignable_from(&parameterized));
        assert!(component_builder.is_assignable_from(&parameterized));
        assert!(!parameterized.is_assignable_from(&component_builder));
    }

    #[test]
    fn test_type_arguments_are_invariant_without_wildcards() {
        let (base, library, native) = hierarchy();
        let list = ModelType::interface("List").type_parameter("E").build();
        let of_base = ModelType::parameterized(&list, [base.clone()]);
        let of_library = ModelType::parameterized(&list, [library.clone()]);
        let of_extends_base =
            ModelType::parameterized(&list, [ModelType::wildcard_extends(&base)]);
        let of_super_native =
            ModelType::parameterized(&list, [ModelType::wildcard_super(&native)]);

        assert!(!of_base.is_assignable_from(&of_library));
        assert!(of_extends_base.is_assignable_from(&of_library));
        assert!(of_super_native.is_assignable_from(&of_library));
        assert!(!of_super_native.is_assignable_from(&ModelType::parameterized(
            &list,
            [ModelType::interface("Unrelated").build()]
        )));
    }

    #[test]
    fn test_wildcard_display() {
        let (base, _, _) = hierarchy();
        assert_eq!(ModelType::wildcard().to_string(), "?");
        assert_eq!(
            ModelType::wildcard_extends(&base).to_string(),
            "? extends ComponentSpec"
        );
        assert_eq!(
            ModelType::wildcard_super(&base).to_string(),
            "? super ComponentSpec"
        );
        assert!(ModelType::wildcard().is_wildcard());
        assert!(!ModelType::wildcard().is_interface());
    }

    #[test]
    fn test_constructor_produces_fresh_instances() {
        #[derive(Default)]
        struct Counter(u32);

        let counter = ModelType::class("Counter")
            .constructor(Counter::default)
            .build();
        assert!(counter.has_default_constructor());

        let instance = counter.new_instance().expect("constructor registered");
        assert_eq!(instance.downcast_ref::<Counter>().map(|c| c.0), Some(0));

        let abstract_only = ModelType::abstract_class("Shape").build();
        assert!(!abstract_only.has_default_constructor());
        assert!(abstract_only.new_instance().is_none());
    }

    #[test]
    fn test_all_supertypes_deduplicates_diamonds() {
        let root = ModelType::interface("Root").build();
        let left = ModelType::interface("Left").extends(&root).build();
        let right = ModelType::interface("Right").extends(&root).build();
        let bottom = ModelType::interface("Bottom")
            .extends(&left)
            .extends(&right)
            .build();

        let names: Vec<String> = bottom
            .all_supertypes()
            .iter()
            .map(ModelType::to_string)
            .collect();
        assert_eq!(names, vec!["Left", "Root", "Right"]);
    }

    #[test]
    fn test_rule_source_marker_is_abstract() {
        assert_eq!(rule_source().name(), "RuleSource");
        assert_eq!(rule_source().kind(), Some(DeclaredKind::AbstractClass));
    }
}
