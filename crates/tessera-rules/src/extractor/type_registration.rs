use crate::builder::TypeBuilder;
use crate::declaration::{RuleArg, RuleArgs, RuleDeclaration};
use crate::extracted::ExtractedRule;
use std::sync::Arc;
use tessera_core::{ModelSchema, ModelSchemaStore, ModelType, Result, TesseraError};
use tracing::debug;

/// Everything a type registration rule declared, after validation
#[derive(Debug, Clone)]
pub struct TypeRegistration {
    pub model_name: String,
    pub declared_type: ModelType,
    /// `None` when the rule did not name a default implementation
    pub implementation: Option<ModelType>,
    pub internal_views: Vec<ModelType>,
    pub schema: Arc<ModelSchema>,
}

/// Turns a validated type registration into a rule
pub trait TypeRegistrationVariant: Send + Sync {
    /// Build the rule, or `None` when there is nothing to register
    fn create_registration(
        &self,
        declaration: &RuleDeclaration,
        registration: TypeRegistration,
    ) -> Result<Option<ExtractedRule>>;
}

/// Registers a new buildable type through a builder parameter
///
/// The declaration takes a single `Builder<T>` parameter. `T` must be a
/// subtype of the base interface; the rule configures the builder with an
/// optional default implementation and internal views, which are validated
/// against the base implementation before a registration is created.
pub struct TypeModelRuleExtractor {
    kind: String,
    model_name: String,
    base_interface: ModelType,
    base_implementation: ModelType,
    builder_interface: ModelType,
    schema_store: Arc<dyn ModelSchemaStore>,
    variant: Arc<dyn TypeRegistrationVariant>,
}

impl TypeModelRuleExtractor {
    pub fn new(
        kind: impl Into<String>,
        model_name: impl Into<String>,
        base_interface: &ModelType,
        base_implementation: &ModelType,
        builder_interface: &ModelType,
        schema_store: Arc<dyn ModelSchemaStore>,
        variant: Arc<dyn TypeRegistrationVariant>,
    ) -> Self {
        Self {
            kind: kind.into(),
            model_name: model_name.into(),
            base_interface: base_interface.clone(),
            base_implementation: base_implementation.clone(),
            builder_interface: builder_interface.clone(),
            schema_store,
            variant,
        }
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    pub fn base_interface(&self) -> &ModelType {
        &self.base_interface
    }

    pub fn base_implementation(&self) -> &ModelType {
        &self.base_implementation
    }

    pub fn builder_interface(&self) -> &ModelType {
        &self.builder_interface
    }

    pub fn description(&self) -> String {
        format!("declared with #[{}]", self.kind)
    }

    /// Extract a type registration rule
    ///
    /// Stops at the first structural error and reports it as the source of
    /// an invalid rule declaration error.
    pub fn registration(&self, declaration: &RuleDeclaration) -> Result<Option<ExtractedRule>> {
        self.extract(declaration).map_err(|cause| {
            let descriptor = declaration.descriptor().to_string();
            let message = format!(
                "{descriptor} is not a valid {} model rule method.",
                self.model_name
            );
            TesseraError::invalid_rule_declaration(descriptor, message, Some(cause))
        })
    }

    fn extract(&self, declaration: &RuleDeclaration) -> Result<Option<ExtractedRule>> {
        let declared_type = self.read_type(declaration)?;
        let schema = self.schema_store.schema(&declared_type)?;

        let mut builder = TypeBuilder::new(schema);
        {
            let mut args = RuleArgs::with_capacity(1);
            args.push(RuleArg::Mutable(&mut builder));
            declaration.invoke(&mut args)?;
        }
        let (schema, implementation, internal_views) = builder.into_parts();
        let implementation =
            self.determine_implementation_type(&declared_type, implementation, &internal_views)?;

        debug!(
            "Extracted {} type '{}' from {}",
            self.model_name,
            declared_type,
            declaration.descriptor()
        );
        self.variant.create_registration(
            declaration,
            TypeRegistration {
                model_name: self.model_name.clone(),
                declared_type,
                implementation,
                internal_views,
                schema,
            },
        )
    }

    fn read_type(&self, declaration: &RuleDeclaration) -> Result<ModelType> {
        if declaration.return_type().is_some() {
            return Err(TesseraError::invalid_model(format!(
                "Method {} must not have a return value.",
                self.description()
            )));
        }

        let single_parameter = || {
            TesseraError::invalid_model(format!(
                "Method {} must have a single parameter of type '{}'.",
                self.description(),
                self.builder_interface
            ))
        };
        let [reference] = declaration.references() else {
            return Err(single_parameter());
        };
        let builder = reference.model_type();
        if !self.builder_interface.is_assignable_from(builder) {
            return Err(single_parameter());
        }

        let [declared_type] = builder.type_arguments() else {
            return Err(TesseraError::invalid_model(format!(
                "Parameter of type '{}' must declare a type parameter.",
                self.builder_interface
            )));
        };
        let model = capitalize(&self.model_name);
        if declared_type.is_wildcard() {
            return Err(TesseraError::invalid_model(format!(
                "{model} type '{declared_type}' cannot be a wildcard type (i.e. cannot use ? super, ? extends etc.)."
            )));
        }
        if !self.base_interface.is_assignable_from(declared_type) {
            return Err(TesseraError::invalid_model(format!(
                "{model} type '{declared_type}' is not a subtype of '{}'.",
                self.base_interface
            )));
        }
        Ok(declared_type.clone())
    }

    fn determine_implementation_type(
        &self,
        declared_type: &ModelType,
        implementation: Option<ModelType>,
        internal_views: &[ModelType],
    ) -> Result<Option<ModelType>> {
        if let Some(view) = internal_views.iter().find(|view| !view.is_interface()) {
            return Err(TesseraError::invalid_model(format!(
                "Internal view '{view}' must be an interface."
            )));
        }

        let Some(implementation) = implementation else {
            return Ok(None);
        };

        let model = capitalize(&self.model_name);
        if !self.base_implementation.is_assignable_from(&implementation) {
            return Err(TesseraError::invalid_model(format!(
                "{model} implementation '{implementation}' must extend '{}'.",
                self.base_implementation
            )));
        }
        if !declared_type.is_assignable_from(&implementation) {
            return Err(TesseraError::invalid_model(format!(
                "{model} implementation '{implementation}' must implement '{declared_type}'."
            )));
        }
        if let Some(view) = internal_views
            .iter()
            .find(|view| !view.is_assignable_from(&implementation))
        {
            return Err(TesseraError::invalid_model(format!(
                "{model} implementation '{implementation}' must implement internal view '{view}'."
            )));
        }
        if !implementation.has_default_constructor() {
            return Err(TesseraError::invalid_model(format!(
                "{model} implementation '{implementation}' must have public default constructor."
            )));
        }

        Ok(Some(implementation))
    }
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extracted::RuleApplication;
    use std::sync::Mutex;
    use tessera_core::{DefaultModelSchemaStore, ModelReference, RuleDescriptor};

    #[derive(Default)]
    struct Recording {
        registrations: Mutex<Vec<TypeRegistration>>,
    }

    impl TypeRegistrationVariant for Recording {
        fn create_registration(
            &self,
            declaration: &RuleDeclaration,
            registration: TypeRegistration,
        ) -> Result<Option<ExtractedRule>> {
            self.registrations.lock().unwrap().push(registration);
            Ok(Some(ExtractedRule::new(
                declaration.descriptor().clone(),
                RuleApplication::custom(|_, _| Ok(())),
            )))
        }
    }

    struct Fixture {
        component: ModelType,
        base_implementation: ModelType,
        builder: ModelType,
        recording: Arc<Recording>,
        extractor: TypeModelRuleExtractor,
    }

    fn fixture() -> Fixture {
        let component = ModelType::interface("ComponentSpec").build();
        let base_implementation = ModelType::class("BaseComponentSpec")
            .extends(&component)
            .build();
        let builder = ModelType::interface("ComponentTypeBuilder")
            .type_parameter("T")
            .build();
        let recording = Arc::new(Recording::default());
        let extractor = TypeModelRuleExtractor::new(
            "component_type",
            "component",
            &component,
            &base_implementation,
            &builder,
            Arc::new(DefaultModelSchemaStore::new()),
            recording.clone(),
        );
        Fixture {
            component,
            base_implementation,
            builder,
            recording,
            extractor,
        }
    }

    fn declaration(fixture: &Fixture, argument: ModelType) -> RuleDeclaration {
        RuleDeclaration::new(RuleDescriptor::new("Rules#register"), |_| Ok(())).reference(
            ModelReference::of_type(&ModelType::parameterized(&fixture.builder, [argument])),
        )
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("component"), "Component");
        assert_eq!(capitalize(""), "");
    }

    #[test]
    fn test_wildcard_is_reported_before_subtype() {
        let fixture = fixture();
        let unrelated = ModelType::interface("Toolchain").build();
        let decl = declaration(&fixture, ModelType::wildcard_extends(&unrelated));

        let err = fixture.extractor.registration(&decl).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Rules#register is not a valid component model rule method."
        );
        assert_eq!(
            err.root_cause_message(),
            "Component type '? extends Toolchain' cannot be a wildcard type (i.e. cannot use ? super, ? extends etc.)."
        );
    }

    #[test]
    fn test_builder_without_type_argument_is_rejected() {
        let fixture = fixture();
        let decl = RuleDeclaration::new(RuleDescriptor::new("Rules#register"), |_| Ok(()))
            .reference(ModelReference::of_type(&fixture.builder));

        let err = fixture.extractor.registration(&decl).unwrap_err();
        assert_eq!(
            err.root_cause_message(),
            "Parameter of type 'ComponentTypeBuilder' must declare a type parameter."
        );
    }

    #[test]
    fn test_wrong_parameter_and_return_value() {
        let fixture = fixture();
        let decl = RuleDeclaration::new(RuleDescriptor::new("Rules#register"), |_| Ok(()))
            .reference(ModelReference::of_type(&fixture.component));
        let err = fixture.extractor.registration(&decl).unwrap_err();
        assert_eq!(
            err.root_cause_message(),
            "Method declared with #[component_type] must have a single parameter of type 'ComponentTypeBuilder'."
        );

        let decl = declaration(&fixture, fixture.component.clone()).returns(&fixture.component);
        let err = fixture.extractor.registration(&decl).unwrap_err();
        assert_eq!(
            err.root_cause_message(),
            "Method declared with #[component_type] must not have a return value."
        );
    }

    #[test]
    fn test_builder_configuration_reaches_registration() {
        #[derive(Default)]
        struct DefaultLibrary;

        let fixture = fixture();
        let library = ModelType::interface("LibrarySpec")
            .extends(&fixture.component)
            .build();
        let internal = ModelType::interface("LibraryInternal").build();
        let implementation = ModelType::class("DefaultLibrary")
            .extends(&fixture.base_implementation)
            .extends(&library)
            .extends(&internal)
            .constructor(DefaultLibrary::default)
            .build();

        let configured_impl = implementation.clone();
        let configured_view = internal.clone();
        let decl = RuleDeclaration::new(RuleDescriptor::new("Rules#register"), move |args| {
            args.get_mut::<TypeBuilder>(0)?
                .default_implementation(&configured_impl)?
                .internal_view(&configured_view);
            Ok(())
        })
        .reference(ModelReference::of_type(&ModelType::parameterized(
            &fixture.builder,
            [library.clone()],
        )));

        assert!(fixture.extractor.registration(&decl).unwrap().is_some());
        let registrations = fixture.recording.registrations.lock().unwrap();
        let registration = &registrations[0];
        assert_eq!(registration.declared_type, library);
        assert_eq!(registration.implementation, Some(implementation));
        assert_eq!(registration.internal_views, vec![internal]);
        assert_eq!(registration.schema.model_type(), &library);
    }

    #[test]
    fn test_implementation_checks_run_in_order() {
        let fixture = fixture();
        let library = ModelType::interface("LibrarySpec")
            .extends(&fixture.component)
            .build();
        let internal = ModelType::interface("LibraryInternal").build();

        let cases = [
            (
                ModelType::class("Standalone").extends(&library).build(),
                "Component implementation 'Standalone' must extend 'BaseComponentSpec'.",
            ),
            (
                ModelType::class("OtherComponent")
                    .extends(&fixture.base_implementation)
                    .build(),
                "Component implementation 'OtherComponent' must implement 'LibrarySpec'.",
            ),
            (
                ModelType::class("ViewlessLibrary")
                    .extends(&fixture.base_implementation)
                    .extends(&library)
                    .build(),
                "Component implementation 'ViewlessLibrary' must implement internal view 'LibraryInternal'.",
            ),
            (
                ModelType::class("NoConstructor")
                    .extends(&fixture.base_implementation)
                    .extends(&library)
                    .extends(&internal)
                    .build(),
                "Component implementation 'NoConstructor' must have public default constructor.",
            ),
        ];

        for (implementation, expected) in cases {
            let view = internal.clone();
            let decl = RuleDeclaration::new(RuleDescriptor::new("Rules#register"), move |args| {
                args.get_mut::<TypeBuilder>(0)?
                    .default_implementation(&implementation)?
                    .internal_view(&view);
                Ok(())
            })
            .reference(ModelReference::of_type(&ModelType::parameterized(
                &fixture.builder,
                [library.clone()],
            )));

            let err = fixture.extractor.registration(&decl).unwrap_err();
            assert_eq!(err.root_cause_message(), expected);
        }
        assert!(fixture.recording.registrations.lock().unwrap().is_empty());
    }
}
