//! Tessera Core
//!
//! Model graph primitives for the tessera rule engine: typed paths and
//! references, the model type algebra, schemas, executable model actions and
//! a minimal in-memory model registry that runs actions phase by phase.

pub mod action;
pub mod cache;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod path;
pub mod reference;
pub mod registry;
pub mod result;
pub mod role;
pub mod schema;
pub mod types;

// Re-export commonly used types
pub use action::{ModelAction, ModelView, MutableModelNode};
pub use cache::SingleFlightCache;
pub use config::{
    ConfigLoader, EngineConfig, ExtractionConfiguration, LoggingConfiguration,
    RegistryConfiguration,
};
pub use descriptor::RuleDescriptor;
pub use error::{ErrorKind, TesseraError};
pub use path::ModelPath;
pub use reference::ModelReference;
pub use registry::{
    ConstructibleTypesRegistry, DefaultModelRegistry, ModelRegistry, NodeInitializer,
    RegisteredAction, RuleSourceApplier,
};
pub use result::Result;
pub use role::{ModelActionRole, PhaseOrder};
pub use schema::{DefaultModelSchemaStore, ModelProperty, ModelSchema, ModelSchemaStore};
pub use types::{DeclaredKind, Instance, ModelType, ModelTypeBuilder, rule_source};

/// Initialize the tracing subscriber for logging
pub fn init_tracing() {
    init_tracing_with(&LoggingConfiguration::default());
}

/// Initialize the tracing subscriber from logging configuration
///
/// `RUST_LOG` takes precedence over the configured filter.
pub fn init_tracing_with(config: &LoggingConfiguration) {
    use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.filter));
    let registry = tracing_subscriber::registry().with(filter);

    if config.json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_file(true)
                    .with_line_number(true),
            )
            .init();
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_file(true)
                    .with_line_number(true),
            )
            .init();
    }
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
