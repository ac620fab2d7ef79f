//! Configuration types for the rule engine

use crate::result::Result;
use crate::role::{ModelActionRole, PhaseOrder};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Root configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    /// Model registry settings
    #[schemars(description = "Model registry settings")]
    pub registry: RegistryConfiguration,

    /// Rule extraction settings
    #[schemars(description = "Rule extraction settings")]
    pub extraction: ExtractionConfiguration,

    /// Logging settings
    #[schemars(description = "Logging settings")]
    pub logging: LoggingConfiguration,
}

impl EngineConfig {
    /// JSON Schema describing the configuration file
    pub fn json_schema() -> serde_json::Value {
        serde_json::to_value(schemars::schema_for!(EngineConfig)).unwrap_or_default()
    }

    /// Check cross-field constraints that serde cannot express
    pub fn validate(&self) -> Result<()> {
        self.registry.phase_order().map(|_| ())
    }
}

/// Model registry configuration
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct RegistryConfiguration {
    /// Phases executed on every node, in order
    #[schemars(description = "Roles executed when realizing a node, in execution order")]
    pub phases: Vec<ModelActionRole>,
}

impl RegistryConfiguration {
    pub fn phase_order(&self) -> Result<PhaseOrder> {
        PhaseOrder::new(self.phases.clone())
    }
}

impl Default for RegistryConfiguration {
    fn default() -> Self {
        Self {
            phases: PhaseOrder::default().roles().to_vec(),
        }
    }
}

/// Rule extraction configuration
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ExtractionConfiguration {
    /// Extract rule declarations on the rayon pool
    #[schemars(description = "Extract the declarations of a rule source in parallel")]
    pub parallel: bool,

    /// Minimum number of declarations before extraction goes parallel
    #[schemars(description = "Minimum number of declarations before parallel extraction is used")]
    pub parallel_threshold: usize,
}

impl Default for ExtractionConfiguration {
    fn default() -> Self {
        Self {
            parallel: true,
            parallel_threshold: 8,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingConfiguration {
    /// Filter directive used when `RUST_LOG` is not set
    #[schemars(description = "tracing filter directive, overridden by RUST_LOG")]
    pub filter: String,

    /// Emit JSON log lines
    #[schemars(description = "Emit structured JSON log lines")]
    pub json: bool,
}

impl Default for LoggingConfiguration {
    fn default() -> Self {
        Self {
            filter: "tessera=info".to_string(),
            json: false,
        }
    }
}
