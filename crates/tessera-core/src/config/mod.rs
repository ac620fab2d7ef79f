//! Configuration system for tessera
//!
//! Engine settings are read from a single file, discovered by walking up
//! from a start directory until one of the known file names is found:
//! - `.tesserarc.toml` - dotfile config (TOML)
//! - `tessera.toml` - project config (TOML)
//! - `tessera.yaml` / `tessera.yml` - project config (YAML)
//! - `tessera.json` - project config (JSON)
//!
//! Every section and field is optional; missing values fall back to their
//! defaults.
//!
//! ## Example Configuration
//!
//! ```toml
//! [registry]
//! phases = ["defaults", "mutate", "finalize", "validate"]
//!
//! [extraction]
//! parallel = true
//! parallelThreshold = 8
//!
//! [logging]
//! filter = "tessera=debug"
//! json = false
//! ```

mod engine_config;
mod loader;

pub use engine_config::{
    EngineConfig, ExtractionConfiguration, LoggingConfiguration, RegistryConfiguration,
};
pub use loader::ConfigLoader;
