//! Configuration file discovery and loading

use super::engine_config::EngineConfig;
use crate::error::TesseraError;
use crate::result::Result;
use std::fs;
use std::path::{Path, PathBuf};

/// File names searched for, in priority order
const CONFIG_FILE_NAMES: &[&str] = &[
    ".tesserarc.toml",
    "tessera.toml",
    "tessera.yaml",
    "tessera.yml",
    "tessera.json",
];

/// Configuration loader for discovering and loading config files
pub struct ConfigLoader;

impl ConfigLoader {
    /// Auto-discover config file by traversing upward from start_path
    ///
    /// Within one directory the known file names are tried in priority
    /// order. Returns `None` once the filesystem root is reached.
    pub fn auto_discover(start_path: &Path) -> Result<Option<PathBuf>> {
        let mut current = start_path
            .canonicalize()
            .map_err(|e| TesseraError::config_error(format!("Invalid path: {e}")))?;

        loop {
            for filename in CONFIG_FILE_NAMES {
                let config_path = current.join(filename);
                if config_path.is_file() {
                    tracing::debug!("Found config: {}", config_path.display());
                    return Ok(Some(config_path));
                }
            }

            match current.parent() {
                Some(parent) => current = parent.to_path_buf(),
                None => break,
            }
        }

        Ok(None)
    }

    /// Load configuration from a specific file
    ///
    /// The format is chosen by extension: TOML, YAML or JSON.
    pub fn load_from_file(path: &Path) -> Result<EngineConfig> {
        let content = fs::read_to_string(path).map_err(|e| TesseraError::io_error(path, e))?;
        let parse_error = |e: &dyn std::fmt::Display| {
            TesseraError::config_error(format!(
                "Failed to load config from '{}': {}",
                path.display(),
                e
            ))
        };

        let config: EngineConfig = match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => toml::from_str(&content).map_err(|e| parse_error(&e))?,
            Some("yaml") | Some("yml") => {
                serde_yaml::from_str(&content).map_err(|e| parse_error(&e))?
            }
            Some("json") => serde_json::from_str(&content).map_err(|e| parse_error(&e))?,
            _ => {
                return Err(TesseraError::config_error(format!(
                    "Unsupported config file '{}' (expected .toml, .yaml, .yml or .json)",
                    path.display()
                )));
            }
        };

        config.validate()?;
        Ok(config)
    }

    /// Load config from path or auto-discover
    ///
    /// Without an explicit path and without a discoverable file, the default
    /// configuration is returned.
    pub fn load(custom_path: Option<&Path>, start_dir: Option<&Path>) -> Result<EngineConfig> {
        if let Some(path) = custom_path {
            if !path.exists() {
                return Err(TesseraError::config_error(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            return Self::load_from_file(path);
        }

        let search_dir = start_dir.unwrap_or_else(|| Path::new("."));
        match Self::auto_discover(search_dir)? {
            Some(config_path) => Self::load_from_file(&config_path),
            None => {
                tracing::debug!("No config file found, using defaults");
                Ok(EngineConfig::default())
            }
        }
    }
}
