//! Model paths
//!
//! A path addresses a node in the model graph as a dot separated list of
//! names, e.g. `components.main.sources`. The empty path is the root.

use crate::error::TesseraError;
use crate::result::Result;
use std::fmt;

/// Address of a node in the model graph
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ModelPath {
    components: Vec<String>,
}

impl ModelPath {
    /// The root of the model graph
    pub fn root() -> Self {
        Self::default()
    }

    /// Parse a dot separated path
    ///
    /// The empty string parses to the root path.
    pub fn parse(path: &str) -> Result<Self> {
        if path.is_empty() {
            return Ok(Self::root());
        }
        let components = path
            .split('.')
            .map(|name| {
                validate_name(name)
                    .map(|_| name.to_string())
                    .map_err(|reason| TesseraError::invalid_path(path, reason))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { components })
    }

    /// Resolve a relative path against this one
    pub fn join(&self, relative: &ModelPath) -> Self {
        let mut components = self.components.clone();
        components.extend(relative.components.iter().cloned());
        Self { components }
    }

    pub fn parent(&self) -> Option<Self> {
        if self.is_root() {
            return None;
        }
        Some(Self {
            components: self.components[..self.components.len() - 1].to_vec(),
        })
    }

    pub fn name(&self) -> Option<&str> {
        self.components.last().map(String::as_str)
    }

    pub fn is_root(&self) -> bool {
        self.components.is_empty()
    }

    pub fn depth(&self) -> usize {
        self.components.len()
    }

    /// Whether `other` is a direct child of this path
    pub fn is_direct_parent_of(&self, other: &ModelPath) -> bool {
        other.depth() == self.depth() + 1 && other.components.starts_with(&self.components)
    }

    pub fn components(&self) -> &[String] {
        &self.components
    }
}

fn validate_name(name: &str) -> std::result::Result<(), String> {
    if name.is_empty() {
        return Err("path elements cannot be empty".to_string());
    }
    if let Some(c) = name
        .chars()
        .find(|c| !(c.is_alphanumeric() || *c == '_' || *c == '-'))
    {
        return Err(format!("name '{name}' contains illegal character '{c}'"));
    }
    Ok(())
}

impl fmt::Display for ModelPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            return f.write_str("<root>");
        }
        f.write_str(&self.components.join("."))
    }
}
