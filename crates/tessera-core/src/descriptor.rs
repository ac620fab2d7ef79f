//! Human readable rule origins

use std::fmt;
use std::sync::Arc;

/// Describes where a rule came from, for diagnostics
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RuleDescriptor {
    text: Arc<str>,
}

impl RuleDescriptor {
    pub fn new(text: impl AsRef<str>) -> Self {
        Self {
            text: Arc::from(text.as_ref()),
        }
    }

    /// Descriptor for a named rule on an owning rule source, `Owner#rule`
    pub fn method(owner: impl fmt::Display, rule: &str) -> Self {
        Self::new(format!("{owner}#{rule}"))
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }
}

impl fmt::Display for RuleDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_descriptor() {
        let descriptor = RuleDescriptor::method("BuildRules", "apply");
        assert_eq!(descriptor.to_string(), "BuildRules#apply");
        assert_eq!(descriptor, RuleDescriptor::new("BuildRules#apply"));
    }
}
