//! Validation problems recorded against a rule declaration

use std::fmt;
use tessera_core::{Result, RuleDescriptor, TesseraError};

/// One structural problem with a declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationProblem {
    pub descriptor: RuleDescriptor,
    pub message: String,
}

impl fmt::Display for ValidationProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Append-only accumulator of problems for a single declaration
///
/// Extractors record every problem they find instead of failing on the first
/// one; callers check [`has_problems`](Self::has_problems) before building a
/// rule.
#[derive(Debug)]
pub struct ValidationProblemCollector {
    descriptor: RuleDescriptor,
    problems: Vec<ValidationProblem>,
}

impl ValidationProblemCollector {
    pub fn new(descriptor: RuleDescriptor) -> Self {
        Self {
            descriptor,
            problems: Vec::new(),
        }
    }

    pub fn descriptor(&self) -> &RuleDescriptor {
        &self.descriptor
    }

    pub fn add(&mut self, message: impl Into<String>) {
        self.problems.push(ValidationProblem {
            descriptor: self.descriptor.clone(),
            message: message.into(),
        });
    }

    pub fn has_problems(&self) -> bool {
        !self.problems.is_empty()
    }

    pub fn problems(&self) -> &[ValidationProblem] {
        &self.problems
    }

    pub fn into_problems(self) -> Vec<ValidationProblem> {
        self.problems
    }

    /// Fail with a single error listing every recorded problem
    pub fn into_result(self) -> Result<()> {
        if self.problems.is_empty() {
            return Ok(());
        }
        let message = self
            .problems
            .iter()
            .map(|p| p.message.as_str())
            .collect::<Vec<_>>()
            .join("; ");
        Err(TesseraError::invalid_rule_declaration(
            self.descriptor.to_string(),
            message,
            None,
        ))
    }
}
