//! Error types and handling for rule extraction and model realization

use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// Main error type for rule extraction and model realization
///
/// The error is `Clone` so that cached extraction failures can be handed
/// to every caller that asks for the same rule source or schema.
#[derive(Debug, Clone, Error)]
pub enum TesseraError {
    /// A structural violation found while inspecting a declaration or type
    #[error("{message}")]
    InvalidModel { message: String },

    /// A rule declaration that cannot be turned into a rule
    #[error("{message}")]
    InvalidRuleDeclaration {
        descriptor: String,
        message: String,
        #[source]
        cause: Option<Box<TesseraError>>,
    },

    /// A rule source whose declarations produced validation problems
    #[error("Type {source_type} is not a valid rule source:{}", format_problems(.problems))]
    InvalidRuleSource {
        source_type: String,
        problems: Vec<String>,
    },

    /// Model path syntax errors
    #[error("Invalid model path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("Cannot register node at '{path}' because a node with that path already exists")]
    DuplicateNode { path: String },

    #[error("No model node at path '{path}'")]
    UnknownNode { path: String },

    /// A reference that matched no node in its scope
    #[error("Reference {reference} declared by {descriptor} could not be bound in scope '{scope}'")]
    UnboundReference {
        reference: String,
        scope: String,
        descriptor: String,
    },

    /// A by-type reference that matched several nodes
    #[error("Reference {reference} declared by {descriptor} is ambiguous in scope '{scope}', candidates: {}", .candidates.join(", "))]
    AmbiguousReference {
        reference: String,
        scope: String,
        descriptor: String,
        candidates: Vec<String>,
    },

    #[error("Model node '{path}' of type '{actual}' cannot be viewed as '{requested}' (requested by {descriptor})")]
    ViewTypeMismatch {
        path: String,
        requested: String,
        actual: String,
        descriptor: String,
    },

    #[error("Role '{role}' is not part of the configured phase order")]
    UnknownPhase { role: String },

    #[error("Cannot add rule {descriptor} for model node '{path}' at role '{role}': node has already passed that role")]
    PhaseAlreadyExecuted {
        path: String,
        role: String,
        descriptor: String,
    },

    #[error("Cannot add rule {descriptor} for model node '{path}': node is already realized")]
    NodeAlreadyRealized { path: String, descriptor: String },

    #[error("Cycle detected while realizing model node '{path}'")]
    CyclicRealization { path: String },

    /// Failure raised while executing a rule against a node
    #[error("Exception thrown while executing model rule: {descriptor} (node '{path}')")]
    RuleExecution {
        descriptor: String,
        path: String,
        #[source]
        source: Box<TesseraError>,
    },

    /// Failure reported by a rule body
    #[error("{message}")]
    RuleFailure { message: String },

    #[error("Rule argument {index} {problem}")]
    RuleArgument { index: usize, problem: String },

    /// Schema extraction errors
    #[error("Cannot extract schema for '{model_type}': {message}")]
    Schema { model_type: String, message: String },

    #[error("Type '{model_type}' cannot be instantiated: no constructor is registered for it")]
    NotConstructible { model_type: String },

    #[error("Circular dependency between rule sources: {}", .cycle.join(" → "))]
    CircularRuleDependency { cycle: Vec<String> },

    #[error("Rule source '{source_type}' is not known to the rule source catalog")]
    MissingRuleSource { source_type: String },

    /// Configuration loading or validation errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// File system I/O errors
    #[error("IO error for path '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: Arc<std::io::Error>,
    },

    /// Generic internal errors
    #[error("Internal error: {message}")]
    Internal { message: String },
}

fn format_problems(problems: &[String]) -> String {
    problems.iter().map(|p| format!("\n- {p}")).collect()
}

/// Error kind enumeration for categorizing errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Declaration,
    Path,
    Binding,
    Realization,
    Execution,
    Schema,
    Dependency,
    Config,
    Io,
    Internal,
}

impl TesseraError {
    /// Get the error kind for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            TesseraError::InvalidModel { .. }
            | TesseraError::InvalidRuleDeclaration { .. }
            | TesseraError::InvalidRuleSource { .. } => ErrorKind::Declaration,
            TesseraError::InvalidPath { .. } => ErrorKind::Path,
            TesseraError::DuplicateNode { .. }
            | TesseraError::UnknownNode { .. }
            | TesseraError::UnboundReference { .. }
            | TesseraError::AmbiguousReference { .. }
            | TesseraError::ViewTypeMismatch { .. } => ErrorKind::Binding,
            TesseraError::UnknownPhase { .. }
            | TesseraError::PhaseAlreadyExecuted { .. }
            | TesseraError::NodeAlreadyRealized { .. }
            | TesseraError::CyclicRealization { .. }
            | TesseraError::NotConstructible { .. } => ErrorKind::Realization,
            TesseraError::RuleExecution { .. }
            | TesseraError::RuleFailure { .. }
            | TesseraError::RuleArgument { .. } => ErrorKind::Execution,
            TesseraError::Schema { .. } => ErrorKind::Schema,
            TesseraError::CircularRuleDependency { .. } | TesseraError::MissingRuleSource { .. } => {
                ErrorKind::Dependency
            }
            TesseraError::Config { .. } => ErrorKind::Config,
            TesseraError::Io { .. } => ErrorKind::Io,
            TesseraError::Internal { .. } => ErrorKind::Internal,
        }
    }

    /// Check if this error is recoverable
    ///
    /// Declaration problems only invalidate the offending declaration; the
    /// caller may keep extracting other declarations to report them together.
    pub fn is_recoverable(&self) -> bool {
        matches!(self.kind(), ErrorKind::Declaration | ErrorKind::Schema)
    }

    /// Create a structural model error
    pub fn invalid_model(message: impl Into<String>) -> Self {
        Self::InvalidModel {
            message: message.into(),
        }
    }

    /// Create an invalid rule declaration error
    pub fn invalid_rule_declaration(
        descriptor: impl Into<String>,
        message: impl Into<String>,
        cause: Option<TesseraError>,
    ) -> Self {
        Self::InvalidRuleDeclaration {
            descriptor: descriptor.into(),
            message: message.into(),
            cause: cause.map(Box::new),
        }
    }

    /// Create an invalid path error
    pub fn invalid_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a failure reported from inside a rule body
    pub fn rule_failure(message: impl Into<String>) -> Self {
        Self::RuleFailure {
            message: message.into(),
        }
    }

    /// Create a rule argument error
    pub fn rule_argument(index: usize, problem: impl Into<String>) -> Self {
        Self::RuleArgument {
            index,
            problem: problem.into(),
        }
    }

    /// Create a schema error
    pub fn schema(model_type: impl ToString, message: impl Into<String>) -> Self {
        Self::Schema {
            model_type: model_type.to_string(),
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config_error(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an IO error with path context
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source: Arc::new(source),
        }
    }

    /// Create an internal error
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Walk the source chain and return the innermost error's message
    pub fn root_cause_message(&self) -> String {
        let mut current: &dyn std::error::Error = self;
        while let Some(next) = current.source() {
            current = next;
        }
        current.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declaration_errors_are_recoverable() {
        let err = TesseraError::invalid_model("bad");
        assert_eq!(err.kind(), ErrorKind::Declaration);
        assert!(err.is_recoverable());

        let err = TesseraError::CircularRuleDependency {
            cycle: vec!["A".into(), "B".into(), "A".into()],
        };
        assert!(!err.is_recoverable());
        insta::assert_snapshot!(err.to_string(), @"Circular dependency between rule sources: A → B → A");
    }

    #[test]
    fn test_root_cause_message_follows_chain() {
        let err = TesseraError::invalid_rule_declaration(
            "Rules#configure",
            "Rules#configure is not a valid component model rule method.",
            Some(TesseraError::invalid_model("Internal view 'Printable' must be an interface.")),
        );
        assert_eq!(
            err.root_cause_message(),
            "Internal view 'Printable' must be an interface."
        );
    }

    #[test]
    fn test_invalid_rule_source_lists_problems() {
        let err = TesseraError::InvalidRuleSource {
            source_type: "MyRules".into(),
            problems: vec!["first".into(), "second".into()],
        };
        assert_eq!(
            err.to_string(),
            "Type MyRules is not a valid rule source:\n- first\n- second"
        );
    }
}
