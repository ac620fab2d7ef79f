//! Typed references into the model graph

use crate::path::ModelPath;
use crate::types::ModelType;
use std::fmt;

/// A typed pointer into the model graph
///
/// A reference with a path addresses that node (relative to the scope the
/// rule is applied in). A reference without a path is bound by type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModelReference {
    model_type: ModelType,
    path: Option<ModelPath>,
}

impl ModelReference {
    /// Reference bound by type only
    pub fn of_type(model_type: &ModelType) -> Self {
        Self {
            model_type: model_type.clone(),
            path: None,
        }
    }

    /// Reference to the node at `path`, viewed as `model_type`
    pub fn of(path: ModelPath, model_type: &ModelType) -> Self {
        Self {
            model_type: model_type.clone(),
            path: Some(path),
        }
    }

    pub fn model_type(&self) -> &ModelType {
        &self.model_type
    }

    pub fn path(&self) -> Option<&ModelPath> {
        self.path.as_ref()
    }

    /// Same reference, with the path resolved against `scope`
    pub fn in_scope(&self, scope: &ModelPath) -> Self {
        Self {
            model_type: self.model_type.clone(),
            path: self.path.as_ref().map(|path| scope.join(path)),
        }
    }
}

impl fmt::Display for ModelReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.path {
            Some(path) => write!(f, "{{path={path}, type={}}}", self.model_type),
            None => write!(f, "{{path=<unknown>, type={}}}", self.model_type),
        }
    }
}
