//! Builder handed to type registration rules

use indexmap::IndexSet;
use std::sync::Arc;
use tessera_core::{ModelSchema, ModelType, Result, TesseraError};

/// Collects what a type registration rule declares about its type
///
/// A rule may add any number of internal views and name at most one default
/// implementation.
#[derive(Debug)]
pub struct TypeBuilder {
    schema: Arc<ModelSchema>,
    default_implementation: Option<ModelType>,
    internal_views: IndexSet<ModelType>,
}

impl TypeBuilder {
    pub fn new(schema: Arc<ModelSchema>) -> Self {
        Self {
            schema,
            default_implementation: None,
            internal_views: IndexSet::new(),
        }
    }

    /// Schema of the type being registered
    pub fn schema(&self) -> &ModelSchema {
        &self.schema
    }

    pub fn default_implementation(&mut self, implementation: &ModelType) -> Result<&mut Self> {
        if self.default_implementation.is_some() {
            return Err(TesseraError::invalid_model(
                "Method 'defaultImplementation' cannot be called more than once.",
            ));
        }
        self.default_implementation = Some(implementation.clone());
        Ok(self)
    }

    pub fn internal_view(&mut self, view: &ModelType) -> &mut Self {
        self.internal_views.insert(view.clone());
        self
    }

    pub fn implementation(&self) -> Option<&ModelType> {
        self.default_implementation.as_ref()
    }

    pub fn internal_views(&self) -> impl Iterator<Item = &ModelType> {
        self.internal_views.iter()
    }

    pub(crate) fn into_parts(self) -> (Arc<ModelSchema>, Option<ModelType>, Vec<ModelType>) {
        (
            self.schema,
            self.default_implementation,
            self.internal_views.into_iter().collect(),
        )
    }
}
