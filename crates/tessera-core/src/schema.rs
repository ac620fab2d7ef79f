//! Structural schemas for model types
//!
//! A schema flattens a type's declared and inherited properties into a
//! single description that type builders are bound to. Schemas are
//! deterministic, so the default store computes each one once and shares it.

use crate::cache::SingleFlightCache;
use crate::error::TesseraError;
use crate::result::Result;
use crate::types::{DeclaredKind, ModelType};
use indexmap::IndexMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::debug;

/// A property as seen through a schema
#[derive(Debug, Clone, PartialEq)]
pub struct ModelProperty {
    pub name: String,
    pub model_type: ModelType,
    pub writable: bool,
    /// The type that declared the property
    pub declared_by: ModelType,
}

/// Structural description of a model type
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSchema {
    model_type: ModelType,
    kind: DeclaredKind,
    properties: Vec<ModelProperty>,
}

impl ModelSchema {
    pub fn model_type(&self) -> &ModelType {
        &self.model_type
    }

    pub fn kind(&self) -> DeclaredKind {
        self.kind
    }

    pub fn properties(&self) -> &[ModelProperty] {
        &self.properties
    }

    pub fn property(&self, name: &str) -> Option<&ModelProperty> {
        self.properties.iter().find(|p| p.name == name)
    }
}

/// Source of schemas for model types
pub trait ModelSchemaStore: Send + Sync {
    fn schema(&self, model_type: &ModelType) -> Result<Arc<ModelSchema>>;
}

/// Schema store backed by a single-flight cache
#[derive(Default)]
pub struct DefaultModelSchemaStore {
    cache: SingleFlightCache<ModelType, Result<Arc<ModelSchema>>>,
    extractions: AtomicUsize,
}

impl DefaultModelSchemaStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of schemas actually extracted (cache misses)
    pub fn extraction_count(&self) -> usize {
        self.extractions.load(Ordering::Relaxed)
    }

    pub fn cached_types(&self) -> usize {
        self.cache.len()
    }

    fn extract(&self, model_type: &ModelType) -> Result<Arc<ModelSchema>> {
        self.extractions.fetch_add(1, Ordering::Relaxed);
        debug!("Extracting schema for '{}'", model_type);

        if model_type.is_wildcard() {
            return Err(TesseraError::schema(
                model_type,
                "wildcard types do not have a schema",
            ));
        }
        let kind = model_type
            .kind()
            .ok_or_else(|| TesseraError::schema(model_type, "type is not declared"))?;

        let mut properties: IndexMap<String, ModelProperty> = IndexMap::new();
        let owners = std::iter::once(model_type.raw_type().clone()).chain(model_type.all_supertypes());
        for owner in owners {
            let mut seen_on_owner = Vec::new();
            for declared in owner.declared_properties() {
                if seen_on_owner.contains(&declared.name) {
                    return Err(TesseraError::schema(
                        model_type,
                        format!(
                            "property '{}' is declared more than once by '{}'",
                            declared.name, owner
                        ),
                    ));
                }
                seen_on_owner.push(declared.name.clone());

                match properties.get(&declared.name) {
                    Some(existing) if existing.model_type != declared.model_type => {
                        return Err(TesseraError::schema(
                            model_type,
                            format!(
                                "property '{}' is declared as '{}' by '{}' and as '{}' by '{}'",
                                declared.name,
                                existing.model_type,
                                existing.declared_by,
                                declared.model_type,
                                owner
                            ),
                        ));
                    }
                    Some(_) => {}
                    None => {
                        properties.insert(
                            declared.name.clone(),
                            ModelProperty {
                                name: declared.name.clone(),
                                model_type: declared.model_type.clone(),
                                writable: declared.writable,
                                declared_by: owner.clone(),
                            },
                        );
                    }
                }
            }
        }

        Ok(Arc::new(ModelSchema {
            model_type: model_type.clone(),
            kind,
            properties: properties.into_values().collect(),
        }))
    }
}

impl ModelSchemaStore for DefaultModelSchemaStore {
    fn schema(&self, model_type: &ModelType) -> Result<Arc<ModelSchema>> {
        self.cache
            .get_or_compute(model_type, || self.extract(model_type))
    }
}
