//! Legacy endpoint mappings as seen by the orchestration core.
//!
//! Built once from validated configuration and shared read-only between calls.

use std::sync::Arc;

use crate::config::{Aggregation, Shape};

use super::accessor::{FieldAccessor, DEFAULT_ITEMS_FIELD};

/// Request parameter used for the extracted value when none is configured
pub const DEFAULT_DEPENDENCY_PARAM: &str = "dependency";

/// Decoding contract of a backend response
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseShape {
    pub id: String,
    /// Field holding the item collection
    pub items: String,
    /// Fields every item must carry
    pub required: Vec<String>,
}

impl Default for ResponseShape {
    fn default() -> Self {
        Self {
            id: "default".to_string(),
            items: DEFAULT_ITEMS_FIELD.to_string(),
            required: Vec::new(),
        }
    }
}

impl ResponseShape {
    pub fn accessor(&self) -> FieldAccessor<'_> {
        FieldAccessor::new(&self.items)
    }
}

impl From<&Shape> for ResponseShape {
    fn from(shape: &Shape) -> Self {
        Self {
            id: shape.id.clone(),
            items: shape.items.clone(),
            required: shape.required.clone(),
        }
    }
}

/// Upstream link of a dependent target
#[derive(Debug, Clone, PartialEq)]
pub struct Dependency {
    /// Url of the upstream target
    pub depends_on: String,
    /// Field path read from the upstream response
    pub field: String,
    /// Request parameter carrying the extracted value
    pub param: String,
}

/// One rationalized endpoint of a legacy mapping
#[derive(Debug, Clone, PartialEq)]
pub struct TargetDescriptor {
    pub url: String,
    pub dependency: Option<Dependency>,
    pub shape: Arc<ResponseShape>,
    pub max_concurrency: usize,
}

impl TargetDescriptor {
    pub fn is_dependent(&self) -> bool {
        self.dependency.is_some()
    }
}

/// A legacy path with its ordered targets and aggregation rules
#[derive(Debug, Clone)]
pub struct LegacyMapping {
    pub legacy: String,
    pub targets: Vec<Arc<TargetDescriptor>>,
    pub aggregation: Aggregation,
}
