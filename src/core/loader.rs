//! Mapping loading utilities
//!
//! Converts validated configuration into the shared mappings the
//! orchestrator serves.

use std::{collections::HashMap, sync::Arc};

use log::info;

use crate::config::{Config, Mapping, Rationalized};

use super::{
    error::{OrchestrationError, OrchestrationResult},
    mapping::{Dependency, LegacyMapping, ResponseShape, TargetDescriptor, DEFAULT_DEPENDENCY_PARAM},
};

/// Builds [`LegacyMapping`]s from configuration
pub struct MappingLoader {
    shapes: HashMap<String, Arc<ResponseShape>>,
    default_shape: Arc<ResponseShape>,
}

impl MappingLoader {
    pub fn new(config: &Config) -> Self {
        let shapes = config
            .shapes
            .iter()
            .map(|shape| (shape.id.clone(), Arc::new(ResponseShape::from(shape))))
            .collect();

        Self {
            shapes,
            default_shape: Arc::new(ResponseShape::default()),
        }
    }

    /// Load every mapping of `config`
    pub fn load(config: &Config) -> OrchestrationResult<Vec<Arc<LegacyMapping>>> {
        let loader = Self::new(config);
        info!("Loading {} legacy mappings", config.mappings.len());

        config
            .mappings
            .iter()
            .map(|mapping| loader.load_mapping(mapping).map(Arc::new))
            .collect()
    }

    fn load_mapping(&self, mapping: &Mapping) -> OrchestrationResult<LegacyMapping> {
        let targets = mapping
            .rationalized
            .iter()
            .map(|target| self.load_target(target).map(Arc::new))
            .collect::<OrchestrationResult<Vec<_>>>()?;

        info!(
            "Loaded mapping {} with {} targets",
            mapping.legacy,
            targets.len()
        );

        Ok(LegacyMapping {
            legacy: mapping.legacy.clone(),
            targets,
            aggregation: mapping.aggregation.clone(),
        })
    }

    fn load_target(&self, target: &Rationalized) -> OrchestrationResult<TargetDescriptor> {
        let shape = match &target.response_model {
            Some(model) => self.shapes.get(model).cloned().ok_or_else(|| {
                OrchestrationError::Configuration(format!("Unknown response model: {model}"))
            })?,
            None => self.default_shape.clone(),
        };

        let dependency = match (target.dependent, &target.depends_on, &target.dependency_field) {
            (false, _, _) => None,
            (true, Some(depends_on), Some(field)) => Some(Dependency {
                depends_on: depends_on.clone(),
                field: field.clone(),
                param: target
                    .dependency_param
                    .clone()
                    .unwrap_or_else(|| DEFAULT_DEPENDENCY_PARAM.to_string()),
            }),
            (true, _, _) => {
                return Err(OrchestrationError::Configuration(format!(
                    "Dependent target {} needs depends_on and dependency_field",
                    target.url
                )))
            }
        };

        Ok(TargetDescriptor {
            url: target.url.clone(),
            dependency,
            shape,
            max_concurrency: target.max_concurrency,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONF: &str = r#"
listeners:
  - address: 127.0.0.1:8080
shapes:
  - id: CustomerList
    items: results
mappings:
  - legacy: /legacy/api1
    rationalized:
      - url: http://a.internal/items
        response_model: CustomerList
        max_concurrency: 3
      - url: http://b.internal/items
        dependent: true
        depends_on: http://a.internal/items
        dependency_field: commonId
        max_concurrency: 1
    "#;

    #[test]
    fn test_load_mappings() {
        let config = Config::from_yaml(CONF).unwrap();
        let mappings = MappingLoader::load(&config).unwrap();
        assert_eq!(mappings.len(), 1);

        let mapping = &mappings[0];
        assert_eq!(mapping.legacy, "/legacy/api1");
        assert_eq!(mapping.targets.len(), 2);

        let upstream = &mapping.targets[0];
        assert!(!upstream.is_dependent());
        assert_eq!(upstream.shape.items, "results");
        assert_eq!(upstream.max_concurrency, 3);

        let dependent = &mapping.targets[1];
        let dependency = dependent.dependency.as_ref().unwrap();
        assert_eq!(dependency.depends_on, "http://a.internal/items");
        assert_eq!(dependency.field, "commonId");
        assert_eq!(dependency.param, DEFAULT_DEPENDENCY_PARAM);
        assert_eq!(dependent.shape.items, "items");
    }

    #[test]
    fn test_shapes_are_shared() {
        let config = Config::from_yaml(CONF).unwrap();
        let loader = MappingLoader::new(&config);
        let first = loader.load_target(&config.mappings[0].rationalized[0]).unwrap();
        let second = loader.load_target(&config.mappings[0].rationalized[0]).unwrap();
        assert!(Arc::ptr_eq(&first.shape, &second.shape));
    }
}
