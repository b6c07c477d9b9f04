//! Dependency graph resolution
//!
//! Splits a mapping's targets into the calls that can start immediately and
//! the calls that wait for a single upstream.

use std::sync::Arc;

use log::debug;

use crate::core::{
    error::{OrchestrationError, OrchestrationResult},
    mapping::{LegacyMapping, TargetDescriptor},
};

/// A dependent target paired with the target it reads its request value from
#[derive(Debug, Clone)]
pub struct DependentStep {
    pub target: Arc<TargetDescriptor>,
    pub upstream: Arc<TargetDescriptor>,
}

/// Per-call execution plan of one mapping
#[derive(Debug, Clone, Default)]
pub struct ExecutionPlan {
    pub independent: Vec<Arc<TargetDescriptor>>,
    pub dependent: Vec<DependentStep>,
}

impl ExecutionPlan {
    pub fn is_empty(&self) -> bool {
        self.independent.is_empty() && self.dependent.is_empty()
    }
}

/// Build the execution plan of `mapping`.
///
/// Each dependent target is paired with the first target whose url equals its
/// `depends_on`. Only one hop is followed.
pub fn resolve(mapping: &LegacyMapping) -> OrchestrationResult<ExecutionPlan> {
    let mut plan = ExecutionPlan::default();

    for target in &mapping.targets {
        let Some(dependency) = &target.dependency else {
            plan.independent.push(target.clone());
            continue;
        };

        let upstream = mapping
            .targets
            .iter()
            .find(|candidate| candidate.url == dependency.depends_on)
            .ok_or_else(|| OrchestrationError::UnresolvedDependency {
                target: target.url.clone(),
                depends_on: dependency.depends_on.clone(),
            })?;

        plan.dependent.push(DependentStep {
            target: target.clone(),
            upstream: upstream.clone(),
        });
    }

    debug!(
        "Resolved plan for {}: {} independent, {} dependent",
        mapping.legacy,
        plan.independent.len(),
        plan.dependent.len()
    );

    Ok(plan)
}
