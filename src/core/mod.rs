//! Core abstractions and interfaces for pinglegacy
//!
//! This module provides the document model, the endpoint pools and the
//! error types the orchestration layer is built on.

pub mod accessor;
pub mod document;
pub mod error;
pub mod loader;
pub mod mapping;
pub mod metrics;
pub mod registry;
pub mod status;
pub mod traits;

// Re-export commonly used types
pub use accessor::FieldAccessor;
pub use document::{Document, Scalar};
pub use error::{OrchestrationError, OrchestrationResult};
pub use loader::MappingLoader;
pub use mapping::{Dependency, LegacyMapping, ResponseShape, TargetDescriptor};
pub use registry::{EndpointPool, PoolRegistry, PoolStats};
pub use traits::{FetchRequest, Fetcher};
