//! Orchestration façade serving legacy API calls from rationalized backends.
//!
//! Each legacy path maps to a set of rationalized targets. Independent targets
//! are fetched in parallel, dependent targets are fetched with a value taken
//! from their upstream, and the results are joined back into the legacy
//! response shape.

pub mod config;
pub mod core;
pub mod fetch;
pub mod logging;
pub mod orchestration;
pub mod service;
pub(crate) mod utils;
