//! Application-level configuration.
//!
//! - [`OrchestrationParams`]: orchestration loop control (iteration cap, history bound)

pub mod orchestration_params;

pub use orchestration_params::OrchestrationParams;
