//! Prompt domain
//!
//! Renders the single decision request sent to the reasoning oracle on every
//! iteration of an orchestration run.

mod template;

pub use template::DecisionPrompt;
