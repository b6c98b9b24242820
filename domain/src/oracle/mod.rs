//! Reasoning-oracle boundary types.
//!
//! The oracle is an untrusted, loosely typed collaborator. Everything it
//! returns goes through [`OracleDecision::parse`] before the orchestration
//! loop acts on it.

pub mod decision;

pub use decision::{OracleDecision, strip_code_fences};
