//! Reasoning oracle adapters.

mod gemini;

pub use gemini::{DEFAULT_API_KEY_ENV, DEFAULT_MODEL, GeminiOracle};
