//! Qualified `provider.tool` references.

use std::fmt;
use thiserror::Error;

/// Why a `provider.tool` reference was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ToolReferenceError {
    #[error("tool reference is empty")]
    Empty,

    #[error("tool reference '{0}' must have the form provider.tool")]
    MissingSeparator(String),

    #[error("tool reference '{0}' contains more than one '.' separator")]
    TooManySeparators(String),

    #[error("tool reference '{0}' has an empty provider or tool name")]
    EmptyPart(String),
}

/// A tool identified by its owning provider, parsed from `provider.tool`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ToolReference {
    pub provider: String,
    pub tool: String,
}

impl ToolReference {
    pub fn new(provider: impl Into<String>, tool: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            tool: tool.into(),
        }
    }

    /// Parse a reference containing exactly one `.` between two non-empty names.
    pub fn parse(raw: &str) -> Result<Self, ToolReferenceError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(ToolReferenceError::Empty);
        }

        match raw.matches('.').count() {
            0 => Err(ToolReferenceError::MissingSeparator(raw.to_string())),
            1 => {
                let (provider, tool) = raw
                    .split_once('.')
                    .ok_or_else(|| ToolReferenceError::MissingSeparator(raw.to_string()))?;
                if provider.is_empty() || tool.is_empty() {
                    return Err(ToolReferenceError::EmptyPart(raw.to_string()));
                }
                Ok(Self::new(provider, tool))
            }
            _ => Err(ToolReferenceError::TooManySeparators(raw.to_string())),
        }
    }
}

impl fmt::Display for ToolReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.provider, self.tool)
    }
}
