//! Tool domain module
//!
//! Describes the callable operations that provider processes expose and the
//! pure logic around them.
//!
//! ```text
//! ┌────────────────┐   ┌────────────────┐   ┌────────────────┐
//! │ ToolDescriptor │──▶│ ToolReference  │──▶│ ToolPayload    │
//! │ (catalog)      │   │ provider.tool  │   │ (raw result)   │
//! └────────────────┘   └────────────────┘   └───────┬────────┘
//!                                                   │ shape_tool_result()
//!                                                   ▼
//!                                             transcript text
//! ```
//!
//! # Key Types
//!
//! - [`ToolDescriptor`]: name, description and [`InputShape`] reported by `tools/list`
//! - [`ProviderTool`]: a descriptor tagged with its owning provider
//! - [`ToolReference`]: parsed `provider.tool` reference proposed by the oracle
//! - [`ToolPayload`]: unwrapped `tools/call` result

pub mod entities;
pub mod reference;
pub mod shaping;

pub use entities::{FieldShape, InputShape, ProviderTool, ToolDescriptor};
pub use reference::{ToolReference, ToolReferenceError};
pub use shaping::{ToolPayload, generic_dump, shape_tool_result};
