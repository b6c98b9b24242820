//! Provider domain module
//!
//! A provider is an independently running process that exposes a catalog of
//! tools over line-delimited JSON-RPC on its standard input/output.
//!
//! # Lifecycle
//!
//! ```text
//! unstarted ──start()──▶ Starting ──initialize + tools/list──▶ Ready
//!                           │                                   │
//!                           └──handshake failure──▶ (removed)   ├──stop()──▶ Stopped
//!                                                               └──exit────▶ Stopped
//! ```
//!
//! `Stopped` is terminal: the supervisor removes the entry and a later
//! `start()` creates a fresh provider.

pub mod entities;

pub use entities::{ProviderSpec, ProviderState, ProviderStatus};
