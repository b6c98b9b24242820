//! Line-delimited JSON-RPC 2.0 over child-process stdio.
//!
//! - [`codec`]: newline framing ([`JsonLineCodec`])
//! - [`protocol`]: request envelope, response and notification classification
//! - [`correlator`]: per-provider actor matching responses to pending requests

pub mod codec;
pub mod correlator;
pub mod error;
pub mod protocol;

pub use codec::{Frame, JsonLineCodec};
pub use correlator::{Correlator, Notification};
pub use error::{RpcError, TransportDecodeError};
