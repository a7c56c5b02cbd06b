//! pktscan - protocol dissection engine.
//!
//! Scans captured packets into ordered header chains using a registry of
//! protocol headers and binding rules, and groups them into flows.
//!
//! This crate re-exports [`pktscan_core`]; see its documentation for the
//! module layout.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use pktscan::prelude::*;
//!
//! let registry = Arc::new(Registry::new());
//! let mut scanner = Scanner::new(Arc::clone(&registry));
//!
//! let frame = [0u8; 14];
//! let state = scanner.scan(&PacketRef::ethernet(1, &frame));
//! assert_eq!(state.header(0).map(|r| r.id), Some(ProtocolId::ETHERNET));
//! ```

pub use pktscan_core::*;

/// Convenient re-exports for common usage.
pub mod prelude {
    pub use pktscan_core::prelude::*;
}
