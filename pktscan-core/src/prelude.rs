//! Convenient re-exports for common usage.
//!
//! ```rust
//! use pktscan_core::prelude::*;
//!
//! let registry = Registry::new();
//! assert_eq!(registry.lookup_name("ethernet"), Some(ProtocolId::ETHERNET));
//! ```

// Protocol types
pub use crate::protocol::{
    BindingRule, Header, HeaderDescriptor, ProtocolId, Registry, ScannerFlags, Segments,
};

// Scanning
pub use crate::scan::{HeaderFlags, HeaderRecord, PacketFlags, PacketState, ScanConfig, Scanner};

// Flows
pub use crate::flow::{Direction, FlowKey, FlowTable, FlowTableConfig};

// Packets
pub use crate::packet::{PacketRef, RawPacket};

// Error types
pub use crate::error::{Error, Result};
