//! # pktscan-core
//!
//! Protocol dissection engine: turns a captured byte buffer into an ordered
//! chain of header records and a direction-aware flow key.
//!
//! ## Features
//!
//! - **Protocol Registry**: dense [`ProtocolId`]s, header descriptors and
//!   link-type dispatch, updated copy-on-write so scans never block
//! - **Header Scanning**: prefix/header/gap/payload/postfix segmentation
//!   with per-segment truncation flags and a hard header limit
//! - **Binding Rules**: ordered, dependency-aware rules deciding which
//!   protocol sits in a payload, plus heuristic fallbacks
//! - **Flow Classification**: symmetric flow keys and a bounded flow table
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use pktscan_core::prelude::*;
//!
//! let registry = Arc::new(Registry::new());
//! let mut scanner = Scanner::new(Arc::clone(&registry));
//! let mut flows = FlowTable::default();
//!
//! # let frame: Vec<u8> = vec![0; 60];
//! let packet = PacketRef::ethernet(1, &frame);
//! let state = scanner.scan(&packet);
//! for record in &state {
//!     let name = registry.lookup(record.id).map(|d| d.name).unwrap_or("?");
//!     println!("{name} at {} (+{})", record.offset, record.length);
//! }
//! flows.add(scanner.table(), &packet, &state).unwrap();
//! scanner.recycle(state);
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +---------------------------------------------------------------------+
//! |                          pktscan-core                               |
//! +---------------------------------------------------------------------+
//! |  protocol/   - ProtocolId, Header trait, Registry, BindingRule,     |
//! |                built-in headers (Ethernet ... HTTP)                  |
//! |  scan/       - Scanner, scan loop, PacketState, HeaderRecord        |
//! |  flow/       - FlowKey, FlowTable                                   |
//! |  schema/     - FieldDescriptor, FieldKind                           |
//! |  packet      - PacketRef, RawPacket, link types                     |
//! |  error       - Error types                                          |
//! +---------------------------------------------------------------------+
//! ```
//!
//! ## Built-in Protocols
//!
//! | Layer | Protocols |
//! |-------|-----------|
//! | Link | Ethernet, VLAN (802.1Q), LLC/SNAP, PPP, Linux SLL, BSD loopback |
//! | Network | IPv4, IPv6, ARP, ICMP |
//! | Transport | TCP, UDP, SCTP |
//! | Tunnel | L2TPv2 |
//! | Application | HTTP/1.x |

pub mod error;
pub mod flow;
pub mod packet;
pub mod prelude;
pub mod protocol;
pub mod scan;
pub mod schema;

// Re-export commonly used types at crate root for convenience
pub use error::{Capacity, Error, Result};
pub use flow::{
    compute_flow_key, Direction, Flow, FlowKey, FlowKeyBuilder, FlowPair, FlowTable,
    FlowTableConfig, FlowTableStats,
};
pub use packet::{link_type, PacketRef, RawPacket};
pub use protocol::{
    BindView, BindingRule, Header, HeaderDescriptor, HeaderScanner, ProtocolId, ProtocolSet,
    Registry, RegistryEdit, RegistryTable, ScannerFlags, Segments, SubHeader,
};
pub use scan::{
    HeaderFlags, HeaderRecord, PacketFlags, PacketState, ScanConfig, Scanner, MAX_HEADERS,
};
pub use schema::{FieldDescriptor, FieldKind};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
