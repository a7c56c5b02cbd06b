//! Protocol registry, header plug-ins and binding rules.
//!
//! This module provides:
//! - [`Header`] trait for describing a protocol header to the scanner
//! - [`Registry`] assigning [`ProtocolId`]s and holding per-protocol scanners
//! - [`BindingRule`] for "protocol S sits in the payload of protocol T"
//! - Built-in headers for common link, network and transport protocols
//!
//! ## Built-in Protocols
//!
//! | Layer | Protocols |
//! |-------|-----------|
//! | Link | Ethernet, VLAN (802.1Q/802.1ad), LLC/SNAP, PPP, Linux SLL, BSD loopback |
//! | Network | IPv4, IPv6 (with extension headers), ARP, ICMP |
//! | Transport | TCP, UDP, SCTP |
//! | Tunnel | L2TPv2 (UDP port 1701) |
//! | Application | HTTP/1.x (port 80/8080 or request/response sniffing) |
//!
//! ## Example
//!
//! ```rust
//! use pktscan_core::protocol::{Header, ProtocolId, Registry};
//!
//! struct Trailer;
//!
//! impl Header for Trailer {
//!     fn name(&self) -> &'static str {
//!         "trailer"
//!     }
//!
//!     fn header_length(&self, _data: &[u8], _offset: usize) -> usize {
//!         4
//!     }
//! }
//!
//! let registry = Registry::new();
//! let id = registry.register(Trailer).unwrap();
//! assert!(!id.is_core());
//! assert_eq!(registry.register(Trailer).unwrap(), id);
//! assert_eq!(registry.lookup_name("tcp"), Some(ProtocolId::TCP));
//! ```

mod binding;
mod header;
mod id;
mod registry;

// Built-in headers
mod arp;
mod ethernet;
mod http;
mod icmp;
mod ipv4;
mod ipv6;
mod l2tp;
mod llc;
mod null;
mod payload;
mod ppp;
mod sctp;
mod sll;
mod snap;
mod tcp;
mod udp;
mod vlan;

// Test utilities (only compiled for tests)
#[cfg(test)]
pub mod test_utils;

pub use binding::{port_rule, BindPredicate, BindView, BindingRule};
pub use header::{Header, HeaderDescriptor, Segments, SubHeader};
pub use id::{ProtocolId, ProtocolSet, CORE_COUNT, MAX_ID_COUNT};
pub use registry::{
    HeaderScanner, Registry, RegistryEdit, RegistryTable, ScannerFlags, MAX_LINK_TYPES,
};

pub use arp::ArpHeader;
pub use ethernet::{by_ethertype, ethertype, EthernetHeader};
pub use http::{HttpHeader, HTTP_PORTS};
pub use icmp::IcmpHeader;
pub use ipv4::{by_ip_protocol, ip_protocol, Ipv4Header};
pub use ipv6::Ipv6Header;
pub use l2tp::{L2tpHeader, L2TP_PORTS};
pub use llc::LlcHeader;
pub use null::NullHeader;
pub use payload::PayloadHeader;
pub use ppp::{ppp_protocol, PppHeader};
pub use sctp::SctpHeader;
pub use sll::SllHeader;
pub use snap::SnapHeader;
pub use tcp::TcpHeader;
pub use udp::UdpHeader;
pub use vlan::VlanHeader;

/// Big-endian u16 at `at`, if captured.
pub(crate) fn read_u16(data: &[u8], at: usize) -> Option<u16> {
    let bytes = data.get(at..at.checked_add(2)?)?;
    Some(u16::from_be_bytes([bytes[0], bytes[1]]))
}

/// Big-endian u32 at `at`, if captured.
pub(crate) fn read_u32(data: &[u8], at: usize) -> Option<u32> {
    let bytes = data.get(at..at.checked_add(4)?)?;
    Some(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

/// RFC 1071 Internet checksum over `parts` taken as one byte stream.
///
/// Computing it over data that already holds a correct checksum gives 0.
pub fn internet_checksum(parts: &[&[u8]]) -> u16 {
    let mut sum: u32 = 0;
    let mut pending: Option<u8> = None;

    for byte in parts.iter().flat_map(|part| part.iter().copied()) {
        match pending.take() {
            Some(high) => sum += u32::from(u16::from_be_bytes([high, byte])),
            None => pending = Some(byte),
        }
        // Fold early so the sum cannot overflow on long inputs
        if sum > 0xffff {
            sum = (sum & 0xffff) + (sum >> 16);
        }
    }
    if let Some(high) = pending {
        sum += u32::from(high) << 8;
    }
    while sum > 0xffff {
        sum = (sum & 0xffff) + (sum >> 16);
    }
    !(sum as u16)
}
