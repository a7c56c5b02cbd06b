//! IPv4.

use etherparse::Ipv4HeaderSlice;

use crate::flow::FlowKeyBuilder;
use crate::packet::link_type;
use crate::scan::HeaderFlags;
use crate::schema::{FieldDescriptor, FieldKind};

use super::{internet_checksum, read_u16, Header, ProtocolId, SubHeader};

/// IP protocol numbers with a built-in header.
pub mod ip_protocol {
    pub const IPV6_HOP_BY_HOP: u8 = 0;
    pub const ICMP: u8 = 1;
    pub const IPIP: u8 = 4;
    pub const TCP: u8 = 6;
    pub const UDP: u8 = 17;
    pub const IPV6: u8 = 41;
    pub const IPV6_ROUTING: u8 = 43;
    pub const IPV6_FRAGMENT: u8 = 44;
    pub const ESP: u8 = 50;
    pub const AUTH: u8 = 51;
    pub const IPV6_NO_NEXT: u8 = 59;
    pub const IPV6_DEST_OPTS: u8 = 60;
    pub const SCTP: u8 = 132;
    pub const IPV6_MOBILITY: u8 = 135;
}

const MIN_HEADER_LEN: usize = 20;
const MORE_FRAGMENTS: u16 = 0x2000;
const FRAGMENT_OFFSET_MASK: u16 = 0x1fff;

/// Next protocol for an IP protocol number, shared by IPv4 and IPv6.
pub fn by_ip_protocol(value: u8) -> Option<ProtocolId> {
    match value {
        ip_protocol::ICMP => Some(ProtocolId::ICMP),
        ip_protocol::IPIP => Some(ProtocolId::IPV4),
        ip_protocol::TCP => Some(ProtocolId::TCP),
        ip_protocol::UDP => Some(ProtocolId::UDP),
        ip_protocol::IPV6 => Some(ProtocolId::IPV6),
        ip_protocol::SCTP => Some(ProtocolId::SCTP),
        _ => None,
    }
}

/// IPv4, measured from IHL and total length rather than parsed in full so
/// that headers cut short by the capture are still recorded.
#[derive(Debug, Clone, Copy)]
pub struct Ipv4Header;

impl Ipv4Header {
    /// IHL in bytes, if the first byte describes a plausible IPv4 header.
    fn ihl(data: &[u8], offset: usize) -> Option<usize> {
        let first = *data.get(offset)?;
        let ihl = (first & 0x0f) as usize * 4;
        (first >> 4 == 4 && ihl >= MIN_HEADER_LEN).then_some(ihl)
    }

    fn total_len(data: &[u8], offset: usize) -> Option<usize> {
        read_u16(data, offset + 2).map(usize::from)
    }

    fn fragment_field(header: &[u8]) -> u16 {
        read_u16(header, 6).unwrap_or(0)
    }
}

impl Header for Ipv4Header {
    fn name(&self) -> &'static str {
        "ipv4"
    }

    fn display_name(&self) -> &'static str {
        "IPv4"
    }

    fn fields(&self) -> Vec<FieldDescriptor> {
        vec![
            FieldDescriptor::new("version", FieldKind::Bits(4)).at(0),
            FieldDescriptor::new("ihl", FieldKind::Bits(4)).at(0),
            FieldDescriptor::new("tos", FieldKind::UInt8).at(1),
            FieldDescriptor::new("total_length", FieldKind::UInt16).at(2),
            FieldDescriptor::new("identification", FieldKind::UInt16).at(4),
            FieldDescriptor::new("flags", FieldKind::Bits(3)).at(6),
            FieldDescriptor::new("fragment_offset", FieldKind::Bits(13)).at(6),
            FieldDescriptor::new("ttl", FieldKind::UInt8).at(8),
            FieldDescriptor::new("protocol", FieldKind::UInt8).at(9),
            FieldDescriptor::checksum(10),
            FieldDescriptor::ipv4("src_ip", 12),
            FieldDescriptor::ipv4("dst_ip", 16),
            FieldDescriptor::new("options", FieldKind::Bytes)
                .at(20)
                .optional(),
        ]
    }

    fn sub_headers(&self) -> Vec<SubHeader> {
        vec![
            SubHeader::new(0, "eol", "End of Option List"),
            SubHeader::new(1, "nop", "No Operation"),
            SubHeader::new(7, "rr", "Record Route").with_fields(vec![
                FieldDescriptor::new("pointer", FieldKind::UInt8).at(2),
                FieldDescriptor::new("route", FieldKind::Bytes).at(3),
            ]),
            SubHeader::new(68, "timestamp", "Timestamp"),
            SubHeader::new(131, "lsrr", "Loose Source Route"),
            SubHeader::new(137, "ssrr", "Strict Source Route"),
            SubHeader::new(148, "router_alert", "Router Alert"),
        ]
    }

    fn link_types(&self) -> &'static [u16] {
        &[link_type::IPV4]
    }

    fn header_length(&self, data: &[u8], offset: usize) -> usize {
        Self::ihl(data, offset).unwrap_or(0)
    }

    fn payload_length(&self, data: &[u8], offset: usize) -> usize {
        match (Self::ihl(data, offset), Self::total_len(data, offset)) {
            (Some(ihl), Some(total)) => total.saturating_sub(ihl),
            _ => 0,
        }
    }

    /// Link-layer padding after the datagram.
    fn postfix_length(&self, data: &[u8], offset: usize) -> usize {
        match Self::total_len(data, offset) {
            Some(total) if total >= MIN_HEADER_LEN => data.len().saturating_sub(offset + total),
            _ => 0,
        }
    }

    fn next_header(&self, header: &[u8]) -> Option<ProtocolId> {
        if Self::fragment_field(header) & FRAGMENT_OFFSET_MASK != 0 {
            return Some(ProtocolId::PAYLOAD);
        }
        by_ip_protocol(*header.get(9)?)
    }

    fn record_flags(&self, header: &[u8]) -> HeaderFlags {
        let field = Self::fragment_field(header);
        if field & (MORE_FRAGMENTS | FRAGMENT_OFFSET_MASK) != 0 {
            HeaderFlags::FRAGMENTED
        } else {
            HeaderFlags::empty()
        }
    }

    fn checksum(&self, header: &[u8], _payload: &[u8]) -> Option<bool> {
        if header.len() < MIN_HEADER_LEN {
            return None;
        }
        Some(internet_checksum(&[header]) == 0)
    }

    fn flow_key(&self, header: &[u8], key: &mut FlowKeyBuilder<'_>) {
        if let Ok(ip) = Ipv4HeaderSlice::from_slice(header) {
            let protocol = u32::from(ip.protocol().0);
            key.replace_lower()
                .pair(u32::from_be_bytes(ip.source()), u32::from_be_bytes(ip.destination()))
                .pair(protocol, protocol);
        }
    }
}
