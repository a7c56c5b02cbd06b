//! IPv6 with its extension header chain.

use etherparse::Ipv6HeaderSlice;

use crate::flow::{fold, FlowKeyBuilder};
use crate::packet::link_type;
use crate::scan::HeaderFlags;
use crate::schema::{FieldDescriptor, FieldKind};

use super::ipv4::{by_ip_protocol, ip_protocol};
use super::{read_u16, Header, ProtocolId, SubHeader};

const HEADER_LEN: usize = 40;

/// Extension headers that are walked and folded into the IPv6 record.
fn is_extension(next: u8) -> bool {
    matches!(
        next,
        ip_protocol::IPV6_HOP_BY_HOP
            | ip_protocol::IPV6_ROUTING
            | ip_protocol::IPV6_FRAGMENT
            | ip_protocol::AUTH
            | ip_protocol::IPV6_DEST_OPTS
            | ip_protocol::IPV6_MOBILITY
    )
}

/// Fixed header plus the extension headers that follow it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Chain {
    /// Fixed header and every captured extension header
    length: usize,
    /// Protocol after the last walked extension
    next: u8,
    fragmented: bool,
    /// A fragment header with a non-zero offset was seen
    later_fragment: bool,
    /// An extension header ran past the captured bytes
    cut_short: bool,
}

/// IPv6. Extension headers are part of the record, so the next record is the
/// upper-layer protocol.
#[derive(Debug, Clone, Copy)]
pub struct Ipv6Header;

impl Ipv6Header {
    fn parse(data: &[u8], offset: usize) -> Option<Ipv6HeaderSlice<'_>> {
        Ipv6HeaderSlice::from_slice(data.get(offset..)?).ok()
    }

    fn walk(data: &[u8], offset: usize) -> Option<Chain> {
        let ip = Self::parse(data, offset)?;
        let mut chain = Chain {
            length: HEADER_LEN,
            next: ip.next_header().0,
            fragmented: false,
            later_fragment: false,
            cut_short: false,
        };

        while is_extension(chain.next) {
            let at = offset + chain.length;
            if chain.next == ip_protocol::IPV6_FRAGMENT {
                chain.fragmented = true;
            }
            let (Some(&next), Some(&len)) = (data.get(at), data.get(at + 1)) else {
                chain.cut_short = true;
                break;
            };
            let ext_len = if chain.next == ip_protocol::AUTH {
                (len as usize + 2) * 4
            } else {
                (len as usize + 1) * 8
            };
            if data.len() < at + ext_len {
                chain.cut_short = true;
                break;
            }
            if chain.next == ip_protocol::IPV6_FRAGMENT {
                let field = read_u16(data, at + 2).unwrap_or(0);
                chain.later_fragment |= field >> 3 != 0;
            }
            chain.length += ext_len;
            chain.next = next;
        }
        Some(chain)
    }
}

impl Header for Ipv6Header {
    fn name(&self) -> &'static str {
        "ipv6"
    }

    fn display_name(&self) -> &'static str {
        "IPv6"
    }

    fn fields(&self) -> Vec<FieldDescriptor> {
        vec![
            FieldDescriptor::new("version", FieldKind::Bits(4)).at(0),
            FieldDescriptor::new("traffic_class", FieldKind::UInt8).at(0),
            FieldDescriptor::new("flow_label", FieldKind::Bits(20)).at(1),
            FieldDescriptor::new("payload_length", FieldKind::UInt16).at(4),
            FieldDescriptor::new("next_header", FieldKind::UInt8).at(6),
            FieldDescriptor::new("hop_limit", FieldKind::UInt8).at(7),
            FieldDescriptor::ipv6("src_ip", 8),
            FieldDescriptor::ipv6("dst_ip", 24),
            FieldDescriptor::new("extensions", FieldKind::Bytes)
                .at(HEADER_LEN)
                .optional(),
        ]
    }

    fn sub_headers(&self) -> Vec<SubHeader> {
        vec![
            SubHeader::new(0, "hop_by_hop", "Hop-by-Hop Options"),
            SubHeader::new(43, "routing", "Routing Header"),
            SubHeader::new(44, "fragment", "Fragment Header").with_fields(vec![
                FieldDescriptor::new("fragment_offset", FieldKind::Bits(13)).at(2),
                FieldDescriptor::new("more_fragments", FieldKind::Flag).at(3),
                FieldDescriptor::new("identification", FieldKind::UInt32).at(4),
            ]),
            SubHeader::new(51, "auth", "Authentication Header"),
            SubHeader::new(60, "destination", "Destination Options"),
            SubHeader::new(135, "mobility", "Mobility Header"),
        ]
    }

    fn link_types(&self) -> &'static [u16] {
        &[link_type::IPV6]
    }

    fn header_length(&self, data: &[u8], offset: usize) -> usize {
        Self::walk(data, offset).map_or(0, |chain| chain.length)
    }

    /// The payload length field counts extension headers too.
    fn payload_length(&self, data: &[u8], offset: usize) -> usize {
        match (Self::parse(data, offset), Self::walk(data, offset)) {
            (Some(ip), Some(chain)) => {
                (ip.payload_length() as usize).saturating_sub(chain.length - HEADER_LEN)
            }
            _ => 0,
        }
    }

    fn postfix_length(&self, data: &[u8], offset: usize) -> usize {
        match Self::parse(data, offset) {
            Some(ip) if ip.payload_length() > 0 => {
                data.len()
                    .saturating_sub(offset + HEADER_LEN + ip.payload_length() as usize)
            }
            _ => 0,
        }
    }

    fn next_header(&self, header: &[u8]) -> Option<ProtocolId> {
        let chain = Self::walk(header, 0)?;
        if chain.cut_short || chain.later_fragment {
            return Some(ProtocolId::PAYLOAD);
        }
        by_ip_protocol(chain.next)
    }

    fn record_flags(&self, header: &[u8]) -> HeaderFlags {
        match Self::walk(header, 0) {
            Some(chain) if chain.fragmented => HeaderFlags::FRAGMENTED,
            _ => HeaderFlags::empty(),
        }
    }

    fn flow_key(&self, header: &[u8], key: &mut FlowKeyBuilder<'_>) {
        let ip = Ipv6HeaderSlice::from_slice(header);
        if let (Ok(ip), Some(chain)) = (ip, Self::walk(header, 0)) {
            let next = u32::from(chain.next);
            key.replace_lower()
                .pair(fold(&ip.source()), fold(&ip.destination()))
                .pair(next, next);
        }
    }
}
