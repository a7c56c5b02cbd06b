//! ARP.

use crate::flow::FlowKeyBuilder;
use crate::schema::{FieldDescriptor, FieldKind};

use super::{read_u32, Header, ProtocolId};

const FIXED_LEN: usize = 8;

#[derive(Debug, Clone, Copy)]
pub struct ArpHeader;

impl Header for ArpHeader {
    fn name(&self) -> &'static str {
        "arp"
    }

    fn display_name(&self) -> &'static str {
        "ARP"
    }

    fn fields(&self) -> Vec<FieldDescriptor> {
        vec![
            FieldDescriptor::new("hardware_type", FieldKind::UInt16).at(0),
            FieldDescriptor::new("protocol_type", FieldKind::UInt16).at(2),
            FieldDescriptor::new("hardware_size", FieldKind::UInt8).at(4),
            FieldDescriptor::new("protocol_size", FieldKind::UInt8).at(5),
            FieldDescriptor::new("operation", FieldKind::UInt16).at(6),
            FieldDescriptor::new("sender_hw_addr", FieldKind::Bytes),
            FieldDescriptor::new("sender_proto_addr", FieldKind::Bytes),
            FieldDescriptor::new("target_hw_addr", FieldKind::Bytes),
            FieldDescriptor::new("target_proto_addr", FieldKind::Bytes),
        ]
    }

    fn header_length(&self, data: &[u8], offset: usize) -> usize {
        match (data.get(offset + 4), data.get(offset + 5)) {
            (Some(&hlen), Some(&plen)) if data.len() >= offset + FIXED_LEN => {
                FIXED_LEN + 2 * (hlen as usize + plen as usize)
            }
            _ => 0,
        }
    }

    fn next_header(&self, _header: &[u8]) -> Option<ProtocolId> {
        Some(ProtocolId::PAYLOAD)
    }

    /// IPv4-over-Ethernet requests and replies group by the two protocol
    /// addresses.
    fn flow_key(&self, header: &[u8], key: &mut FlowKeyBuilder<'_>) {
        if header.get(4) != Some(&6) || header.get(5) != Some(&4) {
            return;
        }
        if let (Some(sender), Some(target)) = (read_u32(header, 14), read_u32(header, 24)) {
            key.replace_lower().pair(sender, target);
        }
    }
}
