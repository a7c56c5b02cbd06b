//! IEEE 802.1Q VLAN tag.

use crate::schema::{FieldDescriptor, FieldKind};

use super::ethernet::{by_ethertype, ethertype};
use super::{read_u16, Header, ProtocolId};

/// 802.1Q tag following an Ethernet header whose type was 0x8100.
///
/// The TPID belongs to the enclosing Ethernet header, so the tag itself is
/// the TCI plus the inner EtherType.
#[derive(Debug, Clone, Copy)]
pub struct VlanHeader;

impl Header for VlanHeader {
    fn name(&self) -> &'static str {
        "vlan"
    }

    fn display_name(&self) -> &'static str {
        "802.1Q VLAN"
    }

    fn fields(&self) -> Vec<FieldDescriptor> {
        vec![
            FieldDescriptor::new("priority", FieldKind::Bits(3)).at(0),
            FieldDescriptor::new("dei", FieldKind::Flag).at(0),
            FieldDescriptor::new("vlan_id", FieldKind::Bits(12)).at(0),
            FieldDescriptor::new("inner_ethertype", FieldKind::UInt16).at(2),
        ]
    }

    fn header_length(&self, data: &[u8], offset: usize) -> usize {
        if data.len() >= offset + 4 {
            4
        } else {
            0
        }
    }

    fn next_header(&self, header: &[u8]) -> Option<ProtocolId> {
        match read_u16(header, 2)? {
            inner if inner < ethertype::MIN_TYPE => Some(ProtocolId::LLC),
            inner => by_ethertype(inner),
        }
    }
}
