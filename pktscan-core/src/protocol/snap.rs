//! IEEE 802 SNAP extension of LLC.

use crate::flow::FlowKeyBuilder;
use crate::schema::{FieldDescriptor, FieldKind};

use super::ethernet::by_ethertype;
use super::{read_u16, Header, ProtocolId};

const HEADER_LEN: usize = 5;

/// OUIs whose protocol id is an EtherType.
const ETHERTYPE_OUIS: [[u8; 3]; 2] = [[0x00, 0x00, 0x00], [0x00, 0x00, 0xf8]];

#[derive(Debug, Clone, Copy)]
pub struct SnapHeader;

impl Header for SnapHeader {
    fn name(&self) -> &'static str {
        "snap"
    }

    fn display_name(&self) -> &'static str {
        "IEEE 802 SNAP"
    }

    fn fields(&self) -> Vec<FieldDescriptor> {
        vec![
            FieldDescriptor::new("oui", FieldKind::Fixed(3)).at(0),
            FieldDescriptor::new("pid", FieldKind::UInt16).at(3),
        ]
    }

    fn header_length(&self, data: &[u8], offset: usize) -> usize {
        if data.len() >= offset + HEADER_LEN {
            HEADER_LEN
        } else {
            0
        }
    }

    fn next_header(&self, header: &[u8]) -> Option<ProtocolId> {
        let oui = header.get(..3)?;
        if !ETHERTYPE_OUIS.iter().any(|known| known == oui) {
            return None;
        }
        read_u16(header, 3).and_then(by_ethertype)
    }

    /// The protocol id stands in for the protocol pair until a network
    /// header replaces it.
    fn flow_key(&self, header: &[u8], key: &mut FlowKeyBuilder<'_>) {
        if let Some(pid) = read_u16(header, 3) {
            key.pair(u32::from(pid), u32::from(pid));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::FlowKey;

    #[test]
    fn test_encapsulated_ethertype() {
        let data = [
            0x00, 0x00, 0x00, // OUI: encapsulated Ethernet
            0x08, 0x00, // PID: IPv4
        ];
        assert_eq!(SnapHeader.header_length(&data, 0), 5);
        assert_eq!(SnapHeader.next_header(&data), Some(ProtocolId::IPV4));

        let mut key = FlowKey::new();
        SnapHeader.flow_key(&data, &mut key.builder(ProtocolId::SNAP));
        assert_eq!(key.pairs()[0].forward, 0x0800);
        assert!(key.is_reversible());
    }

    #[test]
    fn test_vendor_oui() {
        let data = [
            0x00, 0x00, 0x0c, // OUI: Cisco
            0x20, 0x00, // PID: CDP
        ];
        assert_eq!(SnapHeader.next_header(&data), None);
        assert_eq!(SnapHeader.header_length(&data[..4], 0), 0);
    }
}
