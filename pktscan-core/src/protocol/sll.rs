//! Linux "cooked" capture header (SLL).

use crate::packet::link_type;
use crate::schema::{FieldDescriptor, FieldKind};

use super::ethernet::by_ethertype;
use super::{read_u16, Header, ProtocolId};

const HEADER_LEN: usize = 16;

#[derive(Debug, Clone, Copy)]
pub struct SllHeader;

impl Header for SllHeader {
    fn name(&self) -> &'static str {
        "sll"
    }

    fn display_name(&self) -> &'static str {
        "Linux cooked capture"
    }

    fn fields(&self) -> Vec<FieldDescriptor> {
        vec![
            FieldDescriptor::new("packet_type", FieldKind::UInt16).at(0),
            FieldDescriptor::new("arphrd_type", FieldKind::UInt16).at(2),
            FieldDescriptor::new("addr_len", FieldKind::UInt16).at(4),
            FieldDescriptor::new("addr", FieldKind::Fixed(8)).at(6),
            FieldDescriptor::new("protocol", FieldKind::UInt16).at(14),
        ]
    }

    fn link_types(&self) -> &'static [u16] {
        &[link_type::LINUX_SLL]
    }

    fn header_length(&self, data: &[u8], offset: usize) -> usize {
        if data.len() >= offset + HEADER_LEN {
            HEADER_LEN
        } else {
            0
        }
    }

    fn next_header(&self, header: &[u8]) -> Option<ProtocolId> {
        read_u16(header, 14).and_then(by_ethertype)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sll() {
        let mut data = vec![
            0x00, 0x00, // Packet type: to us
            0x00, 0x01, // ARPHRD_ETHER
            0x00, 0x06, // Address length
            0x00, 0x11, 0x22, 0x33, 0x44, 0x55, 0x00, 0x00, // Address
            0x86, 0xdd, // Protocol: IPv6
        ];
        assert_eq!(SllHeader.header_length(&data, 0), 16);
        assert_eq!(SllHeader.next_header(&data), Some(ProtocolId::IPV6));

        data.truncate(10);
        assert_eq!(SllHeader.header_length(&data, 0), 0);
    }
}
