//! Point-to-Point Protocol in HDLC-like framing.

use crate::packet::link_type;
use crate::schema::{FieldDescriptor, FieldKind};

use super::{read_u16, Header, ProtocolId};

const HEADER_LEN: usize = 4;

/// PPP protocol field values with a built-in header.
pub mod ppp_protocol {
    pub const IPV4: u16 = 0x0021;
    pub const IPV6: u16 = 0x0057;
}

/// PPP: address, control and a 2-byte protocol field.
#[derive(Debug, Clone, Copy)]
pub struct PppHeader;

impl Header for PppHeader {
    fn name(&self) -> &'static str {
        "ppp"
    }

    fn display_name(&self) -> &'static str {
        "PPP"
    }

    fn fields(&self) -> Vec<FieldDescriptor> {
        vec![
            FieldDescriptor::new("address", FieldKind::UInt8).at(0),
            FieldDescriptor::new("control", FieldKind::UInt8).at(1),
            FieldDescriptor::new("protocol", FieldKind::UInt16).at(2),
        ]
    }

    fn link_types(&self) -> &'static [u16] {
        &[link_type::PPP]
    }

    fn header_length(&self, data: &[u8], offset: usize) -> usize {
        if data.len() >= offset + HEADER_LEN {
            HEADER_LEN
        } else {
            0
        }
    }

    fn next_header(&self, header: &[u8]) -> Option<ProtocolId> {
        match read_u16(header, 2)? {
            ppp_protocol::IPV4 => Some(ProtocolId::IPV4),
            ppp_protocol::IPV6 => Some(ProtocolId::IPV6),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ppp() {
        let mut data = vec![
            0xff, // Address: all stations
            0x03, // Control: UI
            0x00, 0x21, // Protocol: IPv4
        ];
        assert_eq!(PppHeader.header_length(&data, 0), 4);
        assert_eq!(PppHeader.next_header(&data), Some(ProtocolId::IPV4));

        data[3] = 0x57;
        assert_eq!(PppHeader.next_header(&data), Some(ProtocolId::IPV6));
        data[2] = 0xc0; // LCP
        assert_eq!(PppHeader.next_header(&data), None);
        assert_eq!(PppHeader.header_length(&data[..3], 0), 0);
    }
}
