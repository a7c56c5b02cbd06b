//! UDP.

use etherparse::UdpHeaderSlice;

use crate::flow::FlowKeyBuilder;
use crate::schema::{FieldDescriptor, FieldKind};

use super::{read_u16, Header, ScannerFlags};

const HEADER_LEN: usize = 8;

/// UDP. Like TCP, the payload protocol is found through bindings.
#[derive(Debug, Clone, Copy)]
pub struct UdpHeader;

impl Header for UdpHeader {
    fn name(&self) -> &'static str {
        "udp"
    }

    fn display_name(&self) -> &'static str {
        "UDP"
    }

    fn fields(&self) -> Vec<FieldDescriptor> {
        vec![
            FieldDescriptor::src_port(0),
            FieldDescriptor::dst_port(2),
            FieldDescriptor::new("length", FieldKind::UInt16).at(4),
            FieldDescriptor::checksum(6),
        ]
    }

    fn scanner_flags(&self) -> ScannerFlags {
        ScannerFlags::HEURISTIC_BINDING
    }

    fn header_length(&self, data: &[u8], offset: usize) -> usize {
        if offset < data.len() {
            HEADER_LEN
        } else {
            0
        }
    }

    fn payload_length(&self, data: &[u8], offset: usize) -> usize {
        read_u16(data, offset + 4)
            .map(|len| (len as usize).saturating_sub(HEADER_LEN))
            .unwrap_or(0)
    }

    fn flow_key(&self, header: &[u8], key: &mut FlowKeyBuilder<'_>) {
        if let Ok(udp) = UdpHeaderSlice::from_slice(header) {
            key.pair(
                u32::from(udp.source_port()),
                u32::from(udp.destination_port()),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::{Direction, FlowKey};
    use crate::protocol::ProtocolId;

    const HEADER: [u8; 8] = [
        0x30, 0x39, // Src port: 12345
        0x00, 0x35, // Dst port: 53
        0x00, 0x0c, // Length: 12
        0x00, 0x00, // Checksum
    ];

    #[test]
    fn test_lengths() {
        let mut data = HEADER.to_vec();
        data.extend_from_slice(&[0xaa; 4]);
        assert_eq!(UdpHeader.header_length(&data, 0), 8);
        assert_eq!(UdpHeader.payload_length(&data, 0), 4);
        assert_eq!(UdpHeader.header_length(&data, 12), 0);
    }

    #[test]
    fn test_length_below_header() {
        let mut data = HEADER;
        data[5] = 0x04;
        assert_eq!(UdpHeader.payload_length(&data, 0), 0);
    }

    #[test]
    fn test_flow_key_direction() {
        let mut reply = HEADER;
        reply[0..2].copy_from_slice(&53u16.to_be_bytes());
        reply[2..4].copy_from_slice(&12345u16.to_be_bytes());

        let mut a = FlowKey::new();
        UdpHeader.flow_key(&HEADER, &mut a.builder(ProtocolId::UDP));
        let mut b = FlowKey::new();
        UdpHeader.flow_key(&reply, &mut b.builder(ProtocolId::UDP));

        assert_eq!(a.matches(&a), Direction::Forward);
        assert_eq!(b.matches(&a), Direction::Reverse);
    }
}
