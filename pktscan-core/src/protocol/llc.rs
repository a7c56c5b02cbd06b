//! IEEE 802.2 Logical Link Control.

use crate::schema::{FieldDescriptor, FieldKind};

use super::{Header, ProtocolId};

/// SAP value announcing a SNAP header.
pub const SAP_SNAP: u8 = 0xaa;

/// 802.2 LLC, carried by 802.3 length-framed Ethernet.
///
/// Unnumbered frames have a 1-byte control field; information and
/// supervisory frames use 2 bytes.
#[derive(Debug, Clone, Copy)]
pub struct LlcHeader;

impl Header for LlcHeader {
    fn name(&self) -> &'static str {
        "llc"
    }

    fn display_name(&self) -> &'static str {
        "IEEE 802.2 LLC"
    }

    fn fields(&self) -> Vec<FieldDescriptor> {
        vec![
            FieldDescriptor::new("dsap", FieldKind::UInt8).at(0),
            FieldDescriptor::new("ssap", FieldKind::UInt8).at(1),
            FieldDescriptor::new("control", FieldKind::Bytes).at(2),
        ]
    }

    fn header_length(&self, data: &[u8], offset: usize) -> usize {
        match data.get(offset + 2) {
            Some(control) if control & 0x03 == 0x03 => 3,
            Some(_) => 4,
            None => 0,
        }
    }

    fn next_header(&self, header: &[u8]) -> Option<ProtocolId> {
        (header.first() == Some(&SAP_SNAP)).then_some(ProtocolId::SNAP)
    }
}
