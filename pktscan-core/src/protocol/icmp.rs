//! ICMP.

use crate::schema::{FieldDescriptor, FieldKind};

use super::{internet_checksum, Header, ProtocolId};

const HEADER_LEN: usize = 8;

#[derive(Debug, Clone, Copy)]
pub struct IcmpHeader;

impl Header for IcmpHeader {
    fn name(&self) -> &'static str {
        "icmp"
    }

    fn display_name(&self) -> &'static str {
        "ICMP"
    }

    fn fields(&self) -> Vec<FieldDescriptor> {
        vec![
            FieldDescriptor::new("type", FieldKind::UInt8).at(0),
            FieldDescriptor::new("code", FieldKind::UInt8).at(1),
            FieldDescriptor::checksum(2),
            FieldDescriptor::new("rest_of_header", FieldKind::Fixed(4)).at(4),
        ]
    }

    fn header_length(&self, data: &[u8], offset: usize) -> usize {
        if offset < data.len() {
            HEADER_LEN
        } else {
            0
        }
    }

    fn next_header(&self, _header: &[u8]) -> Option<ProtocolId> {
        Some(ProtocolId::PAYLOAD)
    }

    /// Covers the whole message, header and data.
    fn checksum(&self, header: &[u8], payload: &[u8]) -> Option<bool> {
        if header.len() < HEADER_LEN {
            return None;
        }
        Some(internet_checksum(&[header, payload]) == 0)
    }
}
