//! BSD loopback encapsulation (DLT_NULL).

use crate::packet::link_type;
use crate::schema::{FieldDescriptor, FieldKind};

use super::{Header, ProtocolId};

/// Address family values; the field is in the capturing host's byte order.
mod family {
    pub const INET: u32 = 2;
    pub const INET6_BSD: u32 = 24;
    pub const INET6_FREEBSD: u32 = 28;
    pub const INET6_DARWIN: u32 = 30;
}

#[derive(Debug, Clone, Copy)]
pub struct NullHeader;

impl Header for NullHeader {
    fn name(&self) -> &'static str {
        "null"
    }

    fn display_name(&self) -> &'static str {
        "Null/Loopback"
    }

    fn fields(&self) -> Vec<FieldDescriptor> {
        vec![FieldDescriptor::new("family", FieldKind::UInt32).at(0)]
    }

    fn link_types(&self) -> &'static [u16] {
        &[link_type::NULL]
    }

    fn header_length(&self, data: &[u8], offset: usize) -> usize {
        if data.len() >= offset + 4 {
            4
        } else {
            0
        }
    }

    fn next_header(&self, header: &[u8]) -> Option<ProtocolId> {
        let bytes: [u8; 4] = header.get(..4)?.try_into().ok()?;
        [u32::from_le_bytes(bytes), u32::from_be_bytes(bytes)]
            .into_iter()
            .find_map(|value| match value {
                family::INET => Some(ProtocolId::IPV4),
                family::INET6_BSD | family::INET6_FREEBSD | family::INET6_DARWIN => {
                    Some(ProtocolId::IPV6)
                }
                _ => None,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_family_either_byte_order() {
        assert_eq!(NullHeader.next_header(&[2, 0, 0, 0]), Some(ProtocolId::IPV4));
        assert_eq!(NullHeader.next_header(&[0, 0, 0, 2]), Some(ProtocolId::IPV4));
        assert_eq!(NullHeader.next_header(&[30, 0, 0, 0]), Some(ProtocolId::IPV6));
        assert_eq!(NullHeader.next_header(&[7, 0, 0, 0]), None);
        assert_eq!(NullHeader.next_header(&[2, 0]), None);
    }
}
