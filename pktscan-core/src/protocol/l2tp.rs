//! Layer 2 Tunneling Protocol, version 2.

use crate::schema::{FieldDescriptor, FieldKind};

use super::{port_rule, read_u16, BindingRule, Header, ProtocolId};

/// Registered UDP port for L2TP.
pub const L2TP_PORTS: &[u16] = &[1701];

const FLAG_TYPE: u8 = 0x80;
const FLAG_LENGTH: u8 = 0x40;
const FLAG_SEQUENCE: u8 = 0x08;
const FLAG_OFFSET: u8 = 0x02;

/// Flags, tunnel id and session id.
const BASE_LEN: usize = 6;

/// L2TPv2 over UDP. Data messages carry PPP; control messages end the chain.
#[derive(Debug, Clone, Copy)]
pub struct L2tpHeader;

impl Header for L2tpHeader {
    fn name(&self) -> &'static str {
        "l2tp"
    }

    fn display_name(&self) -> &'static str {
        "L2TP"
    }

    fn fields(&self) -> Vec<FieldDescriptor> {
        vec![
            FieldDescriptor::new("type", FieldKind::Flag).at(0),
            FieldDescriptor::new("length_present", FieldKind::Flag).at(0),
            FieldDescriptor::new("sequence_present", FieldKind::Flag).at(0),
            FieldDescriptor::new("offset_present", FieldKind::Flag).at(0),
            FieldDescriptor::new("priority", FieldKind::Flag).at(0),
            FieldDescriptor::new("version", FieldKind::Bits(4)).at(1),
            FieldDescriptor::new("length", FieldKind::UInt16).optional(),
            FieldDescriptor::new("tunnel_id", FieldKind::UInt16),
            FieldDescriptor::new("session_id", FieldKind::UInt16),
            FieldDescriptor::new("ns", FieldKind::UInt16).optional(),
            FieldDescriptor::new("nr", FieldKind::UInt16).optional(),
            FieldDescriptor::new("offset_size", FieldKind::UInt16).optional(),
        ]
    }

    fn header_length(&self, data: &[u8], offset: usize) -> usize {
        let Some(&flags) = data.get(offset) else {
            return 0;
        };
        let mut len = BASE_LEN;
        if flags & FLAG_LENGTH != 0 {
            len += 2;
        }
        if flags & FLAG_SEQUENCE != 0 {
            len += 4;
        }
        if flags & FLAG_OFFSET != 0 {
            // Offset size field, then that many bytes of padding
            let pad = read_u16(data, offset + len).map_or(0, usize::from);
            len += 2 + pad;
        }
        len
    }

    fn next_header(&self, header: &[u8]) -> Option<ProtocolId> {
        let flags = *header.first()?;
        if flags & FLAG_TYPE != 0 {
            Some(ProtocolId::PAYLOAD)
        } else {
            Some(ProtocolId::PPP)
        }
    }

    fn bindings(&self) -> Vec<BindingRule> {
        vec![port_rule(ProtocolId::UDP, L2TP_PORTS)]
    }
}
