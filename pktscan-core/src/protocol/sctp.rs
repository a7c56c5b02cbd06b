//! SCTP common header.

use crate::flow::FlowKeyBuilder;
use crate::schema::{FieldDescriptor, FieldKind};

use super::{read_u16, Header, SubHeader};

const HEADER_LEN: usize = 12;

/// SCTP. Chunks are described as sub-headers and left in the payload.
#[derive(Debug, Clone, Copy)]
pub struct SctpHeader;

impl Header for SctpHeader {
    fn name(&self) -> &'static str {
        "sctp"
    }

    fn display_name(&self) -> &'static str {
        "SCTP"
    }

    fn fields(&self) -> Vec<FieldDescriptor> {
        vec![
            FieldDescriptor::src_port(0),
            FieldDescriptor::dst_port(2),
            FieldDescriptor::new("verification_tag", FieldKind::UInt32).at(4),
            FieldDescriptor::checksum(8).with_description("CRC32c"),
        ]
    }

    fn sub_headers(&self) -> Vec<SubHeader> {
        let chunk = || {
            vec![
                FieldDescriptor::new("type", FieldKind::UInt8).at(0),
                FieldDescriptor::new("flags", FieldKind::UInt8).at(1),
                FieldDescriptor::new("length", FieldKind::UInt16).at(2),
            ]
        };
        vec![
            SubHeader::new(0, "data", "Payload Data").with_fields(vec![
                FieldDescriptor::new("tsn", FieldKind::UInt32).at(4),
                FieldDescriptor::new("stream_id", FieldKind::UInt16).at(8),
                FieldDescriptor::new("stream_seq", FieldKind::UInt16).at(10),
                FieldDescriptor::new("ppid", FieldKind::UInt32).at(12),
            ]),
            SubHeader::new(1, "init", "Initiation").with_fields(chunk()),
            SubHeader::new(2, "init_ack", "Initiation Acknowledgement").with_fields(chunk()),
            SubHeader::new(3, "sack", "Selective Acknowledgement").with_fields(chunk()),
            SubHeader::new(4, "heartbeat", "Heartbeat Request").with_fields(chunk()),
            SubHeader::new(5, "heartbeat_ack", "Heartbeat Acknowledgement"),
            SubHeader::new(6, "abort", "Abort"),
            SubHeader::new(7, "shutdown", "Shutdown"),
            SubHeader::new(8, "shutdown_ack", "Shutdown Acknowledgement"),
            SubHeader::new(9, "error", "Operation Error"),
            SubHeader::new(10, "cookie_echo", "State Cookie"),
            SubHeader::new(11, "cookie_ack", "Cookie Acknowledgement"),
            SubHeader::new(14, "shutdown_complete", "Shutdown Complete"),
        ]
    }

    fn header_length(&self, data: &[u8], offset: usize) -> usize {
        if offset < data.len() {
            HEADER_LEN
        } else {
            0
        }
    }

    fn flow_key(&self, header: &[u8], key: &mut FlowKeyBuilder<'_>) {
        if let (Some(src), Some(dst)) = (read_u16(header, 0), read_u16(header, 2)) {
            key.pair(u32::from(src), u32::from(dst));
        }
    }
}
