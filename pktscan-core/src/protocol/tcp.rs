//! TCP.

use etherparse::TcpHeaderSlice;

use crate::flow::FlowKeyBuilder;
use crate::schema::{FieldDescriptor, FieldKind};

use super::{Header, ScannerFlags, SubHeader};

const MIN_HEADER_LEN: usize = 20;

/// TCP. Nothing in the header names the application protocol, so everything
/// above TCP is found through port bindings and heuristics.
#[derive(Debug, Clone, Copy)]
pub struct TcpHeader;

impl Header for TcpHeader {
    fn name(&self) -> &'static str {
        "tcp"
    }

    fn display_name(&self) -> &'static str {
        "TCP"
    }

    fn fields(&self) -> Vec<FieldDescriptor> {
        vec![
            FieldDescriptor::src_port(0),
            FieldDescriptor::dst_port(2),
            FieldDescriptor::new("seq", FieldKind::UInt32).at(4),
            FieldDescriptor::new("ack", FieldKind::UInt32).at(8),
            FieldDescriptor::new("data_offset", FieldKind::Bits(4)).at(12),
            FieldDescriptor::new("flags", FieldKind::Bits(9)).at(12),
            FieldDescriptor::new("window", FieldKind::UInt16).at(14),
            FieldDescriptor::checksum(16),
            FieldDescriptor::new("urgent_ptr", FieldKind::UInt16).at(18),
            FieldDescriptor::new("options", FieldKind::Bytes)
                .at(20)
                .optional(),
        ]
    }

    fn sub_headers(&self) -> Vec<SubHeader> {
        vec![
            SubHeader::new(0, "eol", "End of Option List"),
            SubHeader::new(1, "nop", "No Operation"),
            SubHeader::new(2, "mss", "Maximum Segment Size")
                .with_fields(vec![FieldDescriptor::new("mss", FieldKind::UInt16).at(2)]),
            SubHeader::new(3, "window_scale", "Window Scale")
                .with_fields(vec![FieldDescriptor::new("shift", FieldKind::UInt8).at(2)]),
            SubHeader::new(4, "sack_permitted", "SACK Permitted"),
            SubHeader::new(5, "sack", "Selective Acknowledgement"),
            SubHeader::new(8, "timestamp", "Timestamps").with_fields(vec![
                FieldDescriptor::new("tsval", FieldKind::UInt32).at(2),
                FieldDescriptor::new("tsecr", FieldKind::UInt32).at(6),
            ]),
        ]
    }

    fn scanner_flags(&self) -> ScannerFlags {
        ScannerFlags::HEURISTIC_BINDING
    }

    /// Data offset in bytes. A segment cut before the data offset byte is
    /// measured at the minimum so the record carries a truncation flag.
    fn header_length(&self, data: &[u8], offset: usize) -> usize {
        if offset >= data.len() {
            return 0;
        }
        match data.get(offset + 12) {
            Some(&byte) => {
                let len = (byte >> 4) as usize * 4;
                if len >= MIN_HEADER_LEN {
                    len
                } else {
                    0
                }
            }
            None => MIN_HEADER_LEN,
        }
    }

    fn flow_key(&self, header: &[u8], key: &mut FlowKeyBuilder<'_>) {
        if let Ok(tcp) = TcpHeaderSlice::from_slice(header) {
            key.pair(
                u32::from(tcp.source_port()),
                u32::from(tcp.destination_port()),
            );
        }
    }
}
