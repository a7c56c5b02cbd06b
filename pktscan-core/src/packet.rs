//! Packets as delivered by a capture source.
//!
//! [`PacketRef`] borrows the capture source's buffer and is only valid for
//! the current dispatch. [`RawPacket`] owns its bytes and can be kept
//! around, e.g. in a [`FlowTable`](crate::flow::FlowTable).

use bytes::Bytes;

/// Common link-layer types (pcap `LINKTYPE_*` values).
pub mod link_type {
    pub const NULL: u16 = 0;
    pub const ETHERNET: u16 = 1;
    pub const PPP: u16 = 9;
    pub const RAW: u16 = 101;
    pub const LINUX_SLL: u16 = 113;
    pub const IPV4: u16 = 228;
    pub const IPV6: u16 = 229;
}

/// Borrowed view of one captured packet.
#[derive(Debug, Clone, Copy)]
pub struct PacketRef<'a> {
    pub frame_number: u64,
    pub timestamp_us: i64,
    /// Bytes actually captured
    pub captured_len: u32,
    /// Bytes on the wire
    pub original_len: u32,
    pub link_type: u16,
    pub data: &'a [u8],
}

impl<'a> PacketRef<'a> {
    /// Packet captured in full on an Ethernet link.
    pub fn ethernet(frame_number: u64, data: &'a [u8]) -> Self {
        Self::new(frame_number, link_type::ETHERNET, data)
    }

    /// Packet captured in full.
    pub fn new(frame_number: u64, link_type: u16, data: &'a [u8]) -> Self {
        let len = u32::try_from(data.len()).unwrap_or(u32::MAX);
        Self {
            frame_number,
            timestamp_us: 0,
            captured_len: len,
            original_len: len,
            link_type,
            data,
        }
    }

    pub fn with_timestamp(mut self, timestamp_us: i64) -> Self {
        self.timestamp_us = timestamp_us;
        self
    }

    /// Claim a longer on-wire length than was captured.
    pub fn with_original_len(mut self, original_len: u32) -> Self {
        self.original_len = original_len;
        self
    }

    /// Captured bytes, never more than `captured_len`.
    pub fn bytes(&self) -> &'a [u8] {
        let len = (self.captured_len as usize).min(self.data.len());
        &self.data[..len]
    }

    pub fn wire_len(&self) -> usize {
        self.original_len as usize
    }

    /// Durable copy that outlives the capture buffer.
    pub fn to_raw(&self) -> RawPacket {
        RawPacket {
            frame_number: self.frame_number,
            timestamp_us: self.timestamp_us,
            captured_length: self.captured_len,
            original_length: self.original_len,
            link_type: self.link_type,
            data: Bytes::copy_from_slice(self.bytes()),
        }
    }
}

/// Owned packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPacket {
    pub frame_number: u64,
    pub timestamp_us: i64,
    pub captured_length: u32,
    pub original_length: u32,
    pub link_type: u16,
    pub data: Bytes,
}

impl RawPacket {
    /// Borrowed view, for feeding back into a scanner.
    pub fn view(&self) -> PacketRef<'_> {
        PacketRef {
            frame_number: self.frame_number,
            timestamp_us: self.timestamp_us,
            captured_len: self.captured_length,
            original_len: self.original_length,
            link_type: self.link_type,
            data: &self.data,
        }
    }
}
