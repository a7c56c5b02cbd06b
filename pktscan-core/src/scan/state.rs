//! Per-packet scan results.

use bitflags::bitflags;
use smallvec::SmallVec;

use crate::error::{Capacity, Error, Result};
use crate::flow::FlowKey;
use crate::protocol::{ProtocolId, ProtocolSet, Segments, MAX_ID_COUNT};

/// Most header records a single packet can hold.
pub const MAX_HEADERS: usize = 64;

bitflags! {
    /// Flags on one header record.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct HeaderFlags: u32 {
        const PREFIX_TRUNCATED = 0x0001;
        const HEADER_TRUNCATED = 0x0002;
        const GAP_TRUNCATED = 0x0004;
        const PAYLOAD_TRUNCATED = 0x0008;
        const POSTFIX_TRUNCATED = 0x0010;

        /// Part of a fragmented datagram; inherited by every later record
        const FRAGMENTED = 0x0100;
        /// Id chosen by a heuristic binding rather than a rule or hook
        const HEURISTIC_BINDING = 0x0200;

        const CRC_PRESENT = 0x1000;
        const CRC_VALID = 0x2000;
        const CRC_INVALID = 0x4000;

        const TRUNCATED = Self::PREFIX_TRUNCATED.bits()
            | Self::HEADER_TRUNCATED.bits()
            | Self::GAP_TRUNCATED.bits()
            | Self::PAYLOAD_TRUNCATED.bits()
            | Self::POSTFIX_TRUNCATED.bits();

        /// Flags that carry over to records after the one that set them
        const CUMULATIVE = Self::FRAGMENTED.bits();
    }
}

bitflags! {
    /// Flags on a whole packet.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct PacketFlags: u32 {
        /// Captured fewer bytes than were on the wire
        const TRUNCATED = 0x01;
        /// Scan stopped at the header record limit
        const HEADER_LIMIT = 0x02;
    }
}

/// One decoded header occurrence.
///
/// `offset` is the start of the header proper; the prefix, when present,
/// occupies the `prefix` bytes just before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HeaderRecord {
    pub id: ProtocolId,
    pub offset: usize,
    pub length: usize,
    pub prefix: usize,
    pub gap: usize,
    pub payload: usize,
    pub postfix: usize,
    pub flags: HeaderFlags,
}

impl HeaderRecord {
    pub fn new(id: ProtocolId, offset: usize, length: usize) -> Self {
        Self {
            id,
            offset,
            length,
            prefix: 0,
            gap: 0,
            payload: 0,
            postfix: 0,
            flags: HeaderFlags::empty(),
        }
    }

    pub(crate) fn from_segments(id: ProtocolId, offset: usize, seg: &Segments) -> Self {
        Self {
            id,
            offset,
            length: seg.header,
            prefix: seg.prefix,
            gap: seg.gap,
            payload: seg.payload,
            postfix: seg.postfix,
            flags: HeaderFlags::empty(),
        }
    }

    /// Where the prefix starts.
    pub fn start(&self) -> usize {
        self.offset - self.prefix
    }

    /// Where the next header's prefix starts.
    pub fn next_offset(&self) -> usize {
        self.offset + self.length + self.gap
    }

    /// One past the last byte covered by any segment.
    pub fn end(&self) -> usize {
        self.next_offset() + self.payload + self.postfix
    }

    pub fn is_truncated(&self) -> bool {
        self.flags.intersects(HeaderFlags::TRUNCATED)
    }

    pub fn is_fragmented(&self) -> bool {
        self.flags.contains(HeaderFlags::FRAGMENTED)
    }

    /// Checksum verdict, if one was computed.
    pub fn checksum_valid(&self) -> Option<bool> {
        if !self.flags.contains(HeaderFlags::CRC_PRESENT) {
            return None;
        }
        Some(self.flags.contains(HeaderFlags::CRC_VALID))
    }

    /// Header bytes, clipped to what was captured.
    pub fn header_bytes<'a>(&self, data: &'a [u8]) -> &'a [u8] {
        slice(data, self.offset, self.length)
    }

    pub fn payload_bytes<'a>(&self, data: &'a [u8]) -> &'a [u8] {
        slice(data, self.next_offset(), self.payload)
    }
}

fn slice(data: &[u8], at: usize, len: usize) -> &[u8] {
    let end = at.saturating_add(len).min(data.len());
    data.get(at..end).unwrap_or(&[])
}

/// Ordered header records for one packet, plus lookup indexes.
#[derive(Debug, Clone)]
pub struct PacketState {
    records: SmallVec<[HeaderRecord; 16]>,
    present: ProtocolSet,
    instances: [u8; MAX_ID_COUNT],
    flags: PacketFlags,
    captured_len: usize,
    wire_len: usize,
    flow_key: FlowKey,
}

impl PacketState {
    pub fn new() -> Self {
        Self {
            records: SmallVec::new(),
            present: ProtocolSet::new(),
            instances: [0; MAX_ID_COUNT],
            flags: PacketFlags::empty(),
            captured_len: 0,
            wire_len: 0,
            flow_key: FlowKey::default(),
        }
    }

    /// Clear for reuse, keeping allocations.
    pub fn reset(&mut self, captured_len: usize, wire_len: usize) {
        self.records.clear();
        self.present.clear();
        self.instances = [0; MAX_ID_COUNT];
        self.flags = PacketFlags::empty();
        self.captured_len = captured_len;
        self.wire_len = wire_len;
        self.flow_key.clear();
        if captured_len < wire_len {
            self.flags.insert(PacketFlags::TRUNCATED);
        }
    }

    pub(crate) fn push(&mut self, record: HeaderRecord) -> Result<()> {
        if self.records.len() >= MAX_HEADERS {
            return Err(Error::CapacityExceeded {
                what: Capacity::HeaderRecords,
                limit: MAX_HEADERS,
            });
        }
        self.present.insert(record.id);
        let count = &mut self.instances[record.id.index()];
        *count = count.saturating_add(1);
        self.records.push(record);
        Ok(())
    }

    pub(crate) fn set_flag(&mut self, flag: PacketFlags) {
        self.flags.insert(flag);
    }

    pub(crate) fn flow_key_mut(&mut self) -> &mut FlowKey {
        &mut self.flow_key
    }

    /// Number of header records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn header(&self, index: usize) -> Option<&HeaderRecord> {
        self.records.get(index)
    }

    pub fn headers(&self) -> &[HeaderRecord] {
        &self.records
    }

    pub fn iter(&self) -> impl Iterator<Item = &HeaderRecord> {
        self.records.iter()
    }

    pub fn last_header(&self) -> Option<&HeaderRecord> {
        self.records.last()
    }

    /// The `instance`-th occurrence of `id`, counting from 0.
    pub fn find(&self, id: ProtocolId, instance: usize) -> Option<&HeaderRecord> {
        if !self.has_instance(id, instance) {
            return None;
        }
        self.records.iter().filter(|r| r.id == id).nth(instance)
    }

    /// Index of the `instance`-th occurrence of `id`.
    pub fn position(&self, id: ProtocolId, instance: usize) -> Option<usize> {
        if !self.has_instance(id, instance) {
            return None;
        }
        self.records
            .iter()
            .enumerate()
            .filter(|(_, r)| r.id == id)
            .nth(instance)
            .map(|(i, _)| i)
    }

    pub fn first(&self, id: ProtocolId) -> Option<&HeaderRecord> {
        self.find(id, 0)
    }

    /// The innermost occurrence of `id`.
    pub fn last(&self, id: ProtocolId) -> Option<&HeaderRecord> {
        if !self.has(id) {
            return None;
        }
        self.records.iter().rev().find(|r| r.id == id)
    }

    pub fn has(&self, id: ProtocolId) -> bool {
        self.present.contains(id)
    }

    pub fn has_instance(&self, id: ProtocolId, instance: usize) -> bool {
        self.instance_count(id) > instance
    }

    pub fn instance_count(&self, id: ProtocolId) -> usize {
        self.instances[id.index()] as usize
    }

    /// Ids present anywhere in the packet.
    pub fn present(&self) -> &ProtocolSet {
        &self.present
    }

    pub fn flags(&self) -> PacketFlags {
        self.flags
    }

    pub fn is_truncated(&self) -> bool {
        self.flags.contains(PacketFlags::TRUNCATED)
    }

    pub fn captured_len(&self) -> usize {
        self.captured_len
    }

    pub fn wire_len(&self) -> usize {
        self.wire_len
    }

    pub fn flow_key(&self) -> &FlowKey {
        &self.flow_key
    }

    /// Header bytes of the record at `index`.
    pub fn segment<'a>(&self, data: &'a [u8], index: usize) -> Option<&'a [u8]> {
        self.records.get(index).map(|r| r.header_bytes(data))
    }
}

impl Default for PacketState {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> IntoIterator for &'a PacketState {
    type Item = &'a HeaderRecord;
    type IntoIter = std::slice::Iter<'a, HeaderRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
