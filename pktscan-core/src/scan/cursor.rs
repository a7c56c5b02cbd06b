//! The scan loop.
//!
//! A [`Cursor`] walks one buffer from a start protocol to a terminal
//! condition, appending a [`HeaderRecord`] per header found:
//!
//! ```text
//!  Scanning(id, offset) -> Recording -> Resolving -> Scanning(next, offset')
//!                                                 \-> Terminal
//! ```
//!
//! Terminal conditions: the next id is payload, a header measures 0 bytes,
//! the offset reaches the end of the current region, a header or gap was cut
//! short by the capture, or the record limit is reached.

use tracing::{debug, trace};

use crate::flow::compute_flow_key;
use crate::protocol::{
    BindView, BindingRule, HeaderScanner, ProtocolId, RegistryTable, ScannerFlags, Segments,
};

use super::{HeaderFlags, HeaderRecord, PacketFlags, PacketState, ScanConfig, MAX_HEADERS};

/// Scan-in-progress context for one packet.
pub(crate) struct Cursor<'a> {
    table: &'a RegistryTable,
    config: &'a ScanConfig,
    data: &'a [u8],
    /// Where the next header's prefix starts
    offset: usize,
    /// End of the region the current header may occupy
    end: usize,
    /// Flags carried from earlier records to later ones
    inherited: HeaderFlags,
}

impl<'a> Cursor<'a> {
    pub(crate) fn new(table: &'a RegistryTable, config: &'a ScanConfig, data: &'a [u8]) -> Self {
        Self {
            table,
            config,
            data,
            offset: 0,
            end: data.len(),
            inherited: HeaderFlags::empty(),
        }
    }

    /// Run to a terminal condition, filling `state`.
    pub(crate) fn run(mut self, state: &mut PacketState, wire_len: usize, start: ProtocolId) {
        state.reset(self.data.len(), wire_len);
        let table = self.table;
        let limit = self.config.max_headers.clamp(1, MAX_HEADERS);
        let mut id = start;
        let mut heuristic = false;

        loop {
            if id.is_payload() {
                self.finish(state, true);
                break;
            }
            if self.offset >= self.end {
                trace!(offset = self.offset, "reached end of region");
                break;
            }
            if state.len() + 1 >= limit {
                debug!(limit, "header limit reached");
                state.set_flag(PacketFlags::HEADER_LIMIT);
                self.finish(state, true);
                break;
            }
            let Some(scanner) = table.scanner(id) else {
                debug!(id = id.raw(), "no scanner for protocol, treating rest as payload");
                self.finish(state, true);
                break;
            };

            let Some(record) = self.record(scanner, heuristic) else {
                trace!(id = id.raw(), offset = self.offset, "header not present");
                self.finish(state, false);
                break;
            };

            if let Err(err) = state.push(record) {
                debug!(%err, "dropping header record");
                break;
            }
            trace!(
                id = id.raw(),
                offset = record.offset,
                length = record.length,
                "recorded header"
            );

            if record.flags.intersects(
                HeaderFlags::PREFIX_TRUNCATED
                    | HeaderFlags::HEADER_TRUNCATED
                    | HeaderFlags::GAP_TRUNCATED,
            ) {
                break;
            }

            self.offset = record.next_offset();
            self.end = self.offset + record.payload;

            let view = BindView::new(&self.data[..self.end], self.offset, state);
            (id, heuristic) = self.resolve(scanner, &record, &view);
        }

        if self.config.compute_flow_key {
            let key = compute_flow_key(table, state, self.data);
            *state.flow_key_mut() = key;
        }
    }

    /// Measure, clip and flag the header at the cursor. `None` when the
    /// header measures 0 bytes.
    fn record(&mut self, scanner: &HeaderScanner, heuristic: bool) -> Option<HeaderRecord> {
        let mut seg = scanner.segments(&self.data[..self.end], self.offset);
        if seg.header == 0 {
            return None;
        }

        let available = self.end - self.offset;
        if seg.payload == 0 {
            seg.payload = available.saturating_sub(seg.total());
        }
        let truncated = clip(&mut seg, available);

        let start = self.offset + seg.prefix;
        let mut record = HeaderRecord::from_segments(scanner.id(), start, &seg);
        let hooks = scanner.hooks();
        let header = &self.data[start..start + seg.header];

        let own = hooks.record_flags(header);
        record.flags = truncated | self.inherited | own;
        self.inherited |= own & HeaderFlags::CUMULATIVE;
        if heuristic {
            record.flags |= HeaderFlags::HEURISTIC_BINDING;
        }

        if !record.is_truncated() {
            let payload = record.payload_bytes(self.data);
            if let Some(valid) = hooks.checksum(header, payload) {
                record.flags |= HeaderFlags::CRC_PRESENT;
                record.flags |= if valid {
                    HeaderFlags::CRC_VALID
                } else {
                    HeaderFlags::CRC_INVALID
                };
            }
        }

        Some(record)
    }

    /// Next protocol after `record`, and whether a heuristic picked it.
    fn resolve(
        &self,
        scanner: &HeaderScanner,
        record: &HeaderRecord,
        view: &BindView<'_>,
    ) -> (ProtocolId, bool) {
        let flags = scanner.flags();
        if flags.contains(ScannerFlags::OVERRIDE_BINDING) {
            return (ProtocolId::PAYLOAD, false);
        }

        let heuristics = flags.contains(ScannerFlags::HEURISTIC_BINDING);
        let pre = heuristics && flags.contains(ScannerFlags::HEURISTIC_PRE_BINDING);

        if pre {
            if let Some(id) = self.first_match(scanner.heuristics(), view) {
                return (id, true);
            }
        }

        let header = record.header_bytes(self.data);
        if let Some(id) = scanner.hooks().next_header(header) {
            return (id, false);
        }

        if let Some(id) = self.first_match(scanner.bindings(), view) {
            return (id, false);
        }

        if heuristics && !pre {
            if let Some(id) = self.first_match(scanner.heuristics(), view) {
                return (id, true);
            }
        }

        (ProtocolId::PAYLOAD, false)
    }

    fn first_match(
        &self,
        rules: &[BindingRule],
        view: &BindView<'_>,
    ) -> Option<ProtocolId> {
        rules
            .iter()
            .filter(|rule| {
                !self.config.enforce_binding_dependencies || rule.is_satisfied(view.state)
            })
            .find(|rule| rule.evaluate(view))
            .map(|rule| rule.source)
    }

    /// Append the payload record for whatever is left of the region.
    ///
    /// `always` appends even when nothing is left, so a chain that resolved
    /// to payload ends with an explicit (possibly empty) payload record.
    fn finish(&self, state: &mut PacketState, always: bool) {
        let remaining = self.end.saturating_sub(self.offset);
        if remaining == 0 && !always {
            return;
        }
        let offset = self.offset.min(self.end);
        let mut record = HeaderRecord::new(ProtocolId::PAYLOAD, offset, remaining);
        record.flags = self.inherited;
        if let Err(err) = state.push(record) {
            debug!(%err, "no room for payload record");
        }
    }
}

/// Trim segments that run past `available` bytes, last segment first.
///
/// Keeping the leading bytes of the layout is the same as cutting from the
/// back, and never sums the untrusted lengths.
fn clip(seg: &mut Segments, available: usize) -> HeaderFlags {
    let mut left = available;
    let mut flags = HeaderFlags::empty();
    for (len, flag) in [
        (&mut seg.prefix, HeaderFlags::PREFIX_TRUNCATED),
        (&mut seg.header, HeaderFlags::HEADER_TRUNCATED),
        (&mut seg.gap, HeaderFlags::GAP_TRUNCATED),
        (&mut seg.payload, HeaderFlags::PAYLOAD_TRUNCATED),
        (&mut seg.postfix, HeaderFlags::POSTFIX_TRUNCATED),
    ] {
        if *len > left {
            *len = left;
            flags |= flag;
        }
        left -= *len;
    }
    flags
}
