//! Binding rules: "protocol S may sit in the payload of protocol T".

use std::fmt;
use std::sync::Arc;

use smallvec::SmallVec;

use crate::scan::{HeaderRecord, PacketState};

use super::{ProtocolId, ProtocolSet};

/// Predicate signature for binding rules.
pub type BindPredicate = dyn Fn(&BindView<'_>) -> bool + Send + Sync;

/// What a binding predicate gets to look at.
///
/// `data` ends at the enclosing region's end, so trailers and postfix bytes
/// are never visible. `offset` is where the candidate header would start.
#[derive(Clone, Copy)]
pub struct BindView<'a> {
    pub data: &'a [u8],
    pub offset: usize,
    pub state: &'a PacketState,
}

impl<'a> BindView<'a> {
    pub fn new(data: &'a [u8], offset: usize, state: &'a PacketState) -> Self {
        Self {
            data,
            offset,
            state,
        }
    }

    /// Bytes from the candidate offset to the end of the region.
    pub fn payload(&self) -> &'a [u8] {
        self.data.get(self.offset..).unwrap_or(&[])
    }

    /// Record of the most recent instance of `id`, i.e. the innermost one.
    pub fn record(&self, id: ProtocolId) -> Option<&'a HeaderRecord> {
        self.state.last(id)
    }

    /// Header bytes of the most recent instance of `id`.
    pub fn header(&self, id: ProtocolId) -> Option<&'a [u8]> {
        let record = self.record(id)?;
        self.data.get(record.offset..record.offset + record.length)
    }

    /// Big-endian u16 at `at` inside the header of `id`.
    pub fn header_u16(&self, id: ProtocolId, at: usize) -> Option<u16> {
        let bytes = self.header(id)?.get(at..at + 2)?;
        Some(u16::from_be_bytes([bytes[0], bytes[1]]))
    }
}

/// Relates a `source` protocol to the `target` whose payload it may occupy.
#[derive(Clone)]
pub struct BindingRule {
    /// Protocol that follows when the predicate holds
    pub source: ProtocolId,
    /// Protocol whose payload is examined
    pub target: ProtocolId,
    dependencies: SmallVec<[ProtocolId; 4]>,
    required: ProtocolSet,
    predicate: Arc<BindPredicate>,
}

impl BindingRule {
    pub fn new<F>(source: ProtocolId, target: ProtocolId, predicate: F) -> Self
    where
        F: Fn(&BindView<'_>) -> bool + Send + Sync + 'static,
    {
        Self {
            source,
            target,
            dependencies: SmallVec::new(),
            required: ProtocolSet::new(),
            predicate: Arc::new(predicate),
        }
    }

    /// Rule declared by a header about itself; the source is filled in when
    /// the header is registered.
    pub fn onto<F>(target: ProtocolId, predicate: F) -> Self
    where
        F: Fn(&BindView<'_>) -> bool + Send + Sync + 'static,
    {
        Self::new(ProtocolId::PAYLOAD, target, predicate)
    }

    /// Require `id` to be present before the predicate may run.
    pub fn depends_on(mut self, id: ProtocolId) -> Self {
        if self.required.insert(id) {
            self.dependencies.push(id);
        }
        self
    }

    pub(crate) fn with_source(mut self, source: ProtocolId) -> Self {
        self.source = source;
        self
    }

    pub fn dependencies(&self) -> &[ProtocolId] {
        &self.dependencies
    }

    /// All dependencies appear in the scan so far.
    pub fn is_satisfied(&self, state: &PacketState) -> bool {
        state.present().is_superset(&self.required)
    }

    pub fn evaluate(&self, view: &BindView<'_>) -> bool {
        (self.predicate)(view)
    }
}

impl fmt::Debug for BindingRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingRule")
            .field("source", &self.source)
            .field("target", &self.target)
            .field("dependencies", &self.dependencies)
            .finish()
    }
}

/// Rule matching either port of the innermost TCP or UDP header.
pub fn port_rule(target: ProtocolId, ports: &'static [u16]) -> BindingRule {
    BindingRule::onto(target, move |view| {
        [0, 2]
            .iter()
            .filter_map(|at| view.header_u16(target, *at))
            .any(|port| ports.contains(&port))
    })
    .depends_on(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::HeaderRecord;

    fn tcp_state() -> PacketState {
        let mut state = PacketState::new();
        state
            .push(HeaderRecord::new(ProtocolId::TCP, 0, 20))
            .unwrap();
        state
    }

    #[test]
    fn test_dependencies_deduplicated() {
        let rule = BindingRule::onto(ProtocolId::TCP, |_| true)
            .depends_on(ProtocolId::IPV4)
            .depends_on(ProtocolId::IPV4)
            .depends_on(ProtocolId::TCP);
        assert_eq!(rule.dependencies(), &[ProtocolId::IPV4, ProtocolId::TCP]);
        assert_eq!(rule.source, ProtocolId::PAYLOAD);
        assert_eq!(rule.with_source(ProtocolId::HTTP).source, ProtocolId::HTTP);
    }

    #[test]
    fn test_is_satisfied() {
        let state = tcp_state();
        let ok = BindingRule::onto(ProtocolId::TCP, |_| true).depends_on(ProtocolId::TCP);
        let missing = BindingRule::onto(ProtocolId::TCP, |_| true).depends_on(ProtocolId::IPV6);
        assert!(ok.is_satisfied(&state));
        assert!(!missing.is_satisfied(&state));
        assert!(BindingRule::onto(ProtocolId::TCP, |_| false).is_satisfied(&state));
    }

    #[test]
    fn test_port_rule() {
        let mut data = vec![0u8; 24];
        data[0..2].copy_from_slice(&49152u16.to_be_bytes()); // src port
        data[2..4].copy_from_slice(&80u16.to_be_bytes()); // dst port
        let state = tcp_state();

        let http = port_rule(ProtocolId::TCP, &[80, 8080]);
        let dns = port_rule(ProtocolId::TCP, &[53]);
        let view = BindView::new(&data, 20, &state);
        assert!(http.evaluate(&view));
        assert!(!dns.evaluate(&view));
        assert_eq!(view.payload().len(), 4);
    }

    #[test]
    fn test_view_past_end() {
        let state = PacketState::new();
        let view = BindView::new(&[1, 2, 3], 10, &state);
        assert!(view.payload().is_empty());
        assert!(view.header(ProtocolId::TCP).is_none());
    }
}
