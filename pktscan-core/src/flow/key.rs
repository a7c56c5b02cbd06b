//! Flow keys: direction-aware grouping identifiers built from header fields.

use std::fmt;
use std::hash::{Hash, Hasher};

use smallvec::SmallVec;
use tracing::trace;

use crate::protocol::{ProtocolId, ProtocolSet};

/// Most field pairs one key can carry.
pub const MAX_FLOW_PAIRS: usize = 3;

/// How a packet relates to a flow's key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Same direction as the packet that created the flow
    Forward,
    /// Opposite direction (reversible keys only)
    Reverse,
    /// Not this flow
    Unrelated,
}

impl Direction {
    pub fn is_match(self) -> bool {
        !matches!(self, Direction::Unrelated)
    }
}

/// One (forward, reverse) value pair contributed by a header.
///
/// For addresses and ports the forward value is the source and the reverse
/// value the destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FlowPair {
    pub id: ProtocolId,
    pub forward: u32,
    pub reverse: u32,
    /// Swapping the two values describes the same conversation
    pub reversible: bool,
}

impl FlowPair {
    pub fn swapped(&self) -> Self {
        Self {
            forward: self.reverse,
            reverse: self.forward,
            ..*self
        }
    }
}

/// Grouping key for one packet.
///
/// Two keys are equal when their pairs match in the same direction, or when
/// both are reversible and match with every pair swapped. Hashing is
/// symmetric so that both directions of a conversation land in one bucket.
#[derive(Debug, Clone, Default)]
pub struct FlowKey {
    pairs: SmallVec<[FlowPair; MAX_FLOW_PAIRS]>,
    headers: ProtocolSet,
}

impl FlowKey {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pairs(&self) -> &[FlowPair] {
        &self.pairs
    }

    /// Headers that contributed to this key.
    pub fn headers(&self) -> &ProtocolSet {
        &self.headers
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// True when there is at least one pair and every pair is reversible.
    pub fn is_reversible(&self) -> bool {
        !self.pairs.is_empty() && self.pairs.iter().all(|p| p.reversible)
    }

    pub(crate) fn clear(&mut self) {
        self.pairs.clear();
        self.headers.clear();
    }

    /// Relate `self` (a packet's key) to `other` (a flow's key).
    pub fn matches(&self, other: &FlowKey) -> Direction {
        if self.pairs == other.pairs {
            return Direction::Forward;
        }
        if self.is_reversible()
            && other.is_reversible()
            && self.pairs.len() == other.pairs.len()
            && self
                .pairs
                .iter()
                .zip(other.pairs.iter())
                .all(|(a, b)| a.swapped() == *b)
        {
            return Direction::Reverse;
        }
        Direction::Unrelated
    }

    /// Same key with every pair swapped.
    pub fn reversed(&self) -> FlowKey {
        FlowKey {
            pairs: self.pairs.iter().map(FlowPair::swapped).collect(),
            headers: self.headers,
        }
    }

    /// Builder scoped to one contributing header.
    pub fn builder(&mut self, id: ProtocolId) -> FlowKeyBuilder<'_> {
        FlowKeyBuilder { key: self, id }
    }
}

impl PartialEq for FlowKey {
    fn eq(&self, other: &Self) -> bool {
        self.matches(other).is_match()
    }
}

impl Eq for FlowKey {}

impl Hash for FlowKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.pairs.len().hash(state);
        for pair in &self.pairs {
            pair.id.hash(state);
            pair.forward.min(pair.reverse).hash(state);
            pair.forward.max(pair.reverse).hash(state);
        }
    }
}

impl fmt::Display for FlowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let arrow = if self.is_reversible() { "<->" } else { "->" };
        for (i, pair) in self.pairs.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(
                f,
                "[{}] {:#x} {} {:#x}",
                pair.id, pair.forward, arrow, pair.reverse
            )?;
        }
        Ok(())
    }
}

/// Lets one header add its pairs to a key under construction.
pub struct FlowKeyBuilder<'k> {
    key: &'k mut FlowKey,
    id: ProtocolId,
}

impl FlowKeyBuilder<'_> {
    pub fn id(&self) -> ProtocolId {
        self.id
    }

    /// Add a reversible pair (source, destination).
    pub fn pair(&mut self, forward: u32, reverse: u32) -> &mut Self {
        self.push(forward, reverse, true)
    }

    /// Add a pair whose direction matters.
    pub fn one_way(&mut self, forward: u32, reverse: u32) -> &mut Self {
        self.push(forward, reverse, false)
    }

    /// Drop pairs contributed by earlier (lower-layer) headers.
    pub fn replace_lower(&mut self) -> &mut Self {
        let id = self.id;
        self.key.pairs.retain(|p| p.id == id);
        self.key.headers.clear();
        self.key.headers.insert(id);
        self
    }

    fn push(&mut self, forward: u32, reverse: u32, reversible: bool) -> &mut Self {
        if self.key.pairs.len() >= MAX_FLOW_PAIRS {
            trace!(id = self.id.raw(), "flow key full, pair dropped");
            return self;
        }
        self.key.pairs.push(FlowPair {
            id: self.id,
            forward,
            reverse,
            reversible,
        });
        self.key.headers.insert(self.id);
        self
    }
}

/// Fold a byte string into a u32 for use as a pair value.
pub fn fold(bytes: &[u8]) -> u32 {
    bytes.chunks(4).fold(0u32, |acc, chunk| {
        let mut word = [0u8; 4];
        word[..chunk.len()].copy_from_slice(chunk);
        acc.rotate_left(5) ^ u32::from_be_bytes(word)
    })
}
