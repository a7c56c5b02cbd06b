//! Protocol identifiers.

use std::fmt;

/// Total number of ids a registry can hand out.
pub const MAX_ID_COUNT: usize = 256;

/// Number of core protocols installed by [`Registry::new`](super::Registry::new).
pub const CORE_COUNT: usize = 17;

/// Small integer naming one registered header type.
///
/// Core protocols have fixed ids below [`CORE_COUNT`]. User protocols get the
/// next free id at registration and keep it for the registry's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProtocolId(u8);

impl ProtocolId {
    /// Terminal sentinel: everything after the last decoded header.
    pub const PAYLOAD: ProtocolId = ProtocolId(0);
    pub const ETHERNET: ProtocolId = ProtocolId(1);
    pub const IPV4: ProtocolId = ProtocolId(2);
    pub const IPV6: ProtocolId = ProtocolId(3);
    pub const TCP: ProtocolId = ProtocolId(4);
    pub const UDP: ProtocolId = ProtocolId(5);
    pub const VLAN: ProtocolId = ProtocolId(6);
    pub const ARP: ProtocolId = ProtocolId(7);
    pub const ICMP: ProtocolId = ProtocolId(8);
    pub const SLL: ProtocolId = ProtocolId(9);
    pub const NULL: ProtocolId = ProtocolId(10);
    pub const HTTP: ProtocolId = ProtocolId(11);
    pub const LLC: ProtocolId = ProtocolId(12);
    pub const SNAP: ProtocolId = ProtocolId(13);
    pub const PPP: ProtocolId = ProtocolId(14);
    pub const L2TP: ProtocolId = ProtocolId(15);
    pub const SCTP: ProtocolId = ProtocolId(16);

    pub const fn new(raw: u8) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u8 {
        self.0
    }

    /// Index into per-id tables.
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    pub const fn is_core(self) -> bool {
        (self.0 as usize) < CORE_COUNT
    }

    pub const fn is_payload(self) -> bool {
        self.0 == 0
    }

    /// Id at `index`, if it fits in the id space.
    pub fn from_index(index: usize) -> Option<Self> {
        u8::try_from(index).ok().map(Self)
    }
}

impl fmt::Display for ProtocolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Fixed-size set of protocol ids, one bit per id.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ProtocolSet([u64; MAX_ID_COUNT / 64]);

impl ProtocolSet {
    pub const fn new() -> Self {
        Self([0; MAX_ID_COUNT / 64])
    }

    pub fn insert(&mut self, id: ProtocolId) -> bool {
        let (word, bit) = (id.index() / 64, id.index() % 64);
        let fresh = self.0[word] & (1 << bit) == 0;
        self.0[word] |= 1 << bit;
        fresh
    }

    pub fn contains(&self, id: ProtocolId) -> bool {
        self.0[id.index() / 64] & (1 << (id.index() % 64)) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0.iter().all(|w| *w == 0)
    }

    pub fn len(&self) -> usize {
        self.0.iter().map(|w| w.count_ones() as usize).sum()
    }

    pub fn clear(&mut self) {
        self.0 = [0; MAX_ID_COUNT / 64];
    }

    /// True when every id in `other` is also in `self`.
    pub fn is_superset(&self, other: &ProtocolSet) -> bool {
        self.0.iter().zip(other.0.iter()).all(|(a, b)| a & b == *b)
    }

    pub fn iter(&self) -> impl Iterator<Item = ProtocolId> + '_ {
        (0..MAX_ID_COUNT)
            .filter_map(ProtocolId::from_index)
            .filter(move |id| self.contains(*id))
    }
}

impl FromIterator<ProtocolId> for ProtocolSet {
    fn from_iter<I: IntoIterator<Item = ProtocolId>>(iter: I) -> Self {
        let mut set = ProtocolSet::new();
        for id in iter {
            set.insert(id);
        }
        set
    }
}
