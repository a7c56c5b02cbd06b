//! Protocol registry: ids, descriptors, scanners and link-type mappings.
//!
//! The registry is read on every scan and written rarely, so it is kept as an
//! immutable [`RegistryTable`] behind a read/write lock. Writers copy the
//! table, mutate the copy and swap it in; readers hold an `Arc` to whichever
//! table was current when they looked and never see a half-applied change.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;

use bitflags::bitflags;
use parking_lot::RwLock;
use tracing::debug;

use crate::error::{Capacity, Error, Result};

use super::{
    ArpHeader, BindingRule, EthernetHeader, Header, HeaderDescriptor, HttpHeader, IcmpHeader,
    Ipv4Header, Ipv6Header, L2tpHeader, LlcHeader, NullHeader, PayloadHeader, PppHeader,
    ProtocolId, SctpHeader, Segments, SllHeader, SnapHeader, TcpHeader, UdpHeader, VlanHeader,
    MAX_ID_COUNT,
};

/// Number of link-type slots in the dispatch table.
pub const MAX_LINK_TYPES: usize = 512;

bitflags! {
    /// Per-protocol switches read on the scanning hot path.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ScannerFlags: u32 {
        /// Use the override segment lengths instead of the header's hooks
        const OVERRIDE_LENGTH = 0x01;
        /// Skip binding resolution; the next header is always payload
        const OVERRIDE_BINDING = 0x02;
        /// Consult heuristic bindings
        const HEURISTIC_BINDING = 0x10;
        /// With HEURISTIC_BINDING, run heuristics before the ordered rules
        const HEURISTIC_PRE_BINDING = 0x20;
    }
}

/// Per-protocol scanning strategy: hooks, ordered rules and flags.
#[derive(Clone, Debug)]
pub struct HeaderScanner {
    descriptor: Arc<HeaderDescriptor>,
    bindings: Vec<BindingRule>,
    heuristics: Vec<BindingRule>,
    flags: ScannerFlags,
    override_lengths: Option<Segments>,
    link_type: Option<u16>,
}

impl HeaderScanner {
    fn new(descriptor: HeaderDescriptor, flags: ScannerFlags) -> Self {
        Self {
            descriptor: Arc::new(descriptor),
            bindings: Vec::new(),
            heuristics: Vec::new(),
            flags,
            override_lengths: None,
            link_type: None,
        }
    }

    pub fn id(&self) -> ProtocolId {
        self.descriptor.id
    }

    pub fn descriptor(&self) -> &Arc<HeaderDescriptor> {
        &self.descriptor
    }

    pub fn hooks(&self) -> &dyn Header {
        self.descriptor.hooks()
    }

    /// Binding rules in first-match order.
    pub fn bindings(&self) -> &[BindingRule] {
        &self.bindings
    }

    pub fn heuristics(&self) -> &[BindingRule] {
        &self.heuristics
    }

    pub fn flags(&self) -> ScannerFlags {
        self.flags
    }

    /// Resolve the five segment lengths for a header whose prefix starts at
    /// `offset`.
    ///
    /// The prefix is measured at `offset`; every other segment is measured
    /// from the header start, `offset + prefix`.
    pub fn segments(&self, data: &[u8], offset: usize) -> Segments {
        if self.flags.contains(ScannerFlags::OVERRIDE_LENGTH) {
            if let Some(fixed) = self.override_lengths {
                return fixed;
            }
        }

        let hooks = self.hooks();
        if let Some(whole) = hooks.segments(data, offset) {
            return whole;
        }

        let prefix = hooks.prefix_length(data, offset);
        let start = offset.saturating_add(prefix);
        let header = hooks.header_length(data, start);
        if header == 0 {
            return Segments {
                prefix,
                ..Segments::default()
            };
        }

        Segments {
            prefix,
            header,
            gap: hooks.gap_length(data, start),
            payload: hooks.payload_length(data, start),
            postfix: hooks.postfix_length(data, start),
        }
    }
}

/// One immutable generation of the registry.
#[derive(Clone, Debug)]
pub struct RegistryTable {
    scanners: Vec<HeaderScanner>,
    by_type: HashMap<TypeId, ProtocolId>,
    by_name: HashMap<&'static str, ProtocolId>,
    link_types: Vec<Option<ProtocolId>>,
    default_link: ProtocolId,
    generation: u64,
}

impl RegistryTable {
    fn empty() -> Self {
        Self {
            scanners: Vec::with_capacity(MAX_ID_COUNT),
            by_type: HashMap::new(),
            by_name: HashMap::new(),
            link_types: vec![None; MAX_LINK_TYPES],
            default_link: ProtocolId::ETHERNET,
            generation: 0,
        }
    }

    /// Table with the core protocols installed in id order.
    fn with_core() -> Self {
        let mut table = Self::empty();
        table.install(ProtocolId::PAYLOAD, PayloadHeader);
        table.install(ProtocolId::ETHERNET, EthernetHeader);
        table.install(ProtocolId::IPV4, Ipv4Header);
        table.install(ProtocolId::IPV6, Ipv6Header);
        table.install(ProtocolId::TCP, TcpHeader);
        table.install(ProtocolId::UDP, UdpHeader);
        table.install(ProtocolId::VLAN, VlanHeader);
        table.install(ProtocolId::ARP, ArpHeader);
        table.install(ProtocolId::ICMP, IcmpHeader);
        table.install(ProtocolId::SLL, SllHeader);
        table.install(ProtocolId::NULL, NullHeader);
        table.install(ProtocolId::HTTP, HttpHeader);
        table.install(ProtocolId::LLC, LlcHeader);
        table.install(ProtocolId::SNAP, SnapHeader);
        table.install(ProtocolId::PPP, PppHeader);
        table.install(ProtocolId::L2TP, L2tpHeader);
        table.install(ProtocolId::SCTP, SctpHeader);
        table
    }

    /// Generation counter; bumped by every committed mutation.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Number of registered protocols (and the next id to be assigned).
    pub fn len(&self) -> usize {
        self.scanners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scanners.is_empty()
    }

    pub fn scanner(&self, id: ProtocolId) -> Option<&HeaderScanner> {
        self.scanners.get(id.index())
    }

    fn scanner_mut(&mut self, id: ProtocolId) -> Result<&mut HeaderScanner> {
        self.scanners
            .get_mut(id.index())
            .ok_or(Error::UnknownProtocol { id })
    }

    pub fn lookup(&self, id: ProtocolId) -> Result<Arc<HeaderDescriptor>> {
        self.scanner(id)
            .map(|s| Arc::clone(&s.descriptor))
            .ok_or(Error::UnknownProtocol { id })
    }

    pub fn lookup_name(&self, name: &str) -> Option<ProtocolId> {
        self.by_name.get(name).copied()
    }

    pub fn id_of<H: Header>(&self) -> Option<ProtocolId> {
        self.by_type.get(&TypeId::of::<H>()).copied()
    }

    /// Start protocol for a capture link type; unmapped types use the default.
    pub fn protocol_for_link_type(&self, link_type: u16) -> ProtocolId {
        self.link_types
            .get(link_type as usize)
            .copied()
            .flatten()
            .unwrap_or(self.default_link)
    }

    pub fn link_type_for(&self, id: ProtocolId) -> Option<u16> {
        self.scanner(id).and_then(|s| s.link_type)
    }

    pub fn default_link_protocol(&self) -> ProtocolId {
        self.default_link
    }

    pub fn flags(&self, id: ProtocolId) -> Result<ScannerFlags> {
        self.scanner(id)
            .map(|s| s.flags)
            .ok_or(Error::UnknownProtocol { id })
    }

    pub fn iter(&self) -> impl Iterator<Item = &HeaderScanner> {
        self.scanners.iter()
    }

    fn register<H: Header>(&mut self, header: H) -> Result<ProtocolId> {
        if let Some(id) = self.id_of::<H>() {
            return Ok(id);
        }

        let id = ProtocolId::from_index(self.scanners.len()).ok_or(Error::CapacityExceeded {
            what: Capacity::ProtocolIds,
            limit: MAX_ID_COUNT,
        })?;

        // Targets must exist before anything is inserted.
        for rule in header.bindings().iter().chain(header.heuristics().iter()) {
            if rule.target != id && self.scanner(rule.target).is_none() {
                return Err(Error::UnknownProtocol { id: rule.target });
            }
        }
        for link_type in header.link_types() {
            check_link_type(*link_type)?;
        }

        self.install(id, header);
        Ok(id)
    }

    /// Insert a header at `id`, which must be the next free slot.
    fn install<H: Header>(&mut self, id: ProtocolId, header: H) {
        debug_assert_eq!(id.index(), self.scanners.len());

        let bindings = header.bindings();
        let heuristics = header.heuristics();
        let flags = header.scanner_flags();
        let descriptor = HeaderDescriptor::from_header(id, header);

        debug!(
            id = id.raw(),
            name = descriptor.name,
            bindings = bindings.len(),
            heuristics = heuristics.len(),
            "registering protocol"
        );

        self.by_type.insert(descriptor.type_id, id);
        self.by_name.entry(descriptor.name).or_insert(id);
        let link_types = descriptor.link_types.clone();
        self.scanners.push(HeaderScanner::new(descriptor, flags));

        for link_type in link_types {
            if let Some(slot) = self.link_types.get_mut(link_type as usize) {
                *slot = Some(id);
                self.scanners[id.index()].link_type = Some(link_type);
            }
        }

        for rule in bindings {
            self.attach(rule.with_source(id), false);
        }
        for rule in heuristics {
            self.attach(rule.with_source(id), true);
        }
    }

    fn attach(&mut self, rule: BindingRule, heuristic: bool) {
        let Some(scanner) = self.scanners.get_mut(rule.target.index()) else {
            debug!(target_id = rule.target.raw(), "dropping rule for unregistered target");
            return;
        };
        if heuristic {
            scanner.heuristics.push(rule);
        } else {
            scanner.bindings.push(rule);
        }
    }

    fn add_binding(&mut self, rule: BindingRule) -> Result<()> {
        self.scanner_mut(rule.source)?;
        self.scanner_mut(rule.target)?;
        debug!(
            source = rule.source.raw(),
            target = rule.target.raw(),
            "adding binding rule"
        );
        self.attach(rule, false);
        Ok(())
    }

    fn add_heuristic(&mut self, rule: BindingRule) -> Result<()> {
        self.scanner_mut(rule.source)?;
        self.scanner_mut(rule.target)?;
        debug!(
            source = rule.source.raw(),
            target = rule.target.raw(),
            "adding heuristic binding"
        );
        self.attach(rule, true);
        Ok(())
    }

    fn set_flags(&mut self, id: ProtocolId, bits: ScannerFlags) -> Result<()> {
        let scanner = self.scanner_mut(id)?;
        scanner.flags.insert(bits);
        debug!(id = id.raw(), flags = ?scanner.flags, "set scanner flags");
        Ok(())
    }

    fn clear_flags(&mut self, id: ProtocolId, bits: ScannerFlags) -> Result<()> {
        let scanner = self.scanner_mut(id)?;
        scanner.flags.remove(bits);
        debug!(id = id.raw(), flags = ?scanner.flags, "cleared scanner flags");
        Ok(())
    }

    fn override_lengths(&mut self, id: ProtocolId, lengths: Segments) -> Result<()> {
        let scanner = self.scanner_mut(id)?;
        scanner.override_lengths = Some(lengths);
        scanner.flags.insert(ScannerFlags::OVERRIDE_LENGTH);
        debug!(id = id.raw(), ?lengths, "overriding segment lengths");
        Ok(())
    }

    fn map_link_type(&mut self, link_type: u16, id: ProtocolId) -> Result<()> {
        check_link_type(link_type)?;
        self.scanner_mut(id)?.link_type = Some(link_type);
        self.link_types[link_type as usize] = Some(id);
        debug!(link_type, id = id.raw(), "mapped link type");
        Ok(())
    }

    fn set_default_link_protocol(&mut self, id: ProtocolId) -> Result<()> {
        self.scanner_mut(id)?;
        self.default_link = id;
        Ok(())
    }
}

fn check_link_type(link_type: u16) -> Result<()> {
    if (link_type as usize) < MAX_LINK_TYPES {
        Ok(())
    } else {
        Err(Error::InvalidLinkType {
            link_type,
            max: MAX_LINK_TYPES,
        })
    }
}

/// Process-wide catalog of protocols, shared by reference between scanners.
///
/// ```rust
/// use pktscan_core::protocol::{ProtocolId, Registry};
///
/// let registry = Registry::new();
/// assert_eq!(registry.protocol_for_link_type(1), ProtocolId::ETHERNET);
/// assert_eq!(registry.lookup(ProtocolId::UDP).unwrap().name, "udp");
/// ```
#[derive(Debug)]
pub struct Registry {
    table: RwLock<Arc<RegistryTable>>,
}

impl Registry {
    /// Registry with the core protocols installed at their fixed ids.
    pub fn new() -> Self {
        Self {
            table: RwLock::new(Arc::new(RegistryTable::with_core())),
        }
    }

    /// The current table. Holders keep seeing it until they ask again.
    pub fn snapshot(&self) -> Arc<RegistryTable> {
        Arc::clone(&*self.table.read())
    }

    pub fn generation(&self) -> u64 {
        self.table.read().generation
    }

    pub fn len(&self) -> usize {
        self.table.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.read().is_empty()
    }

    /// Copy the table, apply `f` and publish the copy if `f` succeeds.
    fn mutate<T>(&self, f: impl FnOnce(&mut RegistryTable) -> Result<T>) -> Result<T> {
        let mut guard = self.table.write();
        let mut next = RegistryTable::clone(&**guard);
        let out = f(&mut next)?;
        next.generation = guard.generation + 1;
        *guard = Arc::new(next);
        Ok(out)
    }

    /// Register a header type, or return the id it already has.
    pub fn register<H: Header>(&self, header: H) -> Result<ProtocolId> {
        if let Some(id) = self.table.read().id_of::<H>() {
            return Ok(id);
        }
        self.mutate(|table| table.register(header))
    }

    pub fn lookup(&self, id: ProtocolId) -> Result<Arc<HeaderDescriptor>> {
        self.table.read().lookup(id)
    }

    pub fn lookup_name(&self, name: &str) -> Option<ProtocolId> {
        self.table.read().lookup_name(name)
    }

    pub fn id_of<H: Header>(&self) -> Option<ProtocolId> {
        self.table.read().id_of::<H>()
    }

    pub fn map_link_type(&self, link_type: u16, id: ProtocolId) -> Result<()> {
        self.mutate(|table| table.map_link_type(link_type, id))
    }

    pub fn protocol_for_link_type(&self, link_type: u16) -> ProtocolId {
        self.table.read().protocol_for_link_type(link_type)
    }

    pub fn link_type_for(&self, id: ProtocolId) -> Option<u16> {
        self.table.read().link_type_for(id)
    }

    /// Protocol used for link types with no mapping.
    pub fn set_default_link_protocol(&self, id: ProtocolId) -> Result<()> {
        self.mutate(|table| table.set_default_link_protocol(id))
    }

    pub fn flags(&self, id: ProtocolId) -> Result<ScannerFlags> {
        self.table.read().flags(id)
    }

    pub fn set_flags(&self, id: ProtocolId, bits: ScannerFlags) -> Result<()> {
        self.mutate(|table| table.set_flags(id, bits))
    }

    pub fn clear_flags(&self, id: ProtocolId, bits: ScannerFlags) -> Result<()> {
        self.mutate(|table| table.clear_flags(id, bits))
    }

    /// Append a rule to its target's list. Earlier rules win ties.
    pub fn add_binding(&self, rule: BindingRule) -> Result<()> {
        self.mutate(|table| table.add_binding(rule))
    }

    pub fn add_heuristic(&self, rule: BindingRule) -> Result<()> {
        self.mutate(|table| table.add_heuristic(rule))
    }

    /// Replace a protocol's length hooks with fixed segment lengths.
    pub fn override_lengths(&self, id: ProtocolId, lengths: Segments) -> Result<()> {
        self.mutate(|table| table.override_lengths(id, lengths))
    }

    /// Start a batch of mutations against the current generation.
    pub fn edit(&self) -> RegistryEdit<'_> {
        let table = RegistryTable::clone(&**self.table.read());
        RegistryEdit {
            registry: self,
            base: table.generation,
            table,
        }
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

/// A batch of registry mutations published together by [`commit`](Self::commit).
///
/// The edit works on a private copy. If another writer publishes first, the
/// commit fails with [`Error::RegistryMutationConflict`] and nothing changes.
pub struct RegistryEdit<'r> {
    registry: &'r Registry,
    base: u64,
    table: RegistryTable,
}

impl RegistryEdit<'_> {
    pub fn register<H: Header>(&mut self, header: H) -> Result<ProtocolId> {
        self.table.register(header)
    }

    pub fn add_binding(&mut self, rule: BindingRule) -> Result<&mut Self> {
        self.table.add_binding(rule)?;
        Ok(self)
    }

    pub fn add_heuristic(&mut self, rule: BindingRule) -> Result<&mut Self> {
        self.table.add_heuristic(rule)?;
        Ok(self)
    }

    pub fn set_flags(&mut self, id: ProtocolId, bits: ScannerFlags) -> Result<&mut Self> {
        self.table.set_flags(id, bits)?;
        Ok(self)
    }

    pub fn clear_flags(&mut self, id: ProtocolId, bits: ScannerFlags) -> Result<&mut Self> {
        self.table.clear_flags(id, bits)?;
        Ok(self)
    }

    pub fn override_lengths(&mut self, id: ProtocolId, lengths: Segments) -> Result<&mut Self> {
        self.table.override_lengths(id, lengths)?;
        Ok(self)
    }

    pub fn map_link_type(&mut self, link_type: u16, id: ProtocolId) -> Result<&mut Self> {
        self.table.map_link_type(link_type, id)?;
        Ok(self)
    }

    /// Publish the batch. Returns the new generation.
    pub fn commit(mut self) -> Result<u64> {
        let mut guard = self.registry.table.write();
        if guard.generation != self.base {
            debug!(
                expected = self.base,
                found = guard.generation,
                "registry edit conflicts with a newer generation"
            );
            return Err(Error::RegistryMutationConflict {
                expected: self.base,
                found: guard.generation,
            });
        }
        self.table.generation = self.base + 1;
        let generation = self.table.generation;
        *guard = Arc::new(self.table);
        Ok(generation)
    }
}
