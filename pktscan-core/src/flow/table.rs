//! Flow table: packets grouped by flow key, split by direction.

use std::collections::HashMap;

use tracing::debug;

use crate::error::{Error, Result};
use crate::packet::{PacketRef, RawPacket};
use crate::protocol::RegistryTable;
use crate::scan::PacketState;

use super::{compute_flow_key, Direction, FlowKey};

/// Bounds for a [`FlowTable`].
#[derive(Debug, Clone)]
pub struct FlowTableConfig {
    /// Flows kept before the least recently used ones are evicted (0 = no limit)
    pub max_flows: usize,
    /// Packets stored per flow; later packets are counted but not kept (0 = no limit)
    pub max_packets_per_flow: usize,
}

impl Default for FlowTableConfig {
    fn default() -> Self {
        Self {
            max_flows: 65_536,
            max_packets_per_flow: 10_000,
        }
    }
}

impl FlowTableConfig {
    pub fn unbounded() -> Self {
        Self {
            max_flows: 0,
            max_packets_per_flow: 0,
        }
    }
}

/// Flows kept after an eviction pass: 7/8 of the limit, and at least one
/// below it.
fn low_water_mark(max_flows: usize) -> usize {
    (max_flows - max_flows / 8).min(max_flows - 1)
}

/// Table statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlowTableStats {
    pub packets: u64,
    pub flows_created: u64,
    pub evictions: u64,
    /// Packets counted but not stored because their flow was full
    pub dropped: u64,
}

/// One conversation.
#[derive(Debug, Clone)]
pub struct Flow {
    key: FlowKey,
    all: Vec<RawPacket>,
    forward: Vec<RawPacket>,
    reverse: Vec<RawPacket>,
    count: u64,
    dropped: u64,
    last_seen: u64,
}

impl Flow {
    pub fn new(key: FlowKey) -> Self {
        Self {
            key,
            all: Vec::new(),
            forward: Vec::new(),
            reverse: Vec::new(),
            count: 0,
            dropped: 0,
            last_seen: 0,
        }
    }

    pub fn key(&self) -> &FlowKey {
        &self.key
    }

    pub fn is_reversible(&self) -> bool {
        self.key.is_reversible()
    }

    /// File `packet` under this flow. Returns [`Direction::Unrelated`] and
    /// stores nothing if `key` does not belong here.
    ///
    /// `limit` caps stored packets (0 = no limit).
    pub fn add(&mut self, key: &FlowKey, packet: RawPacket, limit: usize) -> Direction {
        let direction = key.matches(&self.key);
        if !direction.is_match() {
            return direction;
        }

        self.count += 1;
        if limit > 0 && self.all.len() >= limit {
            self.dropped += 1;
            return direction;
        }

        if self.is_reversible() {
            match direction {
                Direction::Forward => self.forward.push(packet.clone()),
                Direction::Reverse => self.reverse.push(packet.clone()),
                Direction::Unrelated => {}
            }
        }
        self.all.push(packet);
        direction
    }

    pub fn all(&self) -> &[RawPacket] {
        &self.all
    }

    /// Packets in the creating direction; every packet if not reversible.
    pub fn forward(&self) -> &[RawPacket] {
        if self.is_reversible() {
            &self.forward
        } else {
            &self.all
        }
    }

    /// Packets in the opposite direction; every packet if not reversible.
    pub fn reverse(&self) -> &[RawPacket] {
        if self.is_reversible() {
            &self.reverse
        } else {
            &self.all
        }
    }

    /// Packets seen, including ones not stored.
    pub fn packet_count(&self) -> u64 {
        self.count
    }

    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

/// Hash table of flows keyed by [`FlowKey`].
///
/// Single writer: share it across threads behind a mutex.
#[derive(Debug)]
pub struct FlowTable {
    flows: HashMap<FlowKey, Flow>,
    config: FlowTableConfig,
    /// Monotonic access counter for LRU ordering
    clock: u64,
    stats: FlowTableStats,
}

impl FlowTable {
    pub fn new(config: FlowTableConfig) -> Self {
        Self {
            flows: HashMap::with_capacity(config.max_flows.min(4096)),
            config,
            clock: 0,
            stats: FlowTableStats::default(),
        }
    }

    /// File a scanned packet under its flow, creating the flow if needed.
    ///
    /// Uses the key the scan loop left in `state`; scans run with
    /// `compute_flow_key` off get their key built here from `table`.
    pub fn add(
        &mut self,
        table: &RegistryTable,
        packet: &PacketRef<'_>,
        state: &PacketState,
    ) -> Result<Direction> {
        if state.flow_key().is_empty() && !state.is_empty() {
            let key = compute_flow_key(table, state, packet.bytes());
            return self.add_with_key(&key, packet.to_raw());
        }
        self.add_with_key(state.flow_key(), packet.to_raw())
    }

    /// File an owned packet under `key`.
    pub fn add_with_key(&mut self, key: &FlowKey, packet: RawPacket) -> Result<Direction> {
        self.clock += 1;
        self.stats.packets += 1;

        if !self.flows.contains_key(key) {
            let max = self.config.max_flows;
            if max > 0 && self.flows.len() >= max {
                self.evict_lru(low_water_mark(max));
            }
            self.stats.flows_created += 1;
            self.flows.insert(key.clone(), Flow::new(key.clone()));
        }

        let limit = self.config.max_packets_per_flow;
        let flow = self.flows.get_mut(key).ok_or_else(|| Error::FlowDirection {
            key: key.to_string(),
        })?;
        flow.last_seen = self.clock;
        let dropped = flow.dropped;
        let direction = flow.add(key, packet, limit);
        if !direction.is_match() {
            return Err(Error::FlowDirection {
                key: key.to_string(),
            });
        }
        if flow.dropped > dropped {
            self.stats.dropped += 1;
        }
        Ok(direction)
    }

    /// Evict least recently used flows until at most `target_size` remain.
    fn evict_lru(&mut self, target_size: usize) {
        if self.flows.len() <= target_size {
            return;
        }
        let to_remove = self.flows.len() - target_size;

        let mut by_age: Vec<_> = self
            .flows
            .iter()
            .map(|(key, flow)| (flow.last_seen, key.clone()))
            .collect();
        by_age.sort_unstable_by_key(|(last_seen, _)| *last_seen);

        for (_, key) in by_age.into_iter().take(to_remove) {
            self.flows.remove(&key);
        }
        self.stats.evictions += to_remove as u64;
        debug!(
            evicted = to_remove,
            remaining = self.flows.len(),
            "evicted least recently used flows"
        );
    }

    pub fn get(&self, key: &FlowKey) -> Option<&Flow> {
        self.flows.get(key)
    }

    pub fn remove(&mut self, key: &FlowKey) -> Option<Flow> {
        self.flows.remove(key)
    }

    pub fn len(&self) -> usize {
        self.flows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flows.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Flow> {
        self.flows.values()
    }

    pub fn clear(&mut self) {
        self.flows.clear();
    }

    pub fn stats(&self) -> &FlowTableStats {
        &self.stats
    }

    pub fn config(&self) -> &FlowTableConfig {
        &self.config
    }
}

impl Default for FlowTable {
    fn default() -> Self {
        Self::new(FlowTableConfig::default())
    }
}
