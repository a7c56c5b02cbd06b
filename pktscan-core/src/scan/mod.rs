//! Scanning packets into header chains.
//!
//! A [`Scanner`] holds a snapshot of the [`Registry`] and drives the scan
//! loop for one packet at a time. Threads each create their own scanner over
//! a shared `Arc<Registry>`:
//!
//! ```rust
//! use std::sync::Arc;
//! use pktscan_core::prelude::*;
//!
//! let registry = Arc::new(Registry::new());
//! let mut scanner = Scanner::new(Arc::clone(&registry));
//!
//! let frame = [0u8; 10];
//! let state = scanner.scan(&PacketRef::ethernet(1, &frame));
//! // Too short for Ethernet: everything is payload
//! assert_eq!(state.len(), 1);
//! assert_eq!(state.header(0).unwrap().id, ProtocolId::PAYLOAD);
//! ```

mod cursor;
mod state;

pub use state::{HeaderFlags, HeaderRecord, PacketFlags, PacketState, MAX_HEADERS};

use std::sync::Arc;

use tracing::debug;

use crate::packet::PacketRef;
use crate::protocol::{ProtocolId, Registry, RegistryTable};

use cursor::Cursor;

/// Packet states kept for reuse by one scanner.
const POOL_LIMIT: usize = 32;

/// Configuration for scanning.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Header records per packet, payload record included (capped at 64)
    pub max_headers: usize,
    /// Skip binding rules whose dependencies are not yet in the packet
    pub enforce_binding_dependencies: bool,
    /// Build a flow key for every scanned packet
    pub compute_flow_key: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            max_headers: MAX_HEADERS,
            enforce_binding_dependencies: true,
            compute_flow_key: true,
        }
    }
}

/// Long-lived scanning context for one thread.
///
/// The registry snapshot is refreshed only by [`reload`](Self::reload), so a
/// scanner sees one consistent registry generation between reloads.
#[derive(Debug)]
pub struct Scanner {
    registry: Arc<Registry>,
    table: Arc<RegistryTable>,
    config: ScanConfig,
    pool: Vec<PacketState>,
}

impl Scanner {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self::with_config(registry, ScanConfig::default())
    }

    pub fn with_config(registry: Arc<Registry>, config: ScanConfig) -> Self {
        let table = registry.snapshot();
        Self {
            registry,
            table,
            config,
            pool: Vec::new(),
        }
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// The registry generation this scanner is using.
    pub fn table(&self) -> &RegistryTable {
        &self.table
    }

    /// Pick up registry changes made since the last reload.
    pub fn reload(&mut self) {
        self.table = self.registry.snapshot();
        debug!(generation = self.table.generation(), "scanner reloaded");
    }

    /// The registry has moved on since the last reload.
    pub fn is_stale(&self) -> bool {
        self.registry.generation() != self.table.generation()
    }

    /// Scan a captured packet, starting from its link type's protocol.
    pub fn scan(&mut self, packet: &PacketRef<'_>) -> PacketState {
        let start = self.table.protocol_for_link_type(packet.link_type);
        self.scan_from(packet.bytes(), packet.wire_len(), start)
    }

    /// Scan `data` starting at protocol `start`.
    pub fn scan_from(&mut self, data: &[u8], wire_len: usize, start: ProtocolId) -> PacketState {
        let mut state = self.pool.pop().unwrap_or_default();
        self.scan_into(&mut state, data, wire_len, start);
        state
    }

    /// Scan into an existing state, replacing its contents.
    pub fn scan_into(
        &self,
        state: &mut PacketState,
        data: &[u8],
        wire_len: usize,
        start: ProtocolId,
    ) {
        Cursor::new(&self.table, &self.config, data).run(state, wire_len, start);
    }

    /// Hand a state back for reuse by later scans.
    pub fn recycle(&mut self, state: PacketState) {
        if self.pool.len() < POOL_LIMIT {
            self.pool.push(state);
        }
    }
}
