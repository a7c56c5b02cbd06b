//! Flow classification on top of scanned packets.
//!
//! Every header may contribute (forward, reverse) value pairs to a packet's
//! [`FlowKey`]. Keys whose pairs are all reversible group both directions of
//! a conversation into one [`Flow`].

mod key;
mod table;

pub use key::{fold, Direction, FlowKey, FlowKeyBuilder, FlowPair, MAX_FLOW_PAIRS};
pub use table::{Flow, FlowTable, FlowTableConfig, FlowTableStats};

use crate::protocol::{ProtocolSet, RegistryTable};
use crate::scan::PacketState;

/// Build the flow key for a scanned packet.
///
/// Only the first instance of each protocol contributes, so the outer
/// addresses of a tunnel define the flow.
pub fn compute_flow_key(table: &RegistryTable, state: &PacketState, data: &[u8]) -> FlowKey {
    let mut key = FlowKey::new();
    let mut seen = ProtocolSet::new();
    for record in state {
        if record.id.is_payload() || !seen.insert(record.id) {
            continue;
        }
        if let Some(scanner) = table.scanner(record.id) {
            let mut builder = key.builder(record.id);
            scanner
                .hooks()
                .flow_key(record.header_bytes(data), &mut builder);
        }
    }
    key
}
