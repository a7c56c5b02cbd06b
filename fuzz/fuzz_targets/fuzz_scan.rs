//! Fuzz target for the scan loop.
//!
//! Every buffer must scan to completion under each start protocol, with no
//! record reaching past the captured bytes and records laid end to end.

#![no_main]

use std::sync::Arc;

use libfuzzer_sys::fuzz_target;
use pktscan_core::link_type;
use pktscan_core::{PacketRef, Registry, Scanner, MAX_HEADERS};

const LINK_TYPES: &[u16] = &[
    link_type::ETHERNET,
    link_type::LINUX_SLL,
    link_type::NULL,
    link_type::IPV4,
    link_type::IPV6,
    link_type::PPP,
];

fuzz_target!(|data: &[u8]| {
    let mut scanner = Scanner::new(Arc::new(Registry::new()));

    for &lt in LINK_TYPES {
        let state = scanner.scan(&PacketRef::new(0, lt, data));
        assert!(state.len() <= MAX_HEADERS);
        for record in &state {
            assert!(record.offset + record.length <= data.len());
        }
        for pair in state.headers().windows(2) {
            assert_eq!(pair[0].next_offset(), pair[1].start());
        }
        scanner.recycle(state);
    }
});
