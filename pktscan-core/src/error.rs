//! Error types for pktscan-core.
//!
//! Only programmer misuse is reported through [`enum@Error`]: unknown ids,
//! exhausted capacities and conflicting registry edits. Malformed or
//! truncated packets are never errors; the scan loop encodes them as flags on
//! the [`PacketState`](crate::scan::PacketState) and its records.

use std::fmt;

use thiserror::Error;

use crate::protocol::ProtocolId;

/// Main error type for pktscan-core operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Lookup of an id that was never registered
    #[error("unknown protocol id {id}")]
    UnknownProtocol { id: ProtocolId },

    /// A fixed-size table is full
    #[error("{what} capacity exceeded (limit {limit})")]
    CapacityExceeded { what: Capacity, limit: usize },

    /// A batched registry edit lost a race against another writer
    #[error("registry changed during edit (opened at generation {expected}, now {found})")]
    RegistryMutationConflict { expected: u64, found: u64 },

    /// Link type outside the mappable range
    #[error("link type {link_type} out of range (max {max})")]
    InvalidLinkType { link_type: u16, max: usize },

    /// A packet was filed under a flow whose key it does not match
    #[error("packet key does not match flow {key}")]
    FlowDirection { key: String },
}

/// Which bounded table an [`Error::CapacityExceeded`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capacity {
    /// Registry id space
    ProtocolIds,
    /// Header records in one packet
    HeaderRecords,
}

impl fmt::Display for Capacity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capacity::ProtocolIds => write!(f, "protocol id"),
            Capacity::HeaderRecords => write!(f, "header record"),
        }
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
