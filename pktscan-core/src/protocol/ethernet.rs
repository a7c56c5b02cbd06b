//! Ethernet II / IEEE 802.3 framing.

use etherparse::Ethernet2HeaderSlice;

use crate::flow::{fold, FlowKeyBuilder};
use crate::packet::link_type;
use crate::schema::{FieldDescriptor, FieldKind};

use super::{read_u16, Header, ProtocolId};

/// Well-known EtherType values (IEEE 802).
pub mod ethertype {
    pub const IPV4: u16 = 0x0800;
    pub const ARP: u16 = 0x0806;
    pub const VLAN: u16 = 0x8100;
    pub const IPV6: u16 = 0x86DD;
    pub const QINQ: u16 = 0x88A8;

    /// Values below this are 802.3 length fields, not types
    pub const MIN_TYPE: u16 = 0x0600;
}

const HEADER_LEN: usize = 14;

/// Next protocol for an EtherType, shared by every header that carries one.
pub fn by_ethertype(value: u16) -> Option<ProtocolId> {
    match value {
        ethertype::IPV4 => Some(ProtocolId::IPV4),
        ethertype::IPV6 => Some(ProtocolId::IPV6),
        ethertype::ARP => Some(ProtocolId::ARP),
        ethertype::VLAN | ethertype::QINQ => Some(ProtocolId::VLAN),
        _ => None,
    }
}

/// Ethernet II, with 802.3 length-framed frames handed to LLC.
#[derive(Debug, Clone, Copy)]
pub struct EthernetHeader;

impl EthernetHeader {
    /// 802.3 length field, if the type field holds one.
    fn length_field(data: &[u8], offset: usize) -> Option<usize> {
        let value = read_u16(data, offset + 12)?;
        (value < ethertype::MIN_TYPE).then_some(value as usize)
    }
}

impl Header for EthernetHeader {
    fn name(&self) -> &'static str {
        "ethernet"
    }

    fn display_name(&self) -> &'static str {
        "Ethernet II"
    }

    fn fields(&self) -> Vec<FieldDescriptor> {
        vec![
            FieldDescriptor::mac("dst_mac", 0),
            FieldDescriptor::mac("src_mac", 6),
            FieldDescriptor::new("ethertype", FieldKind::UInt16).at(12),
        ]
    }

    fn link_types(&self) -> &'static [u16] {
        &[link_type::ETHERNET]
    }

    fn header_length(&self, data: &[u8], offset: usize) -> usize {
        match data.get(offset..).map(Ethernet2HeaderSlice::from_slice) {
            Some(Ok(eth)) => eth.slice().len(),
            _ => 0,
        }
    }

    fn payload_length(&self, data: &[u8], offset: usize) -> usize {
        Self::length_field(data, offset).unwrap_or(0)
    }

    /// Padding after an 802.3 length-framed payload.
    fn postfix_length(&self, data: &[u8], offset: usize) -> usize {
        match Self::length_field(data, offset) {
            Some(len) => data.len().saturating_sub(offset + HEADER_LEN + len),
            None => 0,
        }
    }

    fn next_header(&self, header: &[u8]) -> Option<ProtocolId> {
        let eth = Ethernet2HeaderSlice::from_slice(header).ok()?;
        let value = eth.ether_type().0;
        if value < ethertype::MIN_TYPE {
            return Some(ProtocolId::LLC);
        }
        by_ethertype(value)
    }

    fn flow_key(&self, header: &[u8], key: &mut FlowKeyBuilder<'_>) {
        if let Ok(eth) = Ethernet2HeaderSlice::from_slice(header) {
            key.pair(fold(&eth.source()), fold(&eth.destination()));
        }
    }
}
