//! Shared helpers for integration tests.

#![allow(dead_code)]

use pktscan::protocol::internet_checksum;

/// Install a test subscriber once; `RUST_LOG=pktscan_core=trace` shows the
/// scan loop.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub const CLIENT: ([u8; 4], u16) = ([192, 168, 1, 100], 12345);
pub const DNS_SERVER: ([u8; 4], u16) = ([8, 8, 8, 8], 53);
pub const WEB_SERVER: ([u8; 4], u16) = ([93, 184, 216, 34], 80);

pub fn ethernet(ethertype: u16, payload: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(14 + payload.len());
    frame.extend_from_slice(&[0x00, 0x1b, 0x21, 0x0a, 0x0b, 0x0c]); // Dst MAC
    frame.extend_from_slice(&[0x00, 0x1b, 0x21, 0x01, 0x02, 0x03]); // Src MAC
    frame.extend_from_slice(&ethertype.to_be_bytes());
    frame.extend_from_slice(payload);
    frame
}

pub fn ipv4(protocol: u8, src: [u8; 4], dst: [u8; 4], payload: &[u8]) -> Vec<u8> {
    let total = (20 + payload.len()) as u16;
    let mut packet = vec![
        0x45, // Version 4, IHL 5
        0x00, // DSCP + ECN
    ];
    packet.extend_from_slice(&total.to_be_bytes());
    packet.extend_from_slice(&[0x12, 0x34]); // Identification
    packet.extend_from_slice(&[0x40, 0x00]); // Don't fragment
    packet.push(64); // TTL
    packet.push(protocol);
    packet.extend_from_slice(&[0x00, 0x00]); // Checksum
    packet.extend_from_slice(&src);
    packet.extend_from_slice(&dst);
    let checksum = internet_checksum(&[&packet]);
    packet[10..12].copy_from_slice(&checksum.to_be_bytes());
    packet.extend_from_slice(payload);
    packet
}

pub fn udp(src_port: u16, dst_port: u16, payload: &[u8]) -> Vec<u8> {
    let mut datagram = Vec::with_capacity(8 + payload.len());
    datagram.extend_from_slice(&src_port.to_be_bytes());
    datagram.extend_from_slice(&dst_port.to_be_bytes());
    datagram.extend_from_slice(&((8 + payload.len()) as u16).to_be_bytes());
    datagram.extend_from_slice(&[0x00, 0x00]); // Checksum
    datagram.extend_from_slice(payload);
    datagram
}

pub fn tcp(src_port: u16, dst_port: u16, payload: &[u8]) -> Vec<u8> {
    let mut segment = Vec::with_capacity(20 + payload.len());
    segment.extend_from_slice(&src_port.to_be_bytes());
    segment.extend_from_slice(&dst_port.to_be_bytes());
    segment.extend_from_slice(&[0x00, 0x00, 0x00, 0x01]); // Seq
    segment.extend_from_slice(&[0x00, 0x00, 0x00, 0x00]); // Ack
    segment.push(0x50); // Data offset: 5
    segment.push(0x18); // PSH, ACK
    segment.extend_from_slice(&[0xff, 0xff]); // Window
    segment.extend_from_slice(&[0x00, 0x00]); // Checksum
    segment.extend_from_slice(&[0x00, 0x00]); // Urgent pointer
    segment.extend_from_slice(payload);
    segment
}

/// Ethernet / IPv4 / UDP from `src` to `dst`.
pub fn udp_frame(src: ([u8; 4], u16), dst: ([u8; 4], u16), payload: &[u8]) -> Vec<u8> {
    ethernet(0x0800, &ipv4(17, src.0, dst.0, &udp(src.1, dst.1, payload)))
}

/// Ethernet / IPv4 / TCP from `src` to `dst`.
pub fn tcp_frame(src: ([u8; 4], u16), dst: ([u8; 4], u16), payload: &[u8]) -> Vec<u8> {
    ethernet(0x0800, &ipv4(6, src.0, dst.0, &tcp(src.1, dst.1, payload)))
}
