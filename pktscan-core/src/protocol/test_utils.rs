//! Builders for test frames.
//!
//! Each builder produces one header followed by its payload, so frames are
//! assembled inside out: `EthernetBuilder::new().payload(Ipv4Builder::new()
//! .payload(UdpBuilder::new().build()).build()).build()`.

use super::{ethertype, internet_checksum, ip_protocol};

/// Builder for Ethernet II frames, optionally 802.1Q tagged.
#[derive(Debug, Clone)]
pub struct EthernetBuilder {
    src_mac: [u8; 6],
    dst_mac: [u8; 6],
    vlan_tags: Vec<u16>,
    ethertype: u16,
    payload: Vec<u8>,
}

impl Default for EthernetBuilder {
    fn default() -> Self {
        Self {
            src_mac: [0x00, 0x11, 0x22, 0x33, 0x44, 0x55],
            dst_mac: [0x66, 0x77, 0x88, 0x99, 0xaa, 0xbb],
            vlan_tags: Vec::new(),
            ethertype: ethertype::IPV4,
            payload: Vec::new(),
        }
    }
}

impl EthernetBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn src_mac(mut self, mac: [u8; 6]) -> Self {
        self.src_mac = mac;
        self
    }

    pub fn dst_mac(mut self, mac: [u8; 6]) -> Self {
        self.dst_mac = mac;
        self
    }

    pub fn ethertype(mut self, ethertype: u16) -> Self {
        self.ethertype = ethertype;
        self
    }

    pub fn ipv6(self) -> Self {
        self.ethertype(ethertype::IPV6)
    }

    pub fn arp(self) -> Self {
        self.ethertype(ethertype::ARP)
    }

    /// Add an 802.1Q tag; tags are emitted outermost first.
    pub fn vlan(mut self, vid: u16) -> Self {
        self.vlan_tags.push(vid & 0x0fff);
        self
    }

    pub fn payload(mut self, payload: Vec<u8>) -> Self {
        self.payload = payload;
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut frame = Vec::with_capacity(14 + 4 * self.vlan_tags.len() + self.payload.len());
        frame.extend_from_slice(&self.dst_mac);
        frame.extend_from_slice(&self.src_mac);
        for vid in &self.vlan_tags {
            frame.extend_from_slice(&ethertype::VLAN.to_be_bytes());
            frame.extend_from_slice(&vid.to_be_bytes());
        }
        frame.extend_from_slice(&self.ethertype.to_be_bytes());
        frame.extend_from_slice(&self.payload);
        frame
    }
}

/// Builder for IPv4 datagrams with a correct header checksum.
#[derive(Debug, Clone)]
pub struct Ipv4Builder {
    identification: u16,
    flags_fragment: u16,
    ttl: u8,
    protocol: u8,
    src_ip: [u8; 4],
    dst_ip: [u8; 4],
    total_length: Option<u16>,
    payload: Vec<u8>,
}

impl Default for Ipv4Builder {
    fn default() -> Self {
        Self {
            identification: 0x0001,
            flags_fragment: 0x0000,
            ttl: 64,
            protocol: ip_protocol::UDP,
            src_ip: [192, 168, 1, 1],
            dst_ip: [192, 168, 1, 2],
            total_length: None,
            payload: Vec::new(),
        }
    }
}

impl Ipv4Builder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn protocol(mut self, protocol: u8) -> Self {
        self.protocol = protocol;
        self
    }

    pub fn tcp(self) -> Self {
        self.protocol(ip_protocol::TCP)
    }

    pub fn icmp(self) -> Self {
        self.protocol(ip_protocol::ICMP)
    }

    pub fn src_ip(mut self, ip: [u8; 4]) -> Self {
        self.src_ip = ip;
        self
    }

    pub fn dst_ip(mut self, ip: [u8; 4]) -> Self {
        self.dst_ip = ip;
        self
    }

    pub fn more_fragments(mut self) -> Self {
        self.flags_fragment |= 0x2000;
        self
    }

    /// Fragment offset in 8-byte units.
    pub fn fragment_offset(mut self, units: u16) -> Self {
        self.flags_fragment = (self.flags_fragment & 0xe000) | (units & 0x1fff);
        self
    }

    /// Claim a total length other than the real one.
    pub fn total_length(mut self, len: u16) -> Self {
        self.total_length = Some(len);
        self
    }

    pub fn payload(mut self, payload: Vec<u8>) -> Self {
        self.payload = payload;
        self
    }

    pub fn build(self) -> Vec<u8> {
        let total_length = self
            .total_length
            .unwrap_or(20 + self.payload.len() as u16);
        let mut packet = Vec::with_capacity(20 + self.payload.len());

        packet.push(0x45); // Version 4, IHL 5
        packet.push(0x00);
        packet.extend_from_slice(&total_length.to_be_bytes());
        packet.extend_from_slice(&self.identification.to_be_bytes());
        packet.extend_from_slice(&self.flags_fragment.to_be_bytes());
        packet.push(self.ttl);
        packet.push(self.protocol);
        packet.extend_from_slice(&[0x00, 0x00]);
        packet.extend_from_slice(&self.src_ip);
        packet.extend_from_slice(&self.dst_ip);

        let checksum = internet_checksum(&[&packet]);
        packet[10..12].copy_from_slice(&checksum.to_be_bytes());

        packet.extend_from_slice(&self.payload);
        packet
    }
}

/// Builder for TCP segments (checksum left zero).
#[derive(Debug, Clone)]
pub struct TcpBuilder {
    src_port: u16,
    dst_port: u16,
    seq: u32,
    options: Vec<u8>,
    flags: u8,
    payload: Vec<u8>,
}

impl Default for TcpBuilder {
    fn default() -> Self {
        Self {
            src_port: 40000,
            dst_port: 80,
            seq: 1,
            options: Vec::new(),
            flags: 0x18, // PSH, ACK
            payload: Vec::new(),
        }
    }
}

impl TcpBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn src_port(mut self, port: u16) -> Self {
        self.src_port = port;
        self
    }

    pub fn dst_port(mut self, port: u16) -> Self {
        self.dst_port = port;
        self
    }

    pub fn ports(self, src: u16, dst: u16) -> Self {
        self.src_port(src).dst_port(dst)
    }

    pub fn syn(mut self) -> Self {
        self.flags = 0x02;
        self
    }

    /// Options, padded with NOPs to a multiple of four bytes.
    pub fn options(mut self, options: &[u8]) -> Self {
        self.options = options.to_vec();
        while self.options.len() % 4 != 0 {
            self.options.push(0x01);
        }
        self
    }

    pub fn payload(mut self, payload: Vec<u8>) -> Self {
        self.payload = payload;
        self
    }

    pub fn build(self) -> Vec<u8> {
        let data_offset = ((20 + self.options.len()) / 4) as u8;
        let mut segment = Vec::with_capacity(20 + self.options.len() + self.payload.len());

        segment.extend_from_slice(&self.src_port.to_be_bytes());
        segment.extend_from_slice(&self.dst_port.to_be_bytes());
        segment.extend_from_slice(&self.seq.to_be_bytes());
        segment.extend_from_slice(&0u32.to_be_bytes());
        segment.push(data_offset << 4);
        segment.push(self.flags);
        segment.extend_from_slice(&0xffffu16.to_be_bytes());
        segment.extend_from_slice(&[0x00, 0x00]); // Checksum
        segment.extend_from_slice(&[0x00, 0x00]); // Urgent pointer
        segment.extend_from_slice(&self.options);
        segment.extend_from_slice(&self.payload);
        segment
    }
}

/// Builder for UDP datagrams (checksum left zero).
#[derive(Debug, Clone)]
pub struct UdpBuilder {
    src_port: u16,
    dst_port: u16,
    payload: Vec<u8>,
}

impl Default for UdpBuilder {
    fn default() -> Self {
        Self {
            src_port: 12345,
            dst_port: 53,
            payload: Vec::new(),
        }
    }
}

impl UdpBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ports(mut self, src: u16, dst: u16) -> Self {
        self.src_port = src;
        self.dst_port = dst;
        self
    }

    pub fn payload(mut self, payload: Vec<u8>) -> Self {
        self.payload = payload;
        self
    }

    pub fn build(self) -> Vec<u8> {
        let length = 8 + self.payload.len() as u16;
        let mut datagram = Vec::with_capacity(8 + self.payload.len());

        datagram.extend_from_slice(&self.src_port.to_be_bytes());
        datagram.extend_from_slice(&self.dst_port.to_be_bytes());
        datagram.extend_from_slice(&length.to_be_bytes());
        datagram.extend_from_slice(&[0x00, 0x00]);
        datagram.extend_from_slice(&self.payload);
        datagram
    }
}

/// ICMP echo request with a correct checksum.
pub fn icmp_echo(payload: &[u8]) -> Vec<u8> {
    let mut message = vec![8, 0, 0, 0, 0x00, 0x01, 0x00, 0x01];
    let checksum = internet_checksum(&[&message, payload]);
    message[2..4].copy_from_slice(&checksum.to_be_bytes());
    message.extend_from_slice(payload);
    message
}

/// Ethernet / IPv4 / UDP frame from `src` to `dst`.
pub fn udp_frame(src: ([u8; 4], u16), dst: ([u8; 4], u16), payload: &[u8]) -> Vec<u8> {
    let udp = UdpBuilder::new()
        .ports(src.1, dst.1)
        .payload(payload.to_vec())
        .build();
    let ip = Ipv4Builder::new()
        .src_ip(src.0)
        .dst_ip(dst.0)
        .payload(udp)
        .build();
    EthernetBuilder::new().payload(ip).build()
}

/// Ethernet / IPv4 / TCP frame from `src` to `dst`.
pub fn tcp_frame(src: ([u8; 4], u16), dst: ([u8; 4], u16), payload: &[u8]) -> Vec<u8> {
    let tcp = TcpBuilder::new()
        .ports(src.1, dst.1)
        .payload(payload.to_vec())
        .build();
    let ip = Ipv4Builder::new()
        .tcp()
        .src_ip(src.0)
        .dst_ip(dst.0)
        .payload(tcp)
        .build();
    EthernetBuilder::new().payload(ip).build()
}
