//! IPv4 protocol - RFC 791

use crate::{Error, Result};
use std::net::Ipv4Addr;

/// Minimum IPv4 header size (without options)
pub const MIN_HEADER_SIZE: usize = 20;

/// IPv4 protocol numbers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Protocol {
    Tcp = 6,
    Udp = 17,
}

/// Parsed IPv4 header (zero-copy reference)
#[derive(Debug)]
pub struct Ipv4Header<'a> {
    buffer: &'a [u8],
    header_len: usize,
}

impl<'a> Ipv4Header<'a> {
    pub fn parse(buffer: &'a [u8]) -> Result<Self> {
        if buffer.len() < MIN_HEADER_SIZE {
            return Err(Error::Parse("IPv4 header too short".into()));
        }

        if buffer[0] >> 4 != 4 {
            return Err(Error::Parse("not an IPv4 packet".into()));
        }

        let header_len = ((buffer[0] & 0x0F) as usize) * 4;
        if header_len < MIN_HEADER_SIZE {
            return Err(Error::Parse("IPv4 IHL below minimum".into()));
        }
        if buffer.len() < header_len {
            return Err(Error::Parse("IPv4 header truncated".into()));
        }

        Ok(Self { buffer, header_len })
    }

    pub fn total_length(&self) -> u16 {
        u16::from_be_bytes([self.buffer[2], self.buffer[3]])
    }

    pub fn ttl(&self) -> u8 {
        self.buffer[8]
    }

    pub fn protocol(&self) -> u8 {
        self.buffer[9]
    }

    pub fn src_addr(&self) -> Ipv4Addr {
        Ipv4Addr::new(
            self.buffer[12],
            self.buffer[13],
            self.buffer[14],
            self.buffer[15],
        )
    }

    pub fn dst_addr(&self) -> Ipv4Addr {
        Ipv4Addr::new(
            self.buffer[16],
            self.buffer[17],
            self.buffer[18],
            self.buffer[19],
        )
    }

    pub fn header_len(&self) -> usize {
        self.header_len
    }

    /// Validate header checksum
    pub fn validate_checksum(&self) -> bool {
        checksum(&self.buffer[..self.header_len]) == 0
    }

    /// Raw header bytes, options included
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer[..self.header_len]
    }

    /// Payload bounded by the total length field.
    ///
    /// Link-layer padding past `total_length` is excluded. A total length
    /// larger than the captured buffer is clamped to what was captured.
    pub fn payload(&self) -> &[u8] {
        let end = (self.total_length() as usize)
            .max(self.header_len)
            .min(self.buffer.len());
        &self.buffer[self.header_len..end]
    }
}

/// Calculate IPv4 header checksum
pub fn checksum(header: &[u8]) -> u16 {
    let mut sum: u32 = 0;

    for chunk in header.chunks(2) {
        let word = match chunk {
            [hi, lo] => u16::from_be_bytes([*hi, *lo]),
            [hi] => u16::from_be_bytes([*hi, 0]),
            _ => 0,
        };
        sum = sum.wrapping_add(word as u32);
    }

    // Fold 32-bit sum to 16 bits
    while sum >> 16 != 0 {
        sum = (sum & 0xFFFF) + (sum >> 16);
    }

    !(sum as u16)
}

/// Owned IPv4 header for in-place rewriting (TTL, length, checksum)
#[derive(Debug, Clone)]
pub struct Ipv4Packet {
    header: Vec<u8>,
}

impl Ipv4Packet {
    /// Copy the header of a parsed packet
    pub fn from_header(header: &Ipv4Header<'_>) -> Self {
        Self {
            header: header.as_bytes().to_vec(),
        }
    }

    pub fn ttl(&self) -> u8 {
        self.header[8]
    }

    /// Decrement TTL by one. Returns false if TTL is already 0.
    pub fn decrement_ttl(&mut self) -> bool {
        match self.header[8].checked_sub(1) {
            Some(ttl) => {
                self.header[8] = ttl;
                true
            }
            None => false,
        }
    }

    /// Set total length to header plus `payload_len`
    pub fn set_payload_len(&mut self, payload_len: usize) {
        let total = (self.header.len() + payload_len) as u16;
        self.header[2..4].copy_from_slice(&total.to_be_bytes());
    }

    pub fn total_length(&self) -> u16 {
        u16::from_be_bytes([self.header[2], self.header[3]])
    }

    /// Recalculate and update header checksum
    pub fn update_checksum(&mut self) {
        self.header[10] = 0;
        self.header[11] = 0;

        let sum = checksum(&self.header);
        self.header[10..12].copy_from_slice(&sum.to_be_bytes());
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.header
    }
}

/// Builder for constructing IPv4 packets
#[derive(Debug, Clone)]
pub struct Ipv4Builder {
    ttl: u8,
    protocol: u8,
    src_addr: Ipv4Addr,
    dst_addr: Ipv4Addr,
    payload: Vec<u8>,
}

impl Ipv4Builder {
    pub fn new() -> Self {
        Self {
            ttl: 64,
            protocol: 0,
            src_addr: Ipv4Addr::UNSPECIFIED,
            dst_addr: Ipv4Addr::UNSPECIFIED,
            payload: Vec::new(),
        }
    }

    pub fn ttl(mut self, ttl: u8) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn protocol(mut self, protocol: u8) -> Self {
        self.protocol = protocol;
        self
    }

    pub fn src_addr(mut self, addr: Ipv4Addr) -> Self {
        self.src_addr = addr;
        self
    }

    pub fn dst_addr(mut self, addr: Ipv4Addr) -> Self {
        self.dst_addr = addr;
        self
    }

    pub fn payload(mut self, payload: &[u8]) -> Self {
        self.payload = payload.to_vec();
        self
    }

    pub fn build(self) -> Vec<u8> {
        let total_length = (MIN_HEADER_SIZE + self.payload.len()) as u16;
        let mut buffer = vec![0u8; MIN_HEADER_SIZE];

        // Version (4) + IHL (5)
        buffer[0] = 0x45;
        buffer[2..4].copy_from_slice(&total_length.to_be_bytes());
        // DF set, no fragment offset
        buffer[6] = 0x40;
        buffer[8] = self.ttl;
        buffer[9] = self.protocol;
        buffer[12..16].copy_from_slice(&self.src_addr.octets());
        buffer[16..20].copy_from_slice(&self.dst_addr.octets());

        let sum = checksum(&buffer);
        buffer[10..12].copy_from_slice(&sum.to_be_bytes());

        buffer.extend_from_slice(&self.payload);
        buffer
    }
}

impl Default for Ipv4Builder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_packet(ttl: u8, payload: &[u8]) -> Vec<u8> {
        Ipv4Builder::new()
            .src_addr(Ipv4Addr::new(10, 0, 0, 1))
            .dst_addr(Ipv4Addr::new(10, 0, 0, 3))
            .ttl(ttl)
            .protocol(Protocol::Udp as u8)
            .payload(payload)
            .build()
    }

    #[test]
    fn test_parse_built_packet() {
        let data = make_packet(64, &[1, 2, 3, 4]);
        let hdr = Ipv4Header::parse(&data).unwrap();

        assert_eq!(hdr.header_len(), 20);
        assert_eq!(hdr.total_length(), 24);
        assert_eq!(hdr.ttl(), 64);
        assert_eq!(hdr.protocol(), 17);
        assert_eq!(hdr.src_addr(), Ipv4Addr::new(10, 0, 0, 1));
        assert_eq!(hdr.dst_addr(), Ipv4Addr::new(10, 0, 0, 3));
        assert_eq!(hdr.payload(), &[1, 2, 3, 4]);
        assert!(hdr.validate_checksum());
    }

    #[test]
    fn test_parse_rejects_bad_headers() {
        assert!(Ipv4Header::parse(&[0u8; 19]).is_err());

        let mut data = make_packet(64, &[]);
        data[0] = 0x65;
        assert!(Ipv4Header::parse(&data).is_err());

        data[0] = 0x4F; // IHL=15, 60 bytes
        assert!(Ipv4Header::parse(&data).is_err());

        data[0] = 0x44; // IHL=4, below minimum
        assert!(Ipv4Header::parse(&data).is_err());
    }

    #[test]
    fn test_payload_excludes_trailing_padding() {
        let mut data = make_packet(64, &[0xaa, 0xbb]);
        data.extend_from_slice(&[0u8; 10]);

        let hdr = Ipv4Header::parse(&data).unwrap();
        assert_eq!(hdr.payload(), &[0xaa, 0xbb]);
    }

    #[test]
    fn test_payload_clamped_to_capture() {
        let mut data = make_packet(64, &[0xaa, 0xbb]);
        data[2..4].copy_from_slice(&1500u16.to_be_bytes());

        let hdr = Ipv4Header::parse(&data).unwrap();
        assert_eq!(hdr.payload(), &[0xaa, 0xbb]);
    }

    #[test]
    fn test_packet_decrement_ttl_keeps_checksum_valid() {
        let data = make_packet(64, &[]);
        let mut pkt = Ipv4Packet::from_header(&Ipv4Header::parse(&data).unwrap());

        assert!(pkt.decrement_ttl());
        pkt.update_checksum();
        assert_eq!(pkt.ttl(), 63);

        let hdr = Ipv4Header::parse(pkt.as_bytes()).unwrap();
        assert!(hdr.validate_checksum());
    }

    #[test]
    fn test_packet_decrement_ttl_zero() {
        let data = make_packet(0, &[]);
        let mut pkt = Ipv4Packet::from_header(&Ipv4Header::parse(&data).unwrap());
        assert!(!pkt.decrement_ttl());
        assert_eq!(pkt.ttl(), 0);
    }

    #[test]
    fn test_packet_set_payload_len() {
        let data = make_packet(64, &[0u8; 30]);
        let mut pkt = Ipv4Packet::from_header(&Ipv4Header::parse(&data).unwrap());
        pkt.set_payload_len(12);
        assert_eq!(pkt.total_length(), 32);
    }

    #[test]
    fn test_checksum_odd_length() {
        // 0x4500 + 0x001c + 0xab00 (trailing byte padded with zero)
        assert_eq!(checksum(&[0x45, 0x00, 0x00, 0x1c, 0xab]), 0x0fe3);
        // carries fold back in: 0xffff + 0xffff + 0x0100
        assert_eq!(checksum(&[0xff, 0xff, 0xff, 0xff, 0x01]), 0xfeff);
    }
}
