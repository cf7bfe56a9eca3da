//! UDP protocol - RFC 768

use crate::{Error, Result};
use std::net::Ipv4Addr;

/// UDP header size (fixed)
pub const HEADER_SIZE: usize = 8;

/// UDP protocol number for pseudo-header
pub const PROTOCOL_NUMBER: u8 = 17;

/// Parsed UDP header (zero-copy reference)
#[derive(Debug)]
pub struct UdpHeader<'a> {
    buffer: &'a [u8],
}

impl<'a> UdpHeader<'a> {
    pub fn parse(buffer: &'a [u8]) -> Result<Self> {
        if buffer.len() < HEADER_SIZE {
            return Err(Error::Parse("UDP header too short".into()));
        }

        Ok(Self { buffer })
    }

    pub fn src_port(&self) -> u16 {
        u16::from_be_bytes([self.buffer[0], self.buffer[1]])
    }

    pub fn dst_port(&self) -> u16 {
        u16::from_be_bytes([self.buffer[2], self.buffer[3]])
    }

    /// Length (header + data)
    pub fn length(&self) -> u16 {
        u16::from_be_bytes([self.buffer[4], self.buffer[5]])
    }

    /// 0 means checksum not computed (valid for UDP over IPv4)
    pub fn checksum(&self) -> u16 {
        u16::from_be_bytes([self.buffer[6], self.buffer[7]])
    }

    /// Application data, bounded by the length field and the buffer
    pub fn payload(&self) -> &[u8] {
        let end = (self.length() as usize)
            .max(HEADER_SIZE)
            .min(self.buffer.len());
        &self.buffer[HEADER_SIZE..end]
    }

    /// Returns true if checksum is valid or 0 (not computed)
    pub fn validate_checksum(&self, src_ip: Ipv4Addr, dst_ip: Ipv4Addr) -> bool {
        if self.checksum() == 0 {
            return true;
        }
        let end = (self.length() as usize).clamp(HEADER_SIZE, self.buffer.len());
        udp_checksum(src_ip, dst_ip, &self.buffer[..end]) == 0
    }
}

/// Serialize a datagram with recomputed length and checksum.
///
/// Ports are taken unchanged from `header`; `payload` becomes the data.
pub fn rebuild(header: &UdpHeader<'_>, payload: &[u8], src_ip: Ipv4Addr, dst_ip: Ipv4Addr) -> Vec<u8> {
    UdpBuilder::new()
        .src_port(header.src_port())
        .dst_port(header.dst_port())
        .payload(payload)
        .build(src_ip, dst_ip)
}

/// UDP packet builder
#[derive(Debug, Clone, Default)]
pub struct UdpBuilder {
    src_port: u16,
    dst_port: u16,
    payload: Vec<u8>,
}

impl UdpBuilder {
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

    pub fn payload(mut self, data: &[u8]) -> Self {
        self.payload = data.to_vec();
        self
    }

    /// Build the datagram with length and checksum filled in
    pub fn build(self, src_ip: Ipv4Addr, dst_ip: Ipv4Addr) -> Vec<u8> {
        let length = (HEADER_SIZE + self.payload.len()) as u16;
        let mut buffer = Vec::with_capacity(length as usize);

        buffer.extend_from_slice(&self.src_port.to_be_bytes());
        buffer.extend_from_slice(&self.dst_port.to_be_bytes());
        buffer.extend_from_slice(&length.to_be_bytes());
        buffer.extend_from_slice(&[0, 0]);
        buffer.extend_from_slice(&self.payload);

        // 0 is reserved for "no checksum"
        let sum = udp_checksum(src_ip, dst_ip, &buffer);
        let sum = if sum == 0 { 0xFFFF } else { sum };
        buffer[6..8].copy_from_slice(&sum.to_be_bytes());

        buffer
    }
}

/// Calculate UDP checksum with pseudo-header (RFC 768)
///
/// Pseudo-header:
/// ```text
/// +--------+--------+--------+--------+
/// |          Source Address           |
/// +--------+--------+--------+--------+
/// |        Destination Address        |
/// +--------+--------+--------+--------+
/// |  Zero  |Protocol|   UDP Length    |
/// +--------+--------+--------+--------+
/// ```
pub fn udp_checksum(src_ip: Ipv4Addr, dst_ip: Ipv4Addr, udp_datagram: &[u8]) -> u16 {
    let mut sum: u32 = 0;

    let src = src_ip.octets();
    let dst = dst_ip.octets();

    sum += u16::from_be_bytes([src[0], src[1]]) as u32;
    sum += u16::from_be_bytes([src[2], src[3]]) as u32;
    sum += u16::from_be_bytes([dst[0], dst[1]]) as u32;
    sum += u16::from_be_bytes([dst[2], dst[3]]) as u32;
    sum += PROTOCOL_NUMBER as u32;
    sum += udp_datagram.len() as u32;

    for chunk in udp_datagram.chunks(2) {
        let word = match chunk {
            [hi, lo] => u16::from_be_bytes([*hi, *lo]),
            [hi] => u16::from_be_bytes([*hi, 0]),
            _ => 0,
        };
        sum = sum.wrapping_add(word as u32);
    }

    while sum >> 16 != 0 {
        sum = (sum & 0xFFFF) + (sum >> 16);
    }

    !(sum as u16)
}
