//! Ethernet frame parsing and construction

use super::{EtherType, MacAddr};
use crate::{Error, Result};

/// Ethernet header size without a VLAN tag
pub const HEADER_SIZE: usize = 14;
/// Ethernet header size with one 802.1Q tag
pub const VLAN_HEADER_SIZE: usize = 18;

/// Parsed Ethernet frame (zero-copy reference)
#[derive(Debug)]
pub struct Frame<'a> {
    buffer: &'a [u8],
    header_len: usize,
}

impl<'a> Frame<'a> {
    /// Parse an Ethernet frame, stepping over a single VLAN tag if present
    pub fn parse(buffer: &'a [u8]) -> Result<Self> {
        if buffer.len() < HEADER_SIZE {
            return Err(Error::Parse("frame too short".into()));
        }

        let outer = u16::from_be_bytes([buffer[12], buffer[13]]);
        let header_len = if outer == EtherType::Vlan as u16 {
            if buffer.len() < VLAN_HEADER_SIZE {
                return Err(Error::Parse("VLAN frame too short".into()));
            }
            VLAN_HEADER_SIZE
        } else {
            HEADER_SIZE
        };

        Ok(Self { buffer, header_len })
    }

    pub fn dst_mac(&self) -> MacAddr {
        let mut mac = [0u8; 6];
        mac.copy_from_slice(&self.buffer[0..6]);
        MacAddr(mac)
    }

    pub fn src_mac(&self) -> MacAddr {
        let mut mac = [0u8; 6];
        mac.copy_from_slice(&self.buffer[6..12]);
        MacAddr(mac)
    }

    /// EtherType of the payload (inner type for tagged frames)
    pub fn ethertype(&self) -> u16 {
        let offset = self.header_len - 2;
        u16::from_be_bytes([self.buffer[offset], self.buffer[offset + 1]])
    }

    pub fn header_len(&self) -> usize {
        self.header_len
    }

    /// Link-layer header bytes, including any VLAN tag
    pub fn header(&self) -> &[u8] {
        &self.buffer[..self.header_len]
    }

    pub fn payload(&self) -> &[u8] {
        &self.buffer[self.header_len..]
    }
}

/// Builder for constructing untagged Ethernet frames
#[derive(Debug, Default)]
pub struct FrameBuilder {
    dst_mac: MacAddr,
    src_mac: MacAddr,
    ethertype: u16,
    payload: Vec<u8>,
}

impl FrameBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dst_mac(mut self, mac: MacAddr) -> Self {
        self.dst_mac = mac;
        self
    }

    pub fn src_mac(mut self, mac: MacAddr) -> Self {
        self.src_mac = mac;
        self
    }

    pub fn ethertype(mut self, ethertype: u16) -> Self {
        self.ethertype = ethertype;
        self
    }

    pub fn payload(mut self, payload: &[u8]) -> Self {
        self.payload = payload.to_vec();
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut buffer = Vec::with_capacity(HEADER_SIZE + self.payload.len());
        buffer.extend_from_slice(&self.dst_mac.0);
        buffer.extend_from_slice(&self.src_mac.0);
        buffer.extend_from_slice(&self.ethertype.to_be_bytes());
        buffer.extend_from_slice(&self.payload);
        buffer
    }
}
