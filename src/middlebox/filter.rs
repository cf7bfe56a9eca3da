//! Per-frame filtering decision
//!
//! Qualifying frames are IPv4/UDP addressed to the listening port. Their
//! payload is checked against the denylist; forwarded frames get TTL - 1 with
//! lengths and checksums recomputed. Addresses and ports are never touched.

use super::Denylist;
use crate::protocol::ethernet::Frame;
use crate::protocol::ipv4::{Ipv4Header, Ipv4Packet, Protocol};
use crate::protocol::udp::{self, UdpHeader};
use crate::protocol::EtherType;

/// What to do with one captured frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Not addressed to the middlebox, or malformed
    Ignore,
    /// Retransmit this frame
    Forward(Vec<u8>),
    /// Payload contains a denied keyword
    Block { keyword: String },
    /// TTL was already zero
    Expired,
}

#[derive(Debug, Clone)]
pub struct MiddleboxFilter {
    port: u16,
    denylist: Denylist,
}

impl MiddleboxFilter {
    pub fn new(port: u16, denylist: Denylist) -> Self {
        Self { port, denylist }
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn denylist(&self) -> &Denylist {
        &self.denylist
    }

    pub fn process(&self, frame: &[u8]) -> Verdict {
        let Ok(eth) = Frame::parse(frame) else {
            return Verdict::Ignore;
        };
        if eth.ethertype() != EtherType::Ipv4 as u16 {
            return Verdict::Ignore;
        }

        let Ok(ip) = Ipv4Header::parse(eth.payload()) else {
            return Verdict::Ignore;
        };
        if ip.protocol() != Protocol::Udp as u8 {
            return Verdict::Ignore;
        }

        let Ok(datagram) = UdpHeader::parse(ip.payload()) else {
            return Verdict::Ignore;
        };
        if datagram.dst_port() != self.port {
            return Verdict::Ignore;
        }

        let payload = datagram.payload();
        if let Some(keyword) = self.denylist.first_match(payload) {
            return Verdict::Block {
                keyword: keyword.to_string(),
            };
        }

        let mut header = Ipv4Packet::from_header(&ip);
        if !header.decrement_ttl() {
            return Verdict::Expired;
        }

        let rebuilt = udp::rebuild(&datagram, payload, ip.src_addr(), ip.dst_addr());
        header.set_payload_len(rebuilt.len());
        header.update_checksum();

        let mut out =
            Vec::with_capacity(eth.header_len() + header.as_bytes().len() + rebuilt.len());
        out.extend_from_slice(eth.header());
        out.extend_from_slice(header.as_bytes());
        out.extend_from_slice(&rebuilt);
        Verdict::Forward(out)
    }
}
