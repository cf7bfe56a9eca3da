//! OpenFlow 1.0 wire format
//!
//! Only the messages a steering controller needs: the connection handshake
//! (HELLO, FEATURES), keepalive (ECHO), FLOW_MOD, BARRIER and ERROR.

use super::MacAddr;
use crate::{Error, Result};
use std::net::Ipv4Addr;

/// Protocol version byte for OpenFlow 1.0
pub const OFP_VERSION: u8 = 0x01;

/// Common header size
pub const HEADER_SIZE: usize = 8;

/// `ofp_match` size
pub const MATCH_SIZE: usize = 40;

/// Fixed part of `ofp_flow_mod`, header and match included
pub const FLOW_MOD_SIZE: usize = 72;

/// `ofp_action_output` size
pub const ACTION_OUTPUT_SIZE: usize = 8;

/// Buffer id meaning "not buffered"
pub const NO_BUFFER: u32 = 0xffff_ffff;

/// Reserved port: not associated with a physical port
pub const OFPP_NONE: u16 = 0xffff;

/// Message types used by the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MsgType {
    Hello = 0,
    Error = 1,
    EchoRequest = 2,
    EchoReply = 3,
    FeaturesRequest = 5,
    FeaturesReply = 6,
    FlowMod = 14,
    BarrierRequest = 18,
    BarrierReply = 19,
}

impl MsgType {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(MsgType::Hello),
            1 => Some(MsgType::Error),
            2 => Some(MsgType::EchoRequest),
            3 => Some(MsgType::EchoReply),
            5 => Some(MsgType::FeaturesRequest),
            6 => Some(MsgType::FeaturesReply),
            14 => Some(MsgType::FlowMod),
            18 => Some(MsgType::BarrierRequest),
            19 => Some(MsgType::BarrierReply),
            _ => None,
        }
    }
}

/// `ofp_flow_wildcards` bits
pub mod wildcards {
    pub const IN_PORT: u32 = 1 << 0;
    pub const DL_VLAN: u32 = 1 << 1;
    pub const DL_SRC: u32 = 1 << 2;
    pub const DL_DST: u32 = 1 << 3;
    pub const DL_TYPE: u32 = 1 << 4;
    pub const NW_PROTO: u32 = 1 << 5;
    pub const TP_SRC: u32 = 1 << 6;
    pub const TP_DST: u32 = 1 << 7;
    pub const NW_SRC_ALL: u32 = 32 << 8;
    pub const NW_DST_ALL: u32 = 32 << 14;
    pub const DL_VLAN_PCP: u32 = 1 << 20;
    pub const NW_TOS: u32 = 1 << 21;
}

/// Common message header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OfHeader {
    pub version: u8,
    pub msg_type: u8,
    pub length: u16,
    pub xid: u32,
}

impl OfHeader {
    pub fn new(msg_type: MsgType, length: u16, xid: u32) -> Self {
        Self {
            version: OFP_VERSION,
            msg_type: msg_type as u8,
            length,
            xid,
        }
    }

    pub fn parse(buffer: &[u8]) -> Result<Self> {
        if buffer.len() < HEADER_SIZE {
            return Err(Error::Parse("OpenFlow header too short".into()));
        }

        let header = Self {
            version: buffer[0],
            msg_type: buffer[1],
            length: u16::from_be_bytes([buffer[2], buffer[3]]),
            xid: u32::from_be_bytes([buffer[4], buffer[5], buffer[6], buffer[7]]),
        };

        if (header.length as usize) < HEADER_SIZE {
            return Err(Error::Parse(format!(
                "OpenFlow length {} below header size",
                header.length
            )));
        }

        Ok(header)
    }

    pub fn kind(&self) -> Option<MsgType> {
        MsgType::from_u8(self.msg_type)
    }

    /// Body length following the header
    pub fn body_len(&self) -> usize {
        self.length as usize - HEADER_SIZE
    }

    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut out = [0u8; HEADER_SIZE];
        out[0] = self.version;
        out[1] = self.msg_type;
        out[2..4].copy_from_slice(&self.length.to_be_bytes());
        out[4..8].copy_from_slice(&self.xid.to_be_bytes());
        out
    }
}

fn header_only(msg_type: MsgType, xid: u32) -> Vec<u8> {
    OfHeader::new(msg_type, HEADER_SIZE as u16, xid)
        .to_bytes()
        .to_vec()
}

pub fn hello(xid: u32) -> Vec<u8> {
    header_only(MsgType::Hello, xid)
}

pub fn features_request(xid: u32) -> Vec<u8> {
    header_only(MsgType::FeaturesRequest, xid)
}

pub fn barrier_request(xid: u32) -> Vec<u8> {
    header_only(MsgType::BarrierRequest, xid)
}

/// ECHO_REPLY carrying the request's body back
pub fn echo_reply(xid: u32, body: &[u8]) -> Vec<u8> {
    let length = (HEADER_SIZE + body.len()) as u16;
    let mut out = OfHeader::new(MsgType::EchoReply, length, xid)
        .to_bytes()
        .to_vec();
    out.extend_from_slice(body);
    out
}

/// Datapath id from a FEATURES_REPLY body
pub fn parse_features_reply(body: &[u8]) -> Result<u64> {
    let bytes: [u8; 8] = body
        .get(..8)
        .and_then(|b| b.try_into().ok())
        .ok_or_else(|| Error::Parse("FEATURES_REPLY too short".into()))?;
    Ok(u64::from_be_bytes(bytes))
}

/// (type, code) from an ERROR body
pub fn parse_error(body: &[u8]) -> Result<(u16, u16)> {
    if body.len() < 4 {
        return Err(Error::Parse("ERROR message too short".into()));
    }
    Ok((
        u16::from_be_bytes([body[0], body[1]]),
        u16::from_be_bytes([body[2], body[3]]),
    ))
}

/// Fields to match against flows. `None` means wildcarded.
///
/// VLAN id, VLAN PCP and IP ToS are never matched on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OfMatch {
    pub in_port: Option<u16>,
    pub dl_src: Option<MacAddr>,
    pub dl_dst: Option<MacAddr>,
    pub dl_type: Option<u16>,
    pub nw_proto: Option<u8>,
    pub nw_src: Option<Ipv4Addr>,
    pub nw_dst: Option<Ipv4Addr>,
    pub tp_src: Option<u16>,
    pub tp_dst: Option<u16>,
}

impl OfMatch {
    pub fn wildcards(&self) -> u32 {
        let mut bits = wildcards::DL_VLAN | wildcards::DL_VLAN_PCP | wildcards::NW_TOS;
        if self.in_port.is_none() {
            bits |= wildcards::IN_PORT;
        }
        if self.dl_src.is_none() {
            bits |= wildcards::DL_SRC;
        }
        if self.dl_dst.is_none() {
            bits |= wildcards::DL_DST;
        }
        if self.dl_type.is_none() {
            bits |= wildcards::DL_TYPE;
        }
        if self.nw_proto.is_none() {
            bits |= wildcards::NW_PROTO;
        }
        if self.nw_src.is_none() {
            bits |= wildcards::NW_SRC_ALL;
        }
        if self.nw_dst.is_none() {
            bits |= wildcards::NW_DST_ALL;
        }
        if self.tp_src.is_none() {
            bits |= wildcards::TP_SRC;
        }
        if self.tp_dst.is_none() {
            bits |= wildcards::TP_DST;
        }
        bits
    }

    pub fn to_bytes(&self) -> [u8; MATCH_SIZE] {
        let mut out = [0u8; MATCH_SIZE];
        out[0..4].copy_from_slice(&self.wildcards().to_be_bytes());
        out[4..6].copy_from_slice(&self.in_port.unwrap_or(0).to_be_bytes());
        out[6..12].copy_from_slice(&self.dl_src.unwrap_or_default().0);
        out[12..18].copy_from_slice(&self.dl_dst.unwrap_or_default().0);
        // dl_vlan (18..20), dl_vlan_pcp (20), pad (21) left zero
        out[22..24].copy_from_slice(&self.dl_type.unwrap_or(0).to_be_bytes());
        // nw_tos (24) left zero
        out[25] = self.nw_proto.unwrap_or(0);
        // pad (26..28)
        let nw_src = self.nw_src.unwrap_or(Ipv4Addr::UNSPECIFIED);
        let nw_dst = self.nw_dst.unwrap_or(Ipv4Addr::UNSPECIFIED);
        out[28..32].copy_from_slice(&nw_src.octets());
        out[32..36].copy_from_slice(&nw_dst.octets());
        out[36..38].copy_from_slice(&self.tp_src.unwrap_or(0).to_be_bytes());
        out[38..40].copy_from_slice(&self.tp_dst.unwrap_or(0).to_be_bytes());
        out
    }
}

/// Flow table modification commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum FlowModCommand {
    Add = 0,
    DeleteStrict = 4,
}

/// A FLOW_MOD with at most one output action
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowMod {
    pub command: FlowModCommand,
    pub of_match: OfMatch,
    pub priority: u16,
    pub output: Option<u16>,
}

impl FlowMod {
    pub fn encode(&self, xid: u32) -> Vec<u8> {
        let actions_len = if self.output.is_some() {
            ACTION_OUTPUT_SIZE
        } else {
            0
        };
        let length = (FLOW_MOD_SIZE + actions_len) as u16;

        let mut out = Vec::with_capacity(length as usize);
        out.extend_from_slice(&OfHeader::new(MsgType::FlowMod, length, xid).to_bytes());
        out.extend_from_slice(&self.of_match.to_bytes());
        out.extend_from_slice(&0u64.to_be_bytes()); // cookie
        out.extend_from_slice(&(self.command as u16).to_be_bytes());
        out.extend_from_slice(&0u16.to_be_bytes()); // idle_timeout: permanent
        out.extend_from_slice(&0u16.to_be_bytes()); // hard_timeout: permanent
        out.extend_from_slice(&self.priority.to_be_bytes());
        out.extend_from_slice(&NO_BUFFER.to_be_bytes());
        out.extend_from_slice(&OFPP_NONE.to_be_bytes());
        out.extend_from_slice(&0u16.to_be_bytes()); // flags

        if let Some(port) = self.output {
            out.extend_from_slice(&0u16.to_be_bytes()); // OFPAT_OUTPUT
            out.extend_from_slice(&(ACTION_OUTPUT_SIZE as u16).to_be_bytes());
            out.extend_from_slice(&port.to_be_bytes());
            out.extend_from_slice(&0u16.to_be_bytes()); // max_len
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exact_match() -> OfMatch {
        OfMatch {
            in_port: Some(1),
            dl_src: Some(MacAddr([0, 0, 0, 0, 0, 1])),
            dl_dst: Some(MacAddr([0, 0, 0, 0, 0, 3])),
            dl_type: Some(0x0800),
            nw_proto: Some(17),
            nw_src: Some(Ipv4Addr::new(10, 0, 0, 1)),
            nw_dst: Some(Ipv4Addr::new(10, 0, 0, 3)),
            tp_src: Some(5000),
            tp_dst: Some(6000),
        }
    }

    #[test]
    fn test_header_parse() {
        let bytes = [0x01, 0x06, 0x00, 0x20, 0x00, 0x00, 0x00, 0x07];
        let header = OfHeader::parse(&bytes).unwrap();
        assert_eq!(header.kind(), Some(MsgType::FeaturesReply));
        assert_eq!(header.length, 32);
        assert_eq!(header.xid, 7);
        assert_eq!(header.body_len(), 24);
        assert_eq!(header.to_bytes(), bytes);
    }

    #[test]
    fn test_header_parse_rejects_short_length() {
        let bytes = [0x01, 0x00, 0x00, 0x04, 0, 0, 0, 0];
        assert!(OfHeader::parse(&bytes).is_err());
        assert!(OfHeader::parse(&bytes[..7]).is_err());
    }

    #[test]
    fn test_header_only_messages() {
        assert_eq!(hello(1), vec![0x01, 0x00, 0x00, 0x08, 0, 0, 0, 1]);
        assert_eq!(features_request(2)[1], MsgType::FeaturesRequest as u8);
        assert_eq!(barrier_request(3)[1], MsgType::BarrierRequest as u8);
    }

    #[test]
    fn test_echo_reply_echoes_body() {
        let reply = echo_reply(9, b"ping");
        let header = OfHeader::parse(&reply).unwrap();
        assert_eq!(header.kind(), Some(MsgType::EchoReply));
        assert_eq!(header.length, 12);
        assert_eq!(header.xid, 9);
        assert_eq!(&reply[8..], b"ping");
    }

    #[test]
    fn test_parse_features_reply() {
        let mut body = vec![0u8; 24];
        body[..8].copy_from_slice(&0x0000_0000_0000_0003u64.to_be_bytes());
        assert_eq!(parse_features_reply(&body).unwrap(), 3);
        assert!(parse_features_reply(&body[..4]).is_err());
    }

    #[test]
    fn test_parse_error() {
        assert_eq!(parse_error(&[0, 3, 0, 2, 0xff]).unwrap(), (3, 2));
        assert!(parse_error(&[0, 3]).is_err());
    }

    #[test]
    fn test_exact_match_wildcards() {
        let bits = exact_match().wildcards();
        assert_eq!(
            bits,
            wildcards::DL_VLAN | wildcards::DL_VLAN_PCP | wildcards::NW_TOS
        );
    }

    #[test]
    fn test_empty_match_wildcards_everything() {
        let bits = OfMatch::default().wildcards();
        assert_ne!(bits & wildcards::IN_PORT, 0);
        assert_ne!(bits & wildcards::TP_DST, 0);
        assert_eq!(bits & wildcards::NW_SRC_ALL, wildcards::NW_SRC_ALL);
        assert_eq!(bits & wildcards::NW_DST_ALL, wildcards::NW_DST_ALL);
    }

    #[test]
    fn test_match_layout() {
        let bytes = exact_match().to_bytes();
        assert_eq!(&bytes[4..6], &[0, 1]);
        assert_eq!(&bytes[6..12], &[0, 0, 0, 0, 0, 1]);
        assert_eq!(&bytes[12..18], &[0, 0, 0, 0, 0, 3]);
        assert_eq!(&bytes[22..24], &[0x08, 0x00]);
        assert_eq!(bytes[25], 17);
        assert_eq!(&bytes[28..32], &[10, 0, 0, 1]);
        assert_eq!(&bytes[32..36], &[10, 0, 0, 3]);
        assert_eq!(&bytes[36..38], &5000u16.to_be_bytes());
        assert_eq!(&bytes[38..40], &6000u16.to_be_bytes());
    }

    #[test]
    fn test_flow_mod_add_layout() {
        let flow_mod = FlowMod {
            command: FlowModCommand::Add,
            of_match: exact_match(),
            priority: 65534,
            output: Some(2),
        };
        let bytes = flow_mod.encode(42);

        assert_eq!(bytes.len(), 80);
        let header = OfHeader::parse(&bytes).unwrap();
        assert_eq!(header.kind(), Some(MsgType::FlowMod));
        assert_eq!(header.length, 80);
        assert_eq!(header.xid, 42);

        assert_eq!(&bytes[8..48], &exact_match().to_bytes());
        assert_eq!(&bytes[56..58], &[0, 0]); // command
        assert_eq!(&bytes[62..64], &65534u16.to_be_bytes());
        assert_eq!(&bytes[64..68], &[0xff, 0xff, 0xff, 0xff]);
        // output action
        assert_eq!(&bytes[72..76], &[0, 0, 0, 8]);
        assert_eq!(&bytes[76..78], &[0, 2]);
    }

    #[test]
    fn test_flow_mod_delete_strict_has_no_actions() {
        let flow_mod = FlowMod {
            command: FlowModCommand::DeleteStrict,
            of_match: exact_match(),
            priority: 65534,
            output: None,
        };
        let bytes = flow_mod.encode(1);
        assert_eq!(bytes.len(), FLOW_MOD_SIZE);
        assert_eq!(&bytes[56..58], &[0, 4]);
    }
}
