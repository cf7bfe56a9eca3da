//! Steering rule synthesis
//!
//! Every rule matches the full Ethernet/IPv4/UDP tuple of the original flow
//! plus the input port, and forwards out of a single port.

use crate::protocol::ipv4::Protocol;
use crate::protocol::openflow::{FlowMod, FlowModCommand, OfMatch};
use crate::protocol::{EtherType, MacAddr};
use crate::topology::Port;
use std::fmt;
use std::net::Ipv4Addr;

/// Highest priority below the reserved maximum, so steering rules win over
/// any default forwarding entry.
pub const STEERING_PRIORITY: u16 = 65534;

/// Addressing of the original client -> server flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FlowKey {
    pub src_mac: MacAddr,
    pub dst_mac: MacAddr,
    pub src_ip: Ipv4Addr,
    pub dst_ip: Ipv4Addr,
    pub src_port: u16,
    pub dst_port: u16,
}

/// Exact match on input port and flow key; always IPv4 carrying UDP
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FlowMatch {
    pub in_port: Port,
    pub key: FlowKey,
}

impl FlowMatch {
    pub fn ethertype(&self) -> u16 {
        EtherType::Ipv4 as u16
    }

    pub fn protocol(&self) -> u8 {
        Protocol::Udp as u8
    }

    pub fn to_openflow(&self) -> OfMatch {
        OfMatch {
            in_port: Some(self.in_port),
            dl_src: Some(self.key.src_mac),
            dl_dst: Some(self.key.dst_mac),
            dl_type: Some(self.ethertype()),
            nw_proto: Some(self.protocol()),
            nw_src: Some(self.key.src_ip),
            nw_dst: Some(self.key.dst_ip),
            tp_src: Some(self.key.src_port),
            tp_dst: Some(self.key.dst_port),
        }
    }
}

/// Match plus a single output action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FlowRule {
    pub flow_match: FlowMatch,
    pub out_port: Port,
    pub priority: u16,
}

impl FlowRule {
    /// FLOW_MOD that adds this rule
    pub fn install_message(&self) -> FlowMod {
        FlowMod {
            command: FlowModCommand::Add,
            of_match: self.flow_match.to_openflow(),
            priority: self.priority,
            output: Some(self.out_port),
        }
    }

    /// FLOW_MOD that removes exactly this rule
    pub fn removal_message(&self) -> FlowMod {
        FlowMod {
            command: FlowModCommand::DeleteStrict,
            of_match: self.flow_match.to_openflow(),
            priority: self.priority,
            output: None,
        }
    }
}

impl fmt::Display for FlowRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let key = &self.flow_match.key;
        write!(
            f,
            "in_port={} {}/{}:{} -> {}/{}:{} udp priority={} => output:{}",
            self.flow_match.in_port,
            key.src_mac,
            key.src_ip,
            key.src_port,
            key.dst_mac,
            key.dst_ip,
            key.dst_port,
            self.priority,
            self.out_port
        )
    }
}

pub fn build_match(key: FlowKey, in_port: Port) -> FlowMatch {
    FlowMatch { in_port, key }
}

pub fn build_rule(flow_match: FlowMatch, out_port: Port) -> FlowRule {
    FlowRule {
        flow_match,
        out_port,
        priority: STEERING_PRIORITY,
    }
}
