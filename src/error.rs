use crate::topology::Dpid;
use std::io;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("config error: {0}")]
    Config(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("interface {name} not found")]
    InterfaceNotFound { name: String },

    #[error("switch {dpid} is not in the topology")]
    UnknownNode { dpid: Dpid },

    #[error("no path from switch {src} to switch {dst}")]
    NoPath { src: Dpid, dst: Dpid },

    #[error("switch {dpid} is not on the path")]
    NodeNotInPath { dpid: Dpid },

    #[error("switches {a} and {b} are not directly connected")]
    NotAdjacent { a: Dpid, b: Dpid },

    #[error("no host entry for switch {dpid}; host discovery must run first")]
    NoHostFound { dpid: Dpid },

    #[error("host behind switch {dpid} has no IP address yet")]
    HostWithoutAddress { dpid: Dpid },

    #[error("switch {dpid} has no control connection")]
    SwitchNotConnected { dpid: Dpid },

    #[error("OpenFlow error: {0}")]
    OpenFlow(String),

    #[error("install on switch {dpid} failed after {installed} rules: {source}")]
    Install {
        dpid: Dpid,
        installed: usize,
        #[source]
        source: Box<Error>,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
