//! OpenFlow 1.0 control channel
//!
//! Switches connect to the controller over TCP. Each connection is greeted
//! with HELLO and FEATURES_REQUEST; the datapath id in the FEATURES_REPLY
//! names the connection from then on.

use crate::protocol::openflow::{self, FlowMod, MsgType, OfHeader, HEADER_SIZE, OFP_VERSION};
use crate::steering::SwitchSender;
use crate::topology::Dpid;
use crate::{Error, Result};
use std::collections::{BTreeMap, BTreeSet};
use std::io::{ErrorKind, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Upper bound for a single reply from a switch
const REPLY_TIMEOUT: Duration = Duration::from_secs(5);

const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// First xid after the handshake
const FIRST_XID: u32 = 3;

/// One connected switch
#[derive(Debug)]
pub struct SwitchConnection {
    dpid: Dpid,
    peer: SocketAddr,
    stream: TcpStream,
    next_xid: u32,
}

impl SwitchConnection {
    /// Runs the handshake on a freshly accepted stream.
    pub fn handshake(mut stream: TcpStream) -> Result<Self> {
        let peer = stream.peer_addr()?;
        stream.set_nodelay(true)?;
        stream.set_read_timeout(Some(REPLY_TIMEOUT))?;

        stream.write_all(&openflow::hello(1))?;
        stream.write_all(&openflow::features_request(2))?;

        loop {
            let (header, body) = read_message(&mut stream)?;
            match header.kind() {
                // The session runs at the lower of the two HELLO versions.
                Some(MsgType::Hello) => {
                    if header.version < OFP_VERSION {
                        return Err(Error::OpenFlow(format!(
                            "{} speaks version {:#04x}, OpenFlow 1.0 is required",
                            peer, header.version
                        )));
                    }
                    if header.version > OFP_VERSION {
                        debug!(
                            "{} offers version {:#04x}, negotiating OpenFlow 1.0",
                            peer, header.version
                        );
                    }
                }
                Some(MsgType::EchoRequest) => {
                    stream.write_all(&openflow::echo_reply(header.xid, &body))?;
                }
                Some(MsgType::FeaturesReply) => {
                    let dpid = openflow::parse_features_reply(&body)?;
                    info!("Switch s{} connected from {}", dpid, peer);
                    return Ok(Self {
                        dpid,
                        peer,
                        stream,
                        next_xid: FIRST_XID,
                    });
                }
                Some(MsgType::Error) => {
                    let (kind, code) = openflow::parse_error(&body)?;
                    return Err(Error::OpenFlow(format!(
                        "{} rejected handshake: type {} code {}",
                        peer, kind, code
                    )));
                }
                _ => debug!("{}: ignoring message type {} during handshake", peer, header.msg_type),
            }
        }
    }

    pub fn dpid(&self) -> Dpid {
        self.dpid
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    fn xid(&mut self) -> u32 {
        let xid = self.next_xid;
        self.next_xid = self.next_xid.wrapping_add(1);
        xid
    }

    pub fn send_flow_mod(&mut self, message: &FlowMod) -> Result<()> {
        let xid = self.xid();
        self.stream.write_all(&message.encode(xid))?;
        Ok(())
    }

    /// Sends BARRIER_REQUEST and reads until its reply.
    ///
    /// An ERROR from the switch before the reply fails the barrier.
    pub fn barrier(&mut self) -> Result<()> {
        let xid = self.xid();
        self.stream.write_all(&openflow::barrier_request(xid))?;

        loop {
            let (header, body) = read_message(&mut self.stream)?;
            match header.kind() {
                Some(MsgType::BarrierReply) if header.xid == xid => return Ok(()),
                Some(MsgType::EchoRequest) => {
                    self.stream
                        .write_all(&openflow::echo_reply(header.xid, &body))?;
                }
                Some(MsgType::Error) => {
                    let (kind, code) = openflow::parse_error(&body)?;
                    return Err(Error::OpenFlow(format!(
                        "s{} reported error type {} code {} (xid {})",
                        self.dpid, kind, code, header.xid
                    )));
                }
                _ => debug!("s{}: ignoring message type {}", self.dpid, header.msg_type),
            }
        }
    }
}

/// Reads one complete message.
fn read_message(stream: &mut impl Read) -> Result<(OfHeader, Vec<u8>)> {
    let mut raw = [0u8; HEADER_SIZE];
    stream.read_exact(&mut raw)?;
    let header = OfHeader::parse(&raw)?;

    let mut body = vec![0u8; header.body_len()];
    stream.read_exact(&mut body)?;
    Ok((header, body))
}

/// Listening socket plus every switch that completed the handshake
pub struct ControlChannel {
    listener: TcpListener,
    switches: BTreeMap<Dpid, SwitchConnection>,
}

impl ControlChannel {
    pub fn bind(addr: &str) -> Result<Self> {
        let listener = TcpListener::bind(addr)?;
        info!("OpenFlow controller listening on {}", listener.local_addr()?);
        Ok(Self {
            listener,
            switches: BTreeMap::new(),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn is_connected(&self, dpid: Dpid) -> bool {
        self.switches.contains_key(&dpid)
    }

    pub fn connected(&self) -> impl Iterator<Item = Dpid> + '_ {
        self.switches.keys().copied()
    }

    /// Accepts connections until every switch in `dpids` is connected.
    ///
    /// A failed handshake is logged and the connection dropped. When the
    /// timeout elapses the lowest missing switch is reported.
    pub fn wait_for(&mut self, dpids: &BTreeSet<Dpid>, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        self.listener.set_nonblocking(true)?;

        let result = loop {
            let missing = dpids.iter().copied().find(|dpid| !self.is_connected(*dpid));
            let Some(missing) = missing else {
                break Ok(());
            };

            if Instant::now() >= deadline {
                break Err(Error::SwitchNotConnected { dpid: missing });
            }

            match self.listener.accept() {
                Ok((stream, peer)) => {
                    if let Err(e) = self.register(stream) {
                        warn!("Handshake with {} failed: {}", peer, e);
                    }
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => {
                    std::thread::sleep(ACCEPT_POLL_INTERVAL);
                }
                Err(e) => break Err(Error::Io(e)),
            }
        };

        self.listener.set_nonblocking(false)?;
        result
    }

    fn register(&mut self, stream: TcpStream) -> Result<()> {
        stream.set_nonblocking(false)?;
        let connection = SwitchConnection::handshake(stream)?;
        if let Some(previous) = self.switches.insert(connection.dpid(), connection) {
            info!(
                "Switch s{} reconnected, replacing connection from {}",
                previous.dpid(),
                previous.peer()
            );
        }
        Ok(())
    }

    fn connection(&mut self, dpid: Dpid) -> Result<&mut SwitchConnection> {
        self.switches
            .get_mut(&dpid)
            .ok_or(Error::SwitchNotConnected { dpid })
    }
}

impl SwitchSender for ControlChannel {
    fn send(&mut self, dpid: Dpid, message: &FlowMod) -> Result<()> {
        self.connection(dpid)?.send_flow_mod(message)
    }

    fn confirm(&mut self, dpid: Dpid) -> Result<()> {
        self.connection(dpid)?.barrier()
    }
}
