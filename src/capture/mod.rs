//! Raw frame capture for the middlebox
//!
//! The filter loop only depends on the `Capture` trait; `AfPacketSocket` is
//! the Linux implementation.

mod af_packet;

pub use af_packet::AfPacketSocket;

use crate::Result;
use std::future::Future;

/// Information about a received frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RxInfo {
    /// Number of bytes received
    pub len: usize,
    /// Frame was sent by this host (looped back to packet sockets)
    pub outgoing: bool,
}

impl RxInfo {
    pub fn incoming(len: usize) -> Self {
        Self {
            len,
            outgoing: false,
        }
    }
}

/// Frame-level I/O on one interface
pub trait Capture: Send {
    /// Receive a frame into the provided buffer
    fn recv(&mut self, buf: &mut [u8]) -> impl Future<Output = Result<RxInfo>> + Send;

    /// Transmit a complete Ethernet frame
    fn send(&mut self, buf: &[u8]) -> impl Future<Output = Result<usize>> + Send;
}
