//! Network protocol implementations
//!
//! Frame-level codecs for the middlebox filter and the OpenFlow 1.0 messages
//! the steering controller exchanges with switches.

pub mod ethernet;
pub mod ipv4;
pub mod openflow;
pub mod types;
pub mod udp;

pub use types::*;
