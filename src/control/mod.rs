//! Controller side of the switches
//!
//! - Static discovery and host tracking from the config file
//! - OpenFlow 1.0 TCP channel used to push rules

mod channel;
mod static_view;

pub use channel::{ControlChannel, SwitchConnection};
pub use static_view::{StaticHosts, StaticTopology};
