//! flowsteer - UDP flow steering through a middlebox
//!
//! A controller computes shortest paths over an OpenFlow 1.0 network and
//! installs exact-match rules that detour one client -> server UDP flow
//! through a middlebox host. The middlebox data plane drops datagrams whose
//! payload contains a denied keyword and forwards the rest.

pub mod capture;
pub mod config;
pub mod control;
pub mod error;
pub mod middlebox;
pub mod protocol;
pub mod steering;
pub mod telemetry;
pub mod topology;

pub use error::{Error, Result};
