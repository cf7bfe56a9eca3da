//! Configuration types

use crate::steering::{HostPortPolicy, InstallMode, SteeringRequest};
use crate::telemetry::LogConfig;
use crate::topology::{Dpid, Port};
use serde::Deserialize;
use std::time::Duration;

/// User-defined configuration (config.toml)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub logging: LogConfig,
    #[serde(default)]
    pub controller: ControllerConfig,
    #[serde(default)]
    pub links: Vec<LinkConfig>,
    #[serde(default)]
    pub hosts: Vec<HostConfig>,
    pub steering: Option<SteeringConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// OpenFlow listen address
    pub listen: String,
    /// How long `steer` waits for the plan's switches to connect
    pub connect_timeout_secs: u64,
    pub install_mode: InstallMode,
    pub host_port: HostPortMode,
    /// Used when `host_port = "fixed"`
    pub fixed_host_port: Port,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:6633".to_string(),
            connect_timeout_secs: 30,
            install_mode: InstallMode::default(),
            host_port: HostPortMode::default(),
            fixed_host_port: 1,
        }
    }
}

impl ControllerConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn host_port_policy(&self) -> HostPortPolicy {
        match self.host_port {
            HostPortMode::Resolved => HostPortPolicy::Resolved,
            HostPortMode::Fixed => HostPortPolicy::Fixed(self.fixed_host_port),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HostPortMode {
    #[default]
    Resolved,
    Fixed,
}

/// One inter-switch link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct LinkConfig {
    pub dpid1: Dpid,
    pub port1: Port,
    pub dpid2: Dpid,
    pub port2: Port,
}

/// One host and the switch port it is attached to
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HostConfig {
    pub dpid: Dpid,
    pub mac: String,
    #[serde(default)]
    pub ip: Vec<String>,
    pub port: Port,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct SteeringConfig {
    pub client: Dpid,
    pub middlebox: Dpid,
    pub server: Dpid,
    pub src_port: u16,
    pub dst_port: u16,
}

impl SteeringConfig {
    pub fn request(&self) -> SteeringRequest {
        SteeringRequest {
            client: self.client,
            middlebox: self.middlebox,
            server: self.server,
            src_port: self.src_port,
            dst_port: self.dst_port,
        }
    }
}
