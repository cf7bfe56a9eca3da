//! Configuration validation

use super::{Config, HostPortMode};
use crate::protocol::MacAddr;
use std::collections::{BTreeMap, BTreeSet};
use std::net::Ipv4Addr;

#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warn(&mut self, msg: impl Into<String>) {
        self.warnings.push(msg.into());
    }

    pub fn error(&mut self, msg: impl Into<String>) {
        self.errors.push(msg.into());
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn print_diagnostics(&self) {
        for warning in &self.warnings {
            println!("[WARN] {}", warning);
        }
        for error in &self.errors {
            println!("[ERROR] {}", error);
        }
    }
}

/// Validate configuration and return warnings/errors
pub fn validate(config: &Config) -> ValidationResult {
    let mut result = ValidationResult::new();

    validate_controller(config, &mut result);
    validate_links(config, &mut result);
    validate_hosts(config, &mut result);
    validate_steering(config, &mut result);

    result
}

fn validate_controller(config: &Config, result: &mut ValidationResult) {
    let controller = &config.controller;

    if controller.host_port == HostPortMode::Fixed && controller.fixed_host_port == 0 {
        result.error("controller.fixed_host_port: port 0 is not a valid switch port");
    }

    if controller.listen.parse::<std::net::SocketAddr>().is_err() {
        result.error(format!(
            "controller.listen: '{}' is not a socket address",
            controller.listen
        ));
    }

    if controller.connect_timeout_secs == 0 {
        result.warn("controller.connect_timeout_secs: 0 gives switches no time to connect");
    }
}

fn validate_links(config: &Config, result: &mut ValidationResult) {
    for (i, link) in config.links.iter().enumerate() {
        if link.dpid1 == link.dpid2 {
            result.error(format!(
                "links[{}]: both endpoints are switch {}",
                i, link.dpid1
            ));
        }
    }
}

fn validate_hosts(config: &Config, result: &mut ValidationResult) {
    let linked: BTreeSet<_> = config
        .links
        .iter()
        .flat_map(|link| [link.dpid1, link.dpid2])
        .collect();
    let mut per_switch: BTreeMap<_, usize> = BTreeMap::new();

    for (i, host) in config.hosts.iter().enumerate() {
        if host.mac.parse::<MacAddr>().is_err() {
            result.error(format!("hosts[{}]: invalid MAC address '{}'", i, host.mac));
        }

        for ip in &host.ip {
            if ip.parse::<Ipv4Addr>().is_err() {
                result.error(format!("hosts[{}]: invalid IPv4 address '{}'", i, ip));
            }
        }

        if host.ip.is_empty() {
            result.warn(format!(
                "hosts[{}]: no IP address, host on switch {} cannot be steered",
                i, host.dpid
            ));
        }

        if !config.links.is_empty() && !linked.contains(&host.dpid) {
            result.warn(format!(
                "hosts[{}]: switch {} does not appear in any link",
                i, host.dpid
            ));
        }

        *per_switch.entry(host.dpid).or_default() += 1;
    }

    for (dpid, count) in per_switch {
        if count > 1 {
            result.warn(format!(
                "hosts: switch {} has {} hosts, only the first is used",
                dpid, count
            ));
        }
    }
}

fn validate_steering(config: &Config, result: &mut ValidationResult) {
    let Some(steering) = &config.steering else {
        return;
    };

    for (role, dpid) in [
        ("client", steering.client),
        ("middlebox", steering.middlebox),
        ("server", steering.server),
    ] {
        if !config.hosts.iter().any(|host| host.dpid == dpid) {
            result.error(format!(
                "steering.{}: no host configured on switch {}",
                role, dpid
            ));
        }
    }
}
