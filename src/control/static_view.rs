//! Discovery and host tracking backed by the config file

use crate::config::Config;
use crate::protocol::MacAddr;
use crate::topology::{Dpid, HostEntry, HostTracker, Link, TopologySource};
use crate::{Error, Result};
use std::collections::BTreeSet;
use std::net::Ipv4Addr;

/// Adjacency declared under `[[links]]`.
///
/// Switches that only carry hosts are reported too, so a network of one
/// switch still has a node.
#[derive(Debug, Clone, Default)]
pub struct StaticTopology {
    links: Vec<Link>,
    switches: Vec<Dpid>,
}

impl StaticTopology {
    pub fn from_config(config: &Config) -> Self {
        let links = config
            .links
            .iter()
            .map(|l| Link::new(l.dpid1, l.port1, l.dpid2, l.port2))
            .collect();
        let switches: BTreeSet<Dpid> = config.hosts.iter().map(|h| h.dpid).collect();

        Self {
            links,
            switches: switches.into_iter().collect(),
        }
    }
}

impl TopologySource for StaticTopology {
    fn adjacency(&self) -> Vec<Link> {
        self.links.clone()
    }

    fn switches(&self) -> Vec<Dpid> {
        self.switches.clone()
    }
}

/// Hosts declared under `[[hosts]]`, in file order
#[derive(Debug, Clone, Default)]
pub struct StaticHosts {
    entries: Vec<HostEntry>,
}

impl StaticHosts {
    pub fn from_config(config: &Config) -> Result<Self> {
        let entries = config
            .hosts
            .iter()
            .map(|host| {
                let mac: MacAddr = host
                    .mac
                    .parse()
                    .map_err(|e| Error::Config(format!("host on switch {}: {}", host.dpid, e)))?;
                let ip_addrs = host
                    .ip
                    .iter()
                    .map(|ip| {
                        ip.parse::<Ipv4Addr>().map_err(|_| {
                            Error::Config(format!(
                                "host on switch {}: invalid IPv4 address '{}'",
                                host.dpid, ip
                            ))
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;

                Ok(HostEntry {
                    dpid: host.dpid,
                    mac,
                    ip_addrs,
                    port: host.port,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { entries })
    }
}

impl HostTracker for StaticHosts {
    fn entries(&self) -> Vec<HostEntry> {
        self.entries.clone()
    }
}
