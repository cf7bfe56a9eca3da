//! Host directory: which host sits behind which switch

use super::{Dpid, Port};
use crate::protocol::MacAddr;
use crate::{Error, Result};
use std::net::Ipv4Addr;

/// One entry of the host-tracking service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostEntry {
    pub dpid: Dpid,
    pub mac: MacAddr,
    /// Addresses seen for this host, in the order the tracker learned them
    pub ip_addrs: Vec<Ipv4Addr>,
    pub port: Port,
}

/// Read-only view of the host-tracking service
pub trait HostTracker {
    fn entries(&self) -> Vec<HostEntry>;
}

/// The host attached to a switch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostRecord {
    pub dpid: Dpid,
    pub mac: MacAddr,
    pub ip: Ipv4Addr,
    pub port: Port,
}

/// Resolves switch ids to their attached host.
///
/// Exactly one host per switch is assumed. If several entries match, the
/// first one reported by the tracker wins.
pub struct HostDirectory<'a> {
    tracker: &'a dyn HostTracker,
}

impl<'a> HostDirectory<'a> {
    pub fn new(tracker: &'a dyn HostTracker) -> Self {
        Self { tracker }
    }

    pub fn host_for(&self, dpid: Dpid) -> Result<HostRecord> {
        let entry = self
            .tracker
            .entries()
            .into_iter()
            .find(|entry| entry.dpid == dpid)
            .ok_or(Error::NoHostFound { dpid })?;

        let ip = *entry
            .ip_addrs
            .first()
            .ok_or(Error::HostWithoutAddress { dpid })?;

        Ok(HostRecord {
            dpid,
            mac: entry.mac,
            ip,
            port: entry.port,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Tracker(Vec<HostEntry>);

    impl HostTracker for Tracker {
        fn entries(&self) -> Vec<HostEntry> {
            self.0.clone()
        }
    }

    fn entry(dpid: Dpid, last: u8, ips: &[Ipv4Addr], port: Port) -> HostEntry {
        HostEntry {
            dpid,
            mac: MacAddr([0, 0, 0, 0, 0, last]),
            ip_addrs: ips.to_vec(),
            port,
        }
    }

    #[test]
    fn test_host_for_resolves_record() {
        let tracker = Tracker(vec![
            entry(1, 1, &[Ipv4Addr::new(10, 0, 0, 1)], 1),
            entry(2, 2, &[Ipv4Addr::new(10, 0, 0, 2)], 3),
        ]);
        let directory = HostDirectory::new(&tracker);

        let record = directory.host_for(2).unwrap();
        assert_eq!(record.dpid, 2);
        assert_eq!(record.mac, MacAddr([0, 0, 0, 0, 0, 2]));
        assert_eq!(record.ip, Ipv4Addr::new(10, 0, 0, 2));
        assert_eq!(record.port, 3);
    }

    #[test]
    fn test_host_for_uses_first_address() {
        let tracker = Tracker(vec![entry(
            1,
            1,
            &[Ipv4Addr::new(10, 0, 0, 1), Ipv4Addr::new(192, 168, 0, 1)],
            1,
        )]);
        let record = HostDirectory::new(&tracker).host_for(1).unwrap();
        assert_eq!(record.ip, Ipv4Addr::new(10, 0, 0, 1));
    }

    #[test]
    fn test_host_for_first_entry_wins() {
        let tracker = Tracker(vec![
            entry(1, 1, &[Ipv4Addr::new(10, 0, 0, 1)], 1),
            entry(1, 9, &[Ipv4Addr::new(10, 0, 0, 9)], 4),
        ]);
        let record = HostDirectory::new(&tracker).host_for(1).unwrap();
        assert_eq!(record.mac, MacAddr([0, 0, 0, 0, 0, 1]));
        assert_eq!(record.port, 1);
    }

    #[test]
    fn test_host_for_missing() {
        let tracker = Tracker(vec![entry(1, 1, &[Ipv4Addr::new(10, 0, 0, 1)], 1)]);
        assert!(matches!(
            HostDirectory::new(&tracker).host_for(5),
            Err(Error::NoHostFound { dpid: 5 })
        ));
    }

    #[test]
    fn test_host_for_without_address() {
        let tracker = Tracker(vec![entry(1, 1, &[], 1)]);
        assert!(matches!(
            HostDirectory::new(&tracker).host_for(1),
            Err(Error::HostWithoutAddress { dpid: 1 })
        ));
    }
}
