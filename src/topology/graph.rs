//! Switch topology graph
//!
//! Built from a snapshot of the discovery service's adjacency. Neighbours are
//! kept in `BTreeMap`s so traversal order, and therefore tie-breaking between
//! equal-length paths, depends only on switch ids.

use super::{Dpid, Path, Port};
use crate::{Error, Result};
use std::collections::{BTreeMap, VecDeque};

/// One discovered link, as reported by discovery: `(dpid1, port1) -> (dpid2, port2)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Link {
    pub dpid1: Dpid,
    pub port1: Port,
    pub dpid2: Dpid,
    pub port2: Port,
}

impl Link {
    pub fn new(dpid1: Dpid, port1: Port, dpid2: Dpid, port2: Port) -> Self {
        Self {
            dpid1,
            port1,
            dpid2,
            port2,
        }
    }
}

/// Source of inter-switch adjacency (the discovery service)
pub trait TopologySource {
    /// Current adjacency. A link may be reported once per direction.
    fn adjacency(&self) -> Vec<Link>;

    /// Switches known to discovery, including ones without any link
    fn switches(&self) -> Vec<Dpid> {
        Vec::new()
    }
}

/// Port pair of an edge, seen from the switch that owns the map entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Ports {
    local: Port,
    remote: Port,
}

/// Undirected graph of switches
#[derive(Debug, Clone, Default)]
pub struct TopologyGraph {
    adjacency: BTreeMap<Dpid, BTreeMap<Dpid, Ports>>,
    edge_count: usize,
}

impl TopologyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot the source's current adjacency
    pub fn build(source: &dyn TopologySource) -> Self {
        let mut graph = Self::new();
        for dpid in source.switches() {
            graph.add_switch(dpid);
        }
        for link in source.adjacency() {
            graph.add_link(link);
        }
        graph
    }

    pub fn add_switch(&mut self, dpid: Dpid) {
        self.adjacency.entry(dpid).or_default();
    }

    /// Add a link. A pair already present (either direction) is left as is.
    pub fn add_link(&mut self, link: Link) {
        self.adjacency.entry(link.dpid1).or_default();
        self.adjacency.entry(link.dpid2).or_default();

        if link.dpid1 == link.dpid2 || self.ports_between(link.dpid1, link.dpid2).is_some() {
            return;
        }

        self.adjacency.entry(link.dpid1).or_default().insert(
            link.dpid2,
            Ports {
                local: link.port1,
                remote: link.port2,
            },
        );
        self.adjacency.entry(link.dpid2).or_default().insert(
            link.dpid1,
            Ports {
                local: link.port2,
                remote: link.port1,
            },
        );
        self.edge_count += 1;
    }

    pub fn contains(&self, dpid: Dpid) -> bool {
        self.adjacency.contains_key(&dpid)
    }

    /// Switch ids in ascending order
    pub fn nodes(&self) -> impl Iterator<Item = Dpid> + '_ {
        self.adjacency.keys().copied()
    }

    pub fn node_count(&self) -> usize {
        self.adjacency.len()
    }

    /// Number of logical (deduplicated) links
    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    /// `(port on a, port on b)` for a direct link, `None` if not adjacent
    pub fn ports_between(&self, a: Dpid, b: Dpid) -> Option<(Port, Port)> {
        self.adjacency
            .get(&a)
            .and_then(|neighbors| neighbors.get(&b))
            .map(|ports| (ports.local, ports.remote))
    }

    /// Hop-count shortest path by breadth-first search
    pub fn shortest_path(&self, src: Dpid, dst: Dpid) -> Result<Path> {
        for dpid in [src, dst] {
            if !self.contains(dpid) {
                return Err(Error::UnknownNode { dpid });
            }
        }

        let mut parent: BTreeMap<Dpid, Dpid> = BTreeMap::new();
        let mut queue = VecDeque::from([src]);
        parent.insert(src, src);

        while let Some(current) = queue.pop_front() {
            if current == dst {
                break;
            }
            for &next in self.adjacency[&current].keys() {
                if !parent.contains_key(&next) {
                    parent.insert(next, current);
                    queue.push_back(next);
                }
            }
        }

        if !parent.contains_key(&dst) {
            return Err(Error::NoPath { src, dst });
        }

        let mut hops = vec![dst];
        let mut current = dst;
        while current != src {
            current = parent[&current];
            hops.push(current);
        }
        hops.reverse();

        Ok(Path::new(hops))
    }
}
