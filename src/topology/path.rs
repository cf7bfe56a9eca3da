//! Paths through the switch graph and per-hop port resolution

use super::{Dpid, Port, TopologyGraph};
use crate::{Error, Result};
use std::fmt;

/// Ordered, loop-free sequence of switches.
///
/// The first switch is attached to the source host, the last to the
/// destination host. Only produced by `TopologyGraph::shortest_path`, so it is
/// never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Path {
    hops: Vec<Dpid>,
}

impl Path {
    pub(crate) fn new(hops: Vec<Dpid>) -> Self {
        debug_assert!(!hops.is_empty());
        Self { hops }
    }

    pub fn hops(&self) -> &[Dpid] {
        &self.hops
    }

    pub fn len(&self) -> usize {
        self.hops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hops.is_empty()
    }

    pub fn first(&self) -> Dpid {
        self.hops[0]
    }

    pub fn last(&self) -> Dpid {
        self.hops[self.hops.len() - 1]
    }

    pub fn contains(&self, dpid: Dpid) -> bool {
        self.hops.contains(&dpid)
    }

    fn position(&self, dpid: Dpid) -> Result<usize> {
        self.hops
            .iter()
            .position(|&hop| hop == dpid)
            .ok_or(Error::NodeNotInPath { dpid })
    }

    /// Port on `dpid` that traffic following this path arrives on.
    ///
    /// On the first switch that is the source host's attachment port, which
    /// the caller passes as `host_port`. Elsewhere it is the port facing the
    /// previous hop.
    pub fn input_port_for(&self, graph: &TopologyGraph, dpid: Dpid, host_port: Port) -> Result<Port> {
        let index = self.position(dpid)?;
        if index == 0 {
            return Ok(host_port);
        }

        let previous = self.hops[index - 1];
        graph
            .ports_between(dpid, previous)
            .map(|(local, _)| local)
            .ok_or(Error::NotAdjacent {
                a: previous,
                b: dpid,
            })
    }

    /// Port on `dpid` that traffic following this path leaves on.
    ///
    /// On the last switch that is the destination host's attachment port
    /// (`host_port`). Elsewhere it is the port facing the next hop.
    pub fn output_port_for(&self, graph: &TopologyGraph, dpid: Dpid, host_port: Port) -> Result<Port> {
        let index = self.position(dpid)?;
        if index == self.hops.len() - 1 {
            return Ok(host_port);
        }

        let next = self.hops[index + 1];
        graph
            .ports_between(dpid, next)
            .map(|(local, _)| local)
            .ok_or(Error::NotAdjacent { a: dpid, b: next })
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hops: Vec<String> = self.hops.iter().map(|hop| format!("s{}", hop)).collect();
        write!(f, "{}", hops.join(" -> "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::Link;

    ///           2     2  3     2
    ///         s1 ----- s2 ----- s3
    ///         |1       |1       | 1
    ///         h1       h2       h3
    fn line() -> TopologyGraph {
        let mut graph = TopologyGraph::new();
        graph.add_link(Link::new(1, 2, 2, 2));
        graph.add_link(Link::new(2, 3, 3, 2));
        graph
    }

    #[test]
    fn test_input_port_for_line() {
        let graph = line();
        let path = graph.shortest_path(1, 3).unwrap();

        assert_eq!(path.input_port_for(&graph, 1, 1).unwrap(), 1);
        assert_eq!(path.input_port_for(&graph, 2, 1).unwrap(), 2);
        assert_eq!(path.input_port_for(&graph, 3, 1).unwrap(), 2);
    }

    #[test]
    fn test_input_port_for_uses_supplied_host_port() {
        let graph = line();
        let path = graph.shortest_path(1, 3).unwrap();
        assert_eq!(path.input_port_for(&graph, 1, 7).unwrap(), 7);
    }

    #[test]
    fn test_input_port_for_reverse_direction() {
        let graph = line();
        let path = graph.shortest_path(3, 1).unwrap();

        assert_eq!(path.input_port_for(&graph, 3, 1).unwrap(), 1);
        assert_eq!(path.input_port_for(&graph, 2, 1).unwrap(), 3);
        assert_eq!(path.input_port_for(&graph, 1, 1).unwrap(), 2);
    }

    #[test]
    fn test_output_port_for_line() {
        let graph = line();
        let path = graph.shortest_path(1, 3).unwrap();

        assert_eq!(path.output_port_for(&graph, 1, 1).unwrap(), 2);
        assert_eq!(path.output_port_for(&graph, 2, 1).unwrap(), 3);
        assert_eq!(path.output_port_for(&graph, 3, 5).unwrap(), 5);
    }

    #[test]
    fn test_single_switch_path() {
        let graph = line();
        let path = graph.shortest_path(2, 2).unwrap();
        assert_eq!(path.input_port_for(&graph, 2, 4).unwrap(), 4);
        assert_eq!(path.output_port_for(&graph, 2, 5).unwrap(), 5);
    }

    #[test]
    fn test_node_not_in_path() {
        let graph = line();
        let path = graph.shortest_path(1, 2).unwrap();
        assert!(matches!(
            path.input_port_for(&graph, 3, 1),
            Err(Error::NodeNotInPath { dpid: 3 })
        ));
        assert!(matches!(
            path.output_port_for(&graph, 3, 1),
            Err(Error::NodeNotInPath { dpid: 3 })
        ));
    }

    #[test]
    fn test_path_against_other_graph_is_not_adjacent() {
        let path = line().shortest_path(1, 3).unwrap();
        let mut other = TopologyGraph::new();
        other.add_link(Link::new(1, 2, 2, 2));

        assert!(matches!(
            path.input_port_for(&other, 3, 1),
            Err(Error::NotAdjacent { a: 2, b: 3 })
        ));
    }

    #[test]
    fn test_display() {
        let path = line().shortest_path(1, 3).unwrap();
        assert_eq!(path.to_string(), "s1 -> s2 -> s3");
    }
}
