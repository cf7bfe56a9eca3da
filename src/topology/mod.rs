//! Network view used for steering
//!
//! - Topology graph built from discovered adjacency
//! - Shortest paths and per-hop port resolution
//! - Host directory lookups

mod graph;
mod hosts;
mod path;

pub use graph::{Link, TopologyGraph, TopologySource};
pub use hosts::{HostDirectory, HostEntry, HostRecord, HostTracker};
pub use path::Path;

/// Switch datapath id
pub type Dpid = u64;

/// Switch port number
pub type Port = u16;
