//! Steering a client -> server flow through a middlebox
//!
//! Planning resolves hosts and paths and synthesizes every rule up front;
//! installation only starts once the whole plan exists.

use super::installer::{InstallReport, RuleInstaller, SwitchSender};
use super::rule::{build_match, build_rule, FlowKey, FlowRule};
use crate::topology::{
    Dpid, HostDirectory, HostRecord, HostTracker, Path, Port, TopologyGraph, TopologySource,
};
use crate::Result;
use std::collections::BTreeSet;
use std::fmt;
use tracing::{debug, info};

/// Which port a host is assumed to hang off its switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HostPortPolicy {
    /// Port reported by host tracking
    #[default]
    Resolved,
    /// Same port for every host
    Fixed(Port),
}

impl HostPortPolicy {
    pub fn port_for(&self, host: &HostRecord) -> Port {
        match self {
            HostPortPolicy::Resolved => host.port,
            HostPortPolicy::Fixed(port) => *port,
        }
    }
}

/// One steering invocation: the switches of the three hosts and the UDP
/// ports of the flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SteeringRequest {
    pub client: Dpid,
    pub middlebox: Dpid,
    pub server: Dpid,
    pub src_port: u16,
    pub dst_port: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment {
    ClientToMiddlebox,
    MiddleboxToServer,
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::ClientToMiddlebox => write!(f, "client->middlebox"),
            Segment::MiddleboxToServer => write!(f, "middlebox->server"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedRule {
    pub segment: Segment,
    pub dpid: Dpid,
    pub rule: FlowRule,
}

/// Everything a steering run will install, in install order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SteeringPlan {
    pub request: SteeringRequest,
    pub key: FlowKey,
    pub client: HostRecord,
    pub middlebox: HostRecord,
    pub server: HostRecord,
    pub to_middlebox: Path,
    pub to_server: Path,
    pub direct: Path,
    pub rules: Vec<PlannedRule>,
    /// Switches on the direct path that neither segment touches
    pub uncovered: Vec<Dpid>,
}

impl SteeringPlan {
    /// Distinct switches that receive at least one rule
    pub fn switches(&self) -> BTreeSet<Dpid> {
        self.rules.iter().map(|planned| planned.dpid).collect()
    }

    pub fn rules_for(&self, segment: Segment) -> impl Iterator<Item = &PlannedRule> + '_ {
        self.rules
            .iter()
            .filter(move |planned| planned.segment == segment)
    }
}

pub struct Orchestrator<'a> {
    topology: &'a dyn TopologySource,
    hosts: &'a dyn HostTracker,
    host_ports: HostPortPolicy,
}

impl<'a> Orchestrator<'a> {
    pub fn new(topology: &'a dyn TopologySource, hosts: &'a dyn HostTracker) -> Self {
        Self {
            topology,
            hosts,
            host_ports: HostPortPolicy::default(),
        }
    }

    pub fn with_host_ports(mut self, policy: HostPortPolicy) -> Self {
        self.host_ports = policy;
        self
    }

    /// Computes the full plan without touching any switch.
    pub fn plan(&self, request: &SteeringRequest) -> Result<SteeringPlan> {
        let graph = TopologyGraph::build(self.topology);
        debug!(
            "Topology snapshot: {} switches, {} links",
            graph.node_count(),
            graph.edge_count()
        );

        let directory = HostDirectory::new(self.hosts);
        let client = directory.host_for(request.client)?;
        let middlebox = directory.host_for(request.middlebox)?;
        let server = directory.host_for(request.server)?;

        let to_middlebox = graph.shortest_path(request.client, request.middlebox)?;
        let to_server = graph.shortest_path(request.middlebox, request.server)?;
        let direct = graph.shortest_path(request.client, request.server)?;

        info!("Path client->middlebox: {}", to_middlebox);
        info!("Path middlebox->server: {}", to_server);
        info!("Path client->server (direct): {}", direct);

        let uncovered: Vec<Dpid> = direct
            .hops()
            .iter()
            .copied()
            .filter(|&dpid| !to_middlebox.contains(dpid) && !to_server.contains(dpid))
            .collect();
        if !uncovered.is_empty() {
            info!(
                "Direct path switches outside the steered segments: {:?}",
                uncovered
            );
        }

        // Both segments match on the original client -> server addressing.
        let key = FlowKey {
            src_mac: client.mac,
            dst_mac: server.mac,
            src_ip: client.ip,
            dst_ip: server.ip,
            src_port: request.src_port,
            dst_port: request.dst_port,
        };

        let mut rules = self.segment_rules(
            &graph,
            &to_middlebox,
            key,
            Segment::ClientToMiddlebox,
            self.host_ports.port_for(&client),
            self.host_ports.port_for(&middlebox),
        )?;
        rules.extend(self.segment_rules(
            &graph,
            &to_server,
            key,
            Segment::MiddleboxToServer,
            self.host_ports.port_for(&middlebox),
            self.host_ports.port_for(&server),
        )?);

        Ok(SteeringPlan {
            request: *request,
            key,
            client,
            middlebox,
            server,
            to_middlebox,
            to_server,
            direct,
            rules,
            uncovered,
        })
    }

    /// Plans, then installs. Nothing is sent unless planning succeeds.
    pub fn steer(
        &self,
        request: &SteeringRequest,
        installer: &RuleInstaller,
        sender: &mut dyn SwitchSender,
    ) -> Result<(SteeringPlan, InstallReport)> {
        let plan = self.plan(request)?;
        let report = installer.install(sender, &plan)?;
        Ok((plan, report))
    }

    fn segment_rules(
        &self,
        graph: &TopologyGraph,
        path: &Path,
        key: FlowKey,
        segment: Segment,
        entry_port: Port,
        exit_port: Port,
    ) -> Result<Vec<PlannedRule>> {
        path.hops()
            .iter()
            .map(|&dpid| {
                let in_port = path.input_port_for(graph, dpid, entry_port)?;
                let out_port = path.output_port_for(graph, dpid, exit_port)?;
                let rule = build_rule(build_match(key, in_port), out_port);
                debug!("{} s{}: {}", segment, dpid, rule);
                Ok(PlannedRule {
                    segment,
                    dpid,
                    rule,
                })
            })
            .collect()
    }
}
