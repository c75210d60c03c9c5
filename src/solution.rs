use petgraph::visit::EdgeRef;
use petgraph::Direction;

use crate::common::{ArcId, NodeId};
use crate::network::Network;

/// Flow values indexed by arc id, written once by the solver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowSolution {
    flows: Vec<i64>,
    total_cost: i64,
    flow_value: i64,
    // nodes whose supply (> 0) or demand (< 0) was not fully met
    unsatisfied: Vec<(NodeId, i64)>,
}

impl FlowSolution {
    pub(crate) fn new(
        flows: Vec<i64>,
        total_cost: i64,
        flow_value: i64,
        unsatisfied: Vec<(NodeId, i64)>,
    ) -> Self {
        FlowSolution {
            flows,
            total_cost,
            flow_value,
            unsatisfied,
        }
    }
    pub fn flow(&self, arc: ArcId) -> i64 {
        self.flows.get(arc).copied().unwrap_or(0)
    }
    pub fn flows(&self) -> &[i64] {
        &self.flows
    }
    pub fn total_cost(&self) -> i64 {
        self.total_cost
    }
    pub fn flow_value(&self) -> i64 {
        self.flow_value
    }
    pub fn is_saturating(&self) -> bool {
        self.unsatisfied.is_empty()
    }
    pub fn unsatisfied(&self) -> &[(NodeId, i64)] {
        &self.unsatisfied
    }
    fn remaining(&self, node: NodeId) -> i64 {
        self.unsatisfied
            .iter()
            .find(|(id, _)| *id == node)
            .map_or(0, |(_, left)| *left)
    }
    /// Arcs carrying positive flow, in increasing id order.
    pub fn used_arcs(&self) -> impl Iterator<Item = (ArcId, i64)> + '_ {
        self.flows
            .iter()
            .enumerate()
            .filter(|(_, flow)| **flow > 0)
            .map(|(arc, flow)| (arc, *flow))
    }
    pub fn check_capacity(&self, network: &Network) -> Option<ArcId> {
        network
            .arcs()
            .find(|(arc, spec)| {
                let flow = self.flow(*arc);
                flow < 0 || flow > spec.capacity
            })
            .map(|(arc, _)| arc)
    }
    /// First node where outflow - inflow differs from the supply actually met.
    pub fn check_conservation(&self, network: &Network) -> Option<NodeId> {
        let graph = network.graph();
        graph.node_indices().find_map(|ix| {
            let node = &graph[ix];
            let outflow: i64 = graph
                .edges_directed(ix, Direction::Outgoing)
                .map(|e| self.flow(e.id().index()))
                .sum();
            let inflow: i64 = graph
                .edges_directed(ix, Direction::Incoming)
                .map(|e| self.flow(e.id().index()))
                .sum();
            let met = node.supply - self.remaining(node.id);
            (outflow - inflow != met).then_some(node.id)
        })
    }
    pub fn check_solution(&self, network: &Network) -> bool {
        self.flows.len() == network.arc_count()
            && self.check_capacity(network).is_none()
            && self.check_conservation(network).is_none()
    }
}
