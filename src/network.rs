use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;
use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::common::{ArcId, ArcSpec, NodeId, NodePayload};
use crate::error::BuildError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FlowNode {
    pub id: NodeId,
    pub supply: i64,
    pub payload: Option<NodePayload>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FlowArc {
    pub capacity: i64,
    pub unit_cost: i64,
}

/// A validated flow network. Arcs keep their input position as their id, nodes
/// are stored in ascending id order.
#[derive(Clone, Debug)]
pub struct Network {
    graph: DiGraph<FlowNode, FlowArc>,
    index: HashMap<NodeId, NodeIndex>,
}

impl Network {
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }
    pub fn arc_count(&self) -> usize {
        self.graph.edge_count()
    }
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }
    pub fn nodes(&self) -> impl Iterator<Item = &FlowNode> + '_ {
        self.graph.raw_nodes().iter().map(|node| &node.weight)
    }
    pub fn node(&self, id: NodeId) -> Option<&FlowNode> {
        self.index.get(&id).map(|ix| &self.graph[*ix])
    }
    pub fn supply(&self, id: NodeId) -> i64 {
        self.node(id).map_or(0, |node| node.supply)
    }
    pub fn payload(&self, id: NodeId) -> Option<&NodePayload> {
        self.node(id).and_then(|node| node.payload.as_ref())
    }
    /// Units that must leave supply nodes for the flow to be saturating.
    pub fn required_flow(&self) -> i64 {
        self.nodes().map(|node| node.supply.max(0)).sum()
    }
    pub fn arc(&self, arc: ArcId) -> Option<ArcSpec> {
        let edge = EdgeIndex::new(arc);
        let (tail, head) = self.graph.edge_endpoints(edge)?;
        let weight = self.graph.edge_weight(edge)?;
        Some(ArcSpec {
            tail: self.graph[tail].id,
            head: self.graph[head].id,
            capacity: weight.capacity,
            unit_cost: weight.unit_cost,
        })
    }
    /// Arcs in increasing id order.
    pub fn arcs(&self) -> impl Iterator<Item = (ArcId, ArcSpec)> + '_ {
        self.graph.edge_references().map(|edge| {
            (
                edge.id().index(),
                ArcSpec {
                    tail: self.graph[edge.source()].id,
                    head: self.graph[edge.target()].id,
                    capacity: edge.weight().capacity,
                    unit_cost: edge.weight().unit_cost,
                },
            )
        })
    }
    pub(crate) fn graph(&self) -> &DiGraph<FlowNode, FlowArc> {
        &self.graph
    }
}

#[derive(Clone, Debug, Default)]
pub struct NetworkBuilder {
    arcs: Vec<ArcSpec>,
    supplies: BTreeMap<NodeId, i64>,
    payloads: BTreeMap<NodeId, NodePayload>,
}

impl NetworkBuilder {
    pub fn new() -> Self {
        NetworkBuilder::default()
    }
    /// Zips the four parallel arc arrays into arc records.
    pub fn from_arrays(
        tails: &[NodeId],
        heads: &[NodeId],
        capacities: &[i64],
        unit_costs: &[i64],
    ) -> Result<Self, BuildError> {
        let len = tails.len();
        if heads.len() != len || capacities.len() != len || unit_costs.len() != len {
            return Err(BuildError::ShapeMismatch {
                tails: tails.len(),
                heads: heads.len(),
                capacities: capacities.len(),
                unit_costs: unit_costs.len(),
            });
        }
        let arcs = (0..len)
            .map(|i| ArcSpec::new(tails[i], heads[i], capacities[i], unit_costs[i]))
            .collect();
        Ok(NetworkBuilder {
            arcs,
            ..Default::default()
        })
    }
    pub fn add_arc(&mut self, arc: ArcSpec) -> ArcId {
        self.arcs.push(arc);
        self.arcs.len() - 1
    }
    pub fn arcs<I: IntoIterator<Item = ArcSpec>>(mut self, arcs: I) -> Self {
        self.arcs.extend(arcs);
        self
    }
    /// Sets (not adds to) the supply of a node.
    pub fn set_supply(&mut self, node: NodeId, supply: i64) {
        self.supplies.insert(node, supply);
    }
    pub fn supplies<I: IntoIterator<Item = (NodeId, i64)>>(mut self, supplies: I) -> Self {
        self.supplies.extend(supplies);
        self
    }
    pub fn set_payload(&mut self, node: NodeId, payload: NodePayload) {
        self.payloads.insert(node, payload);
    }
    pub fn payloads<I: IntoIterator<Item = (NodeId, NodePayload)>>(mut self, payloads: I) -> Self {
        self.payloads.extend(payloads);
        self
    }
    pub fn build(mut self) -> Result<Network, BuildError> {
        self.validate()?;
        let ids: BTreeSet<NodeId> = self
            .arcs
            .iter()
            .flat_map(|arc| [arc.tail, arc.head])
            .chain(self.supplies.keys().copied())
            .chain(self.payloads.keys().copied())
            .collect();
        let mut graph = DiGraph::with_capacity(ids.len(), self.arcs.len());
        let mut index = HashMap::with_capacity(ids.len());
        for id in ids {
            let node = FlowNode {
                id,
                supply: self.supplies.get(&id).copied().unwrap_or(0),
                payload: self.payloads.remove(&id),
            };
            index.insert(id, graph.add_node(node));
        }
        for arc in self.arcs.iter() {
            graph.add_edge(
                index[&arc.tail],
                index[&arc.head],
                FlowArc {
                    capacity: arc.capacity,
                    unit_cost: arc.unit_cost,
                },
            );
        }
        Ok(Network { graph, index })
    }
    fn validate(&self) -> Result<(), BuildError> {
        if let Some((arc, spec)) = self.arcs.iter().enumerate().find(|(_, a)| a.capacity < 0) {
            return Err(BuildError::InvalidCapacity {
                arc,
                capacity: spec.capacity,
            });
        }
        let total: i128 = self.supplies.values().map(|s| *s as i128).sum();
        if total != 0 {
            return Err(BuildError::UnbalancedSupply { total });
        }
        let max_capacity = self.arcs.iter().map(|a| a.capacity).max().unwrap_or(0) as i128;
        let max_cost = self
            .arcs
            .iter()
            .map(|a| a.unit_cost.unsigned_abs())
            .max()
            .unwrap_or(0) as i128;
        let bound = (self.arcs.len() as i128)
            .checked_mul(max_capacity)
            .and_then(|b| b.checked_mul(max_cost))
            .unwrap_or(i128::MAX);
        if bound > i64::MAX as i128 {
            return Err(BuildError::CostOverflow { bound });
        }
        let positive: i128 = self.supplies.values().map(|s| (*s).max(0) as i128).sum();
        if positive > i64::MAX as i128 {
            return Err(BuildError::CostOverflow { bound: positive });
        }
        Ok(())
    }
}
