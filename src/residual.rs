use petgraph::visit::EdgeRef;

use crate::common::{ArcId, NodeId};
use crate::network::Network;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ArcOrigin {
    Network(ArcId),
    // virtual source -> supply node
    Supply(NodeId),
    // demand node -> virtual sink
    Demand(NodeId),
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct ResidualArc {
    pub to: usize,
    pub capacity: i64,
    pub cost: i64,
    pub origin: ArcOrigin,
}

/// Residual view of a network plus a virtual source and sink.
///
/// Arcs come in pairs: `2k` is the forward arc, `2k + 1` its reverse, so the
/// partner of arc `e` is `e ^ 1`. The reverse arc's capacity is the flow on the
/// forward arc. Real nodes keep their network index, the source and sink come
/// after them.
#[derive(Clone, Debug)]
pub(crate) struct ResidualGraph {
    arcs: Vec<ResidualArc>,
    out: Vec<Vec<usize>>,
    ids: Vec<NodeId>,
    network_arcs: usize,
    pub source: usize,
    pub sink: usize,
}

impl ResidualGraph {
    pub fn new(network: &Network) -> Self {
        let graph = network.graph();
        let n = graph.node_count();
        let mut residual = ResidualGraph {
            arcs: Vec::with_capacity(2 * (graph.edge_count() + n)),
            out: vec![Vec::new(); n + 2],
            ids: graph.node_indices().map(|ix| graph[ix].id).collect(),
            network_arcs: graph.edge_count(),
            source: n,
            sink: n + 1,
        };
        for edge in graph.edge_references() {
            residual.add_pair(
                edge.source().index(),
                edge.target().index(),
                edge.weight().capacity,
                edge.weight().unit_cost,
                ArcOrigin::Network(edge.id().index()),
            );
        }
        for ix in graph.node_indices() {
            let node = &graph[ix];
            if node.supply > 0 {
                residual.add_pair(
                    residual.source,
                    ix.index(),
                    node.supply,
                    0,
                    ArcOrigin::Supply(node.id),
                );
            } else if node.supply < 0 {
                residual.add_pair(
                    ix.index(),
                    residual.sink,
                    -node.supply,
                    0,
                    ArcOrigin::Demand(node.id),
                );
            }
        }
        residual
    }
    fn add_pair(&mut self, from: usize, to: usize, capacity: i64, cost: i64, origin: ArcOrigin) {
        let forward = self.arcs.len();
        self.arcs.push(ResidualArc {
            to,
            capacity,
            cost,
            origin,
        });
        self.arcs.push(ResidualArc {
            to: from,
            capacity: 0,
            cost: -cost,
            origin,
        });
        self.out[from].push(forward);
        self.out[to].push(forward + 1);
    }
    pub fn node_count(&self) -> usize {
        self.out.len()
    }
    pub fn arc(&self, e: usize) -> &ResidualArc {
        &self.arcs[e]
    }
    pub fn arc_count(&self) -> usize {
        self.arcs.len()
    }
    /// Residual arcs leaving `node` with spare capacity, in insertion order.
    pub fn successors(&self, node: usize) -> impl Iterator<Item = (usize, &ResidualArc)> + '_ {
        self.out[node]
            .iter()
            .map(|e| (*e, &self.arcs[*e]))
            .filter(|(_, arc)| arc.capacity > 0)
    }
    /// Node an arc leaves from; the head of its partner.
    pub fn tail(&self, e: usize) -> usize {
        self.arcs[e ^ 1].to
    }
    pub fn node_id(&self, node: usize) -> Option<NodeId> {
        self.ids.get(node).copied()
    }
    pub fn push(&mut self, e: usize, amount: i64) {
        debug_assert!(amount <= self.arcs[e].capacity);
        self.arcs[e].capacity -= amount;
        self.arcs[e ^ 1].capacity += amount;
    }
    /// Flow on the network arc `arc`.
    pub fn flow(&self, arc: ArcId) -> i64 {
        self.arcs[2 * arc + 1].capacity
    }
    pub fn flows(&self) -> Vec<i64> {
        (0..self.network_arcs).map(|arc| self.flow(arc)).collect()
    }
    /// Supply and demand left on the virtual arcs, as signed remainders.
    pub fn unsatisfied(&self) -> Vec<(NodeId, i64)> {
        self.arcs
            .iter()
            .step_by(2)
            .filter(|arc| arc.capacity > 0)
            .filter_map(|arc| match arc.origin {
                ArcOrigin::Supply(id) => Some((id, arc.capacity)),
                ArcOrigin::Demand(id) => Some((id, -arc.capacity)),
                ArcOrigin::Network(_) => None,
            })
            .collect()
    }
}
