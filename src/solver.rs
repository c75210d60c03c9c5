use priority_queue::PriorityQueue;
use std::cmp::Reverse;

use crate::common::NodeId;
use crate::error::SolveError;
use crate::network::Network;
use crate::residual::{ArcOrigin, ResidualGraph};
use crate::solution::FlowSolution;

/// What to do when supply cannot be fully routed to demand.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FlowPolicy {
    /// Fail with `SolveError::Infeasible`.
    #[default]
    RequireSaturation,
    /// Return the maximum flow of minimum cost that could be routed.
    AllowPartial,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SolverConfig {
    pub policy: FlowPolicy,
}

impl SolverConfig {
    pub fn allow_partial() -> Self {
        SolverConfig {
            policy: FlowPolicy::AllowPartial,
        }
    }
}

/// Shortest distances (on reduced costs) from the virtual source, with the
/// residual arc each reached node was entered by.
struct ShortestPaths {
    dist: Vec<Option<i128>>,
    pred: Vec<Option<usize>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct AugmentingPath {
    arcs: Vec<usize>,
    bottleneck: i64,
    origin: NodeId,
    destination: NodeId,
}

/// Successive shortest augmenting paths with Johnson potentials.
///
/// Supply nodes hang off a virtual source and demand nodes feed a virtual
/// sink, so one search from the source finds the cheapest augmenting path over
/// all supply/demand pairs. Reduced costs are `cost - potential[tail] +
/// potential[head]` and stay non-negative on every residual arc.
pub struct MinCostFlowSolver<'a> {
    network: &'a Network,
    residual: ResidualGraph,
    potentials: Vec<i128>,
    config: SolverConfig,
}

impl<'a> MinCostFlowSolver<'a> {
    pub fn new(network: &'a Network, config: SolverConfig) -> Self {
        let residual = ResidualGraph::new(network);
        let potentials = vec![0; residual.node_count()];
        MinCostFlowSolver {
            network,
            residual,
            potentials,
            config,
        }
    }
    pub fn solve(mut self) -> Result<FlowSolution, SolveError> {
        let required = self.network.required_flow();
        let mut achieved: i64 = 0;
        if self.network.arcs().any(|(_, arc)| arc.unit_cost < 0) {
            self.seed_potentials()?;
        }
        while achieved < required {
            let paths = self.shortest_paths();
            let Some(path) = self.select_path(&paths) else {
                break;
            };
            self.update_potentials(&paths);
            self.augment(&path);
            achieved += path.bottleneck;
        }
        let unsatisfied = self.residual.unsatisfied();
        if achieved < required && self.config.policy == FlowPolicy::RequireSaturation {
            return Err(SolveError::Infeasible {
                achieved,
                required,
                stranded: unsatisfied
                    .iter()
                    .filter(|(_, left)| *left > 0)
                    .map(|(id, _)| *id)
                    .collect(),
            });
        }
        let flows = self.residual.flows();
        let total_cost = self
            .network
            .arcs()
            .map(|(arc, spec)| flows[arc] as i128 * spec.unit_cost as i128)
            .sum::<i128>();
        // bounded by the builder's arcs x capacity x |cost| check
        let total_cost = total_cost as i64;
        Ok(FlowSolution::new(flows, total_cost, achieved, unsatisfied))
    }
    /// Bellman-Ford over the initial residual graph, started from every node
    /// at distance 0 so cycles the source cannot reach are found too.
    /// Only needed when some arc has negative cost; afterwards every residual
    /// arc has a non-negative reduced cost.
    fn seed_potentials(&mut self) -> Result<(), SolveError> {
        let n = self.residual.node_count();
        let mut dist: Vec<Option<i128>> = vec![Some(0); n];
        let mut pred: Vec<Option<usize>> = vec![None; n];
        let relax_all = |dist: &mut Vec<Option<i128>>, pred: &mut Vec<Option<usize>>| {
            let mut last_relaxed = None;
            for u in 0..n {
                let Some(d_u) = dist[u] else {
                    continue;
                };
                for (e, arc) in self.residual.successors(u) {
                    let candidate = d_u + arc.cost as i128;
                    if dist[arc.to].map_or(true, |d_v| candidate < d_v) {
                        dist[arc.to] = Some(candidate);
                        pred[arc.to] = Some(e);
                        last_relaxed = Some(arc.to);
                    }
                }
            }
            last_relaxed
        };
        let mut changed = true;
        for _ in 1..n {
            if relax_all(&mut dist, &mut pred).is_none() {
                changed = false;
                break;
            }
        }
        if changed {
            if let Some(mut node) = relax_all(&mut dist, &mut pred) {
                // walking back n steps lands on the cycle
                for _ in 0..n {
                    if let Some(e) = pred[node] {
                        node = self.residual.tail(e);
                    }
                }
                let arc = pred[node]
                    .and_then(|e| match self.residual.arc(e).origin {
                        ArcOrigin::Network(arc) => Some(arc),
                        _ => None,
                    })
                    .unwrap_or_default();
                return Err(SolveError::NegativeCycle { arc });
            }
        }
        for (potential, d) in self.potentials.iter_mut().zip(dist) {
            *potential = -d.unwrap_or(0);
        }
        Ok(())
    }
    fn reduced_cost(&self, e: usize) -> i128 {
        let arc = self.residual.arc(e);
        arc.cost as i128 - self.potentials[self.residual.tail(e)] + self.potentials[arc.to]
    }
    fn shortest_paths(&self) -> ShortestPaths {
        let n = self.residual.node_count();
        let mut dist: Vec<Option<i128>> = vec![None; n];
        let mut pred: Vec<Option<usize>> = vec![None; n];
        let mut visited = vec![false; n];
        let source = self.residual.source;
        // ties on distance pop the lowest node index first
        let mut q: PriorityQueue<usize, (Reverse<i128>, Reverse<usize>)> = PriorityQueue::new();
        dist[source] = Some(0);
        q.push(source, (Reverse(0), Reverse(source)));
        while let Some((x, (Reverse(d_x), _))) = q.pop() {
            visited[x] = true;
            if x == self.residual.sink {
                continue;
            }
            for (e, arc) in self.residual.successors(x) {
                let y = arc.to;
                if visited[y] {
                    continue;
                }
                let x2y_scaled = self.reduced_cost(e);
                debug_assert!(x2y_scaled >= 0, "negative reduced cost on arc {e}");
                let candidate = d_x + x2y_scaled;
                if dist[y].map_or(true, |d_y| candidate < d_y) {
                    dist[y] = Some(candidate);
                    pred[y] = Some(e);
                    q.push_increase(y, (Reverse(candidate), Reverse(y)));
                }
            }
        }
        ShortestPaths { dist, pred }
    }
    /// Among the cheapest augmenting paths in the search tree, the one with the
    /// largest bottleneck, then the lowest origin id, then the lowest
    /// destination id.
    fn select_path(&self, paths: &ShortestPaths) -> Option<AugmentingPath> {
        let sink = self.residual.sink;
        let best = paths.dist[sink]?;
        let mut chosen: Option<AugmentingPath> = None;
        for (e, _) in self.residual_into_sink() {
            let tail = self.residual.tail(e);
            let Some(d_tail) = paths.dist[tail] else {
                continue;
            };
            if d_tail + self.reduced_cost(e) != best {
                continue;
            }
            let Some(path) = self.trace(paths, tail, e) else {
                continue;
            };
            let better = match &chosen {
                None => true,
                Some(current) => {
                    (Reverse(path.bottleneck), path.origin, path.destination)
                        < (Reverse(current.bottleneck), current.origin, current.destination)
                }
            };
            if better {
                chosen = Some(path);
            }
        }
        chosen
    }
    /// Demand arcs into the virtual sink that still have capacity.
    fn residual_into_sink(&self) -> impl Iterator<Item = (usize, NodeId)> + '_ {
        (0..self.residual.arc_count()).step_by(2).filter_map(|e| {
            let arc = self.residual.arc(e);
            match arc.origin {
                ArcOrigin::Demand(id) if arc.capacity > 0 => Some((e, id)),
                _ => None,
            }
        })
    }
    /// Follows the search tree back from `last`'s tail to the source.
    fn trace(&self, paths: &ShortestPaths, from: usize, last: usize) -> Option<AugmentingPath> {
        let mut arcs = vec![last];
        let mut node = from;
        while node != self.residual.source {
            let e = paths.pred[node]?;
            arcs.push(e);
            node = self.residual.tail(e);
        }
        arcs.reverse();
        let origin = self.residual.node_id(self.residual.arc(arcs[0]).to)?;
        let destination = self.residual.node_id(from)?;
        let bottleneck = arcs
            .iter()
            .map(|e| self.residual.arc(*e).capacity)
            .min()?;
        Some(AugmentingPath {
            arcs,
            bottleneck,
            origin,
            destination,
        })
    }
    /// Johnson update, with distances capped at the sink's so unreached nodes
    /// keep valid reduced costs.
    fn update_potentials(&mut self, paths: &ShortestPaths) {
        let Some(cap) = paths.dist[self.residual.sink] else {
            return;
        };
        for (potential, d) in self.potentials.iter_mut().zip(&paths.dist) {
            *potential -= d.map_or(cap, |d| d.min(cap));
        }
    }
    fn augment(&mut self, path: &AugmentingPath) {
        for e in path.arcs.iter() {
            self.residual.push(*e, path.bottleneck);
        }
    }
}

pub fn min_cost_flow(network: &Network, config: SolverConfig) -> Result<FlowSolution, SolveError> {
    MinCostFlowSolver::new(network, config).solve()
}

#[cfg(test)]
mod tests {
    use pathfinding::prelude::{kuhn_munkres_min, Matrix};
    use rand::prelude::*;
    use rand_chacha::ChaCha8Rng;

    use super::*;
    use crate::common::ArcSpec;
    use crate::network::NetworkBuilder;

    fn build(arcs: &[(NodeId, NodeId, i64, i64)], supplies: &[(NodeId, i64)]) -> Network {
        NetworkBuilder::new()
            .arcs(arcs.iter().map(|(t, h, cap, cost)| ArcSpec::new(*t, *h, *cap, *cost)))
            .supplies(supplies.iter().copied())
            .build()
            .unwrap()
    }

    fn generate_network(num_nodes: i64, num_arcs: usize, acyclic: bool, seed: u64) -> Network {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut arcs = Vec::new();
        while arcs.len() < num_arcs {
            let tail = rng.gen_range(1..=num_nodes);
            let head = rng.gen_range(1..=num_nodes);
            if tail == head || (acyclic && tail > head) {
                continue;
            }
            let cost = if acyclic {
                rng.gen_range(-3..=4)
            } else {
                rng.gen_range(0..=4)
            };
            arcs.push((tail, head, rng.gen_range(0..=2), cost));
        }
        let mut supplies: Vec<(NodeId, i64)> =
            (1..num_nodes).map(|id| (id, rng.gen_range(-2..=2))).collect();
        let rest: i64 = supplies.iter().map(|(_, s)| s).sum();
        supplies.push((num_nodes, -rest));
        build(&arcs, &supplies)
    }

    /// (flow value, cost) of the cheapest maximum flow, by enumerating every
    /// flow vector.
    fn brute_force(network: &Network) -> (i64, i64) {
        let arcs: Vec<ArcSpec> = network.arcs().map(|(_, spec)| spec).collect();
        let mut flows = vec![0; arcs.len()];
        let mut best: Option<(i64, i64)> = None;
        loop {
            let balance = |id: NodeId| -> i64 {
                arcs.iter()
                    .zip(&flows)
                    .map(|(a, f)| (a.tail == id) as i64 * f - (a.head == id) as i64 * f)
                    .sum()
            };
            let feasible = network.nodes().all(|node| {
                let b = balance(node.id);
                match node.supply {
                    s if s > 0 => (0..=s).contains(&b),
                    s if s < 0 => (s..=0).contains(&b),
                    _ => b == 0,
                }
            });
            if feasible {
                let value: i64 = network
                    .nodes()
                    .filter(|node| node.supply > 0)
                    .map(|node| balance(node.id))
                    .sum();
                let cost: i64 = arcs.iter().zip(&flows).map(|(a, f)| a.unit_cost * f).sum();
                let candidate = (value, cost);
                best = match best {
                    Some((v, c)) if v > value || (v == value && c <= cost) => Some((v, c)),
                    _ => Some(candidate),
                };
            }
            // next flow vector, mixed radix over capacities
            let mut i = 0;
            while i < flows.len() && flows[i] == arcs[i].capacity {
                flows[i] = 0;
                i += 1;
            }
            if i == flows.len() {
                break;
            }
            flows[i] += 1;
        }
        best.unwrap_or((0, 0))
    }

    fn check_against_brute_force(network: &Network) {
        let (value, cost) = brute_force(network);
        let partial = min_cost_flow(network, SolverConfig::allow_partial()).unwrap();
        assert!(partial.check_solution(network));
        assert_eq!(partial.flow_value(), value);
        assert_eq!(partial.total_cost(), cost);

        let strict = min_cost_flow(network, SolverConfig::default());
        if value == network.required_flow() {
            let strict = strict.unwrap();
            assert!(strict.is_saturating());
            assert_eq!(strict.total_cost(), cost);
        } else {
            assert!(matches!(strict, Err(SolveError::Infeasible { .. })));
        }
    }

    #[test]
    fn test_single_path() {
        let network = build(&[(1, 2, 5, 3)], &[(1, 4), (2, -4)]);
        let solution = min_cost_flow(&network, SolverConfig::default()).unwrap();
        assert_eq!(solution.flows(), &[4]);
        assert_eq!(solution.total_cost(), 12);
        assert_eq!(solution.flow_value(), 4);
    }

    #[test]
    fn test_prefers_cheaper_route() {
        // 1 -> 4 directly costs 10, via 2 and 3 costs 3 but only 1 unit fits
        let network = build(
            &[(1, 4, 2, 10), (1, 2, 1, 1), (2, 3, 5, 1), (3, 4, 5, 1)],
            &[(1, 2), (4, -2)],
        );
        let solution = min_cost_flow(&network, SolverConfig::default()).unwrap();
        assert_eq!(solution.flows(), &[1, 1, 1, 1]);
        assert_eq!(solution.total_cost(), 13);
    }

    #[test]
    fn test_reroutes_through_backward_arc() {
        // the first cheap path takes 1 -> 2 -> 3 -> 4, the second unit must
        // undo 2 -> 3 to reach optimum 1 -> 2 -> 4, 1 -> 3 -> 4
        let network = build(
            &[
                (1, 2, 1, 1),
                (1, 3, 1, 4),
                (2, 3, 1, 1),
                (2, 4, 1, 4),
                (3, 4, 1, 1),
            ],
            &[(1, 2), (4, -2)],
        );
        let solution = min_cost_flow(&network, SolverConfig::default()).unwrap();
        assert!(solution.check_solution(&network));
        assert_eq!(solution.flows(), &[1, 1, 0, 1, 1]);
        assert_eq!(solution.total_cost(), 10);
    }

    #[test]
    fn test_negative_costs_without_cycle() {
        let network = build(&[(1, 2, 1, -3), (2, 3, 1, 1), (1, 3, 1, 0)], &[(1, 1), (3, -1)]);
        let solution = min_cost_flow(&network, SolverConfig::default()).unwrap();
        assert_eq!(solution.flows(), &[1, 1, 0]);
        assert_eq!(solution.total_cost(), -2);
    }

    #[test]
    fn test_negative_cycle() {
        let network = build(&[(1, 2, 1, -2), (2, 1, 1, 1), (1, 3, 1, 0)], &[(1, 1), (3, -1)]);
        let out = min_cost_flow(&network, SolverConfig::default());
        assert!(matches!(out, Err(SolveError::NegativeCycle { arc }) if arc < 2));
    }

    #[test]
    fn test_negative_cycle_away_from_supply() {
        // 5 <-> 6 carries no supply, but circulating it still lowers the cost
        let network = build(
            &[(5, 6, 1, -3), (6, 5, 1, -3), (1, 2, 1, 1)],
            &[(1, 1), (2, -1)],
        );
        let out = min_cost_flow(&network, SolverConfig::default());
        assert!(matches!(out, Err(SolveError::NegativeCycle { arc }) if arc < 2));
    }

    #[test]
    fn test_infeasible() {
        let network = build(&[(1, 2, 1, 1)], &[(1, 2), (2, -2)]);
        let err = min_cost_flow(&network, SolverConfig::default()).unwrap_err();
        assert_eq!(
            err,
            SolveError::Infeasible {
                achieved: 1,
                required: 2,
                stranded: vec![1]
            }
        );
    }

    #[test]
    fn test_partial_flow() {
        let network = build(&[(1, 2, 1, 1)], &[(1, 2), (2, -2)]);
        let solution = min_cost_flow(&network, SolverConfig::allow_partial()).unwrap();
        assert_eq!(solution.flow_value(), 1);
        assert!(!solution.is_saturating());
        assert_eq!(solution.unsatisfied(), &[(1, 1), (2, -1)]);
        assert!(solution.check_solution(&network));
    }

    #[test]
    fn test_empty_network() {
        let network = NetworkBuilder::new().build().unwrap();
        let solution = min_cost_flow(&network, SolverConfig::default()).unwrap();
        assert!(solution.flows().is_empty());
        assert_eq!(solution.total_cost(), 0);
        assert_eq!(solution.flow_value(), 0);
    }

    #[test]
    fn test_zero_supply_leaves_arcs_unused() {
        let network = build(&[(1, 2, 3, -1)], &[]);
        let solution = min_cost_flow(&network, SolverConfig::default()).unwrap();
        assert_eq!(solution.flows(), &[0]);
    }

    #[test]
    fn test_tie_prefers_lowest_origin() {
        let network = build(&[(2, 3, 1, 1), (1, 3, 1, 1)], &[(1, 1), (2, 1), (3, -1), (4, -1)]);
        let solution = min_cost_flow(&network, SolverConfig::allow_partial()).unwrap();
        assert_eq!(solution.flows(), &[0, 1]);
    }

    #[test]
    fn test_two_users_two_games() {
        // u1 -> A costs 1, u1 -> B costs 5, u2 -> A costs 2; A and B each need a player
        let network = build(
            &[(1, 10, 1, 1), (1, 20, 1, 5), (2, 10, 1, 2)],
            &[(1, 1), (2, 1), (10, -1), (20, -1)],
        );
        let solution = min_cost_flow(&network, SolverConfig::default()).unwrap();
        let big: i64 = 1_000;
        let weights = Matrix::from_rows(vec![vec![1, 5], vec![2, big]]).unwrap();
        let (reference, _) = kuhn_munkres_min(&weights);
        assert_eq!(reference, 7);
        assert_eq!(solution.total_cost(), reference);
        assert_eq!(solution.flows(), &[0, 1, 1]);
    }

    #[test]
    fn test_random_against_brute_force() {
        for num_nodes in 2..6 {
            for seed in 0..60 {
                let network = generate_network(num_nodes, 5, false, seed);
                check_against_brute_force(&network);
            }
        }
    }

    #[test]
    fn test_random_acyclic_negative_costs_against_brute_force() {
        for num_nodes in 3..7 {
            for seed in 0..60 {
                let network = generate_network(num_nodes, 5, true, 1000 + seed);
                check_against_brute_force(&network);
            }
        }
    }

    #[test]
    fn test_random_assignment_against_kuhn_munkres() {
        for size in 1..7 {
            for seed in 0..30 {
                let mut rng = ChaCha8Rng::seed_from_u64(seed);
                let costs: Vec<Vec<i64>> = (0..size)
                    .map(|_| (0..size).map(|_| rng.gen_range(1..10)).collect())
                    .collect();
                let mut arcs = Vec::new();
                let mut supplies = Vec::new();
                for (user, row) in costs.iter().enumerate() {
                    let user_node = 1 + user as NodeId;
                    supplies.push((user_node, 1));
                    for (game, cost) in row.iter().enumerate() {
                        arcs.push((user_node, 100 + game as NodeId, 1, *cost));
                    }
                }
                supplies.extend((0..size).map(|game| (100 + game as NodeId, -1)));
                let network = build(&arcs, &supplies);
                let solution = min_cost_flow(&network, SolverConfig::default()).unwrap();
                let (reference, _) = kuhn_munkres_min(&Matrix::from_rows(costs).unwrap());
                assert_eq!(solution.total_cost(), reference);
                assert!(solution.check_solution(&network));
            }
        }
    }

    #[test]
    fn test_deterministic() {
        for seed in 0..20 {
            let network = generate_network(5, 5, false, seed);
            let first = min_cost_flow(&network, SolverConfig::allow_partial()).unwrap();
            let second = min_cost_flow(&network, SolverConfig::allow_partial()).unwrap();
            assert_eq!(first, second);
        }
    }
}
