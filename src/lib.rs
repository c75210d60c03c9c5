//! Assigns users to games by solving a min-cost flow problem.
//!
//! The pipeline is [`NetworkBuilder`] -> [`MinCostFlowSolver`] ->
//! [`aggregate`]; [`solve`] runs all three.

pub mod assignment;
pub mod common;
pub mod error;
pub mod network;
mod residual;
pub mod selection;
pub mod solution;
pub mod solver;

use std::collections::HashMap;

pub use assignment::{aggregate, Assignment, GameAssignment, SeatedUser};
pub use common::{ArcId, ArcSpec, GameRecord, NodeId, NodePayload, UserRecord, STRUCTURAL_NODE};
pub use error::{AggregateError, BuildError, Error, Result, SolveError};
pub use network::{Network, NetworkBuilder};
pub use selection::{select_best, AssignmentScore};
pub use solution::FlowSolution;
pub use solver::{min_cost_flow, FlowPolicy, MinCostFlowSolver, SolverConfig};

pub fn solve(
    arcs: &[ArcSpec],
    supplies: &HashMap<NodeId, i64>,
    metadata: HashMap<NodeId, NodePayload>,
) -> Result<Assignment> {
    solve_with(SolverConfig::default(), arcs, supplies, metadata)
}

pub fn solve_with(
    config: SolverConfig,
    arcs: &[ArcSpec],
    supplies: &HashMap<NodeId, i64>,
    metadata: HashMap<NodeId, NodePayload>,
) -> Result<Assignment> {
    let network = NetworkBuilder::new()
        .arcs(arcs.iter().copied())
        .supplies(supplies.iter().map(|(node, supply)| (*node, *supply)))
        .payloads(metadata)
        .build()?;
    let solution = min_cost_flow(&network, config)?;
    Ok(aggregate(&network, &solution)?)
}
