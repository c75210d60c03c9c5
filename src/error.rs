use crate::common::{ArcId, NodeId, PayloadKind};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BuildError {
    #[error("arc arrays differ in length: tails={tails}, heads={heads}, capacities={capacities}, unit_costs={unit_costs}")]
    ShapeMismatch {
        tails: usize,
        heads: usize,
        capacities: usize,
        unit_costs: usize,
    },

    #[error("arc {arc} has negative capacity {capacity}")]
    InvalidCapacity { arc: ArcId, capacity: i64 },

    #[error("node supplies sum to {total}, expected 0")]
    UnbalancedSupply { total: i128 },

    #[error("cost bound {bound} does not fit in i64")]
    CostOverflow { bound: i128 },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SolveError {
    #[error("no feasible flow: sent {achieved} of {required} units, stranded supply at nodes {stranded:?}")]
    Infeasible {
        achieved: i64,
        required: i64,
        stranded: Vec<NodeId>,
    },

    #[error("negative-cost cycle through arc {arc}")]
    NegativeCycle { arc: ArcId },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AggregateError {
    #[error("arc {arc} references node {node} which has no metadata")]
    MissingMetadata { node: NodeId, arc: ArcId },

    #[error("arc {arc} expects node {node} to be a {expected}")]
    MetadataKind {
        node: NodeId,
        arc: ArcId,
        expected: PayloadKind,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Solve(#[from] SolveError),

    #[error(transparent)]
    Aggregate(#[from] AggregateError),
}
