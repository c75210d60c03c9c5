use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::common::{
    ArcId, GameRecord, NodeId, NodePayload, PayloadKind, UserRecord, STRUCTURAL_NODE,
};
use crate::error::AggregateError;
use crate::network::Network;
use crate::solution::FlowSolution;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatedUser {
    pub id: i64,
    pub username: String,
    pub ranking: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameAssignment {
    pub game_name: String,
    pub min_players: i64,
    pub max_players: i64,
    pub cost: i64,
    pub user_list: Vec<SeatedUser>,
}

impl GameAssignment {
    pub fn players(&self) -> usize {
        self.user_list.len()
    }
    pub fn has_enough_players(&self) -> bool {
        self.players() as i64 >= self.min_players
    }
}

/// Games keyed by their domain id.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Assignment(pub(crate) BTreeMap<i64, GameAssignment>);

impl Assignment {
    pub fn new() -> Self {
        Assignment::default()
    }
    pub fn get(&self, game_id: i64) -> Option<&GameAssignment> {
        self.0.get(&game_id)
    }
    pub fn games(&self) -> impl Iterator<Item = (i64, &GameAssignment)> + '_ {
        self.0.iter().map(|(id, game)| (*id, game))
    }
    pub fn len(&self) -> usize {
        self.0.len()
    }
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(i64, GameAssignment)> for Assignment {
    fn from_iter<I: IntoIterator<Item = (i64, GameAssignment)>>(iter: I) -> Self {
        Assignment(BTreeMap::from_iter(iter))
    }
}

fn payload(network: &Network, node: NodeId, arc: ArcId) -> Result<&NodePayload, AggregateError> {
    network
        .payload(node)
        .ok_or(AggregateError::MissingMetadata { node, arc })
}

fn game_at(network: &Network, node: NodeId, arc: ArcId) -> Result<&GameRecord, AggregateError> {
    payload(network, node, arc)?
        .as_game()
        .ok_or(AggregateError::MetadataKind {
            node,
            arc,
            expected: PayloadKind::Game,
        })
}

fn user_at(network: &Network, node: NodeId, arc: ArcId) -> Result<&UserRecord, AggregateError> {
    payload(network, node, arc)?
        .as_user()
        .ok_or(AggregateError::MetadataKind {
            node,
            arc,
            expected: PayloadKind::User,
        })
}

/// Groups the users seated by `solution` under the games they flow into.
///
/// Arcs are visited in id order; arcs into the structural node or without flow
/// are skipped. Each remaining arc lists its user once, with the arc's unit
/// cost as their ranking, whatever the amount of flow it carries.
pub fn aggregate(network: &Network, solution: &FlowSolution) -> Result<Assignment, AggregateError> {
    let mut games: BTreeMap<i64, GameAssignment> = BTreeMap::new();
    for (arc, _) in solution.used_arcs() {
        let Some(spec) = network.arc(arc) else {
            continue;
        };
        if spec.head <= STRUCTURAL_NODE {
            continue;
        }
        let game = game_at(network, spec.head, arc)?;
        let user = user_at(network, spec.tail, arc)?;
        let entry = games.entry(game.game_id).or_insert_with(|| GameAssignment {
            game_name: game.name.clone(),
            min_players: game.min_players,
            max_players: game.max_players,
            cost: 0,
            user_list: Vec::new(),
        });
        entry.user_list.push(SeatedUser {
            id: user.user_id,
            username: user.username.clone(),
            ranking: spec.unit_cost,
        });
        entry.cost += spec.unit_cost;
    }
    Ok(Assignment(games))
}
