use serde::{Deserialize, Serialize};
use std::fmt::Display;

pub type NodeId = i64;
pub type ArcId = usize;

/// Structural super-source/super-sink. Never aggregated.
pub const STRUCTURAL_NODE: NodeId = 0;

#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug)]
pub struct ArcSpec {
    // tail -> head, at most `capacity` units at `unit_cost` each
    pub tail: NodeId,
    pub head: NodeId,
    pub capacity: i64,
    pub unit_cost: i64,
}

impl ArcSpec {
    pub fn new(tail: NodeId, head: NodeId, capacity: i64, unit_cost: i64) -> Self {
        ArcSpec {
            tail,
            head,
            capacity,
            unit_cost,
        }
    }
}

impl Display for ArcSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} -> {} [cap {}, cost {}]",
            self.tail, self.head, self.capacity, self.unit_cost
        )
    }
}

#[derive(Clone, Eq, PartialEq, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub user_id: i64,
    pub username: String,
}

#[derive(Clone, Eq, PartialEq, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameRecord {
    pub game_id: i64,
    pub name: String,
    pub min_players: i64,
    pub max_players: i64,
}

#[derive(Clone, Eq, PartialEq, Hash, Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum NodePayload {
    User(UserRecord),
    Game(GameRecord),
}

impl NodePayload {
    pub fn user(user_id: i64, username: &str) -> Self {
        NodePayload::User(UserRecord {
            user_id,
            username: username.to_owned(),
        })
    }
    pub fn game(game_id: i64, name: &str, min_players: i64, max_players: i64) -> Self {
        NodePayload::Game(GameRecord {
            game_id,
            name: name.to_owned(),
            min_players,
            max_players,
        })
    }
    pub fn kind(&self) -> PayloadKind {
        match self {
            NodePayload::User(_) => PayloadKind::User,
            NodePayload::Game(_) => PayloadKind::Game,
        }
    }
    pub fn as_user(&self) -> Option<&UserRecord> {
        match self {
            NodePayload::User(user) => Some(user),
            NodePayload::Game(_) => None,
        }
    }
    pub fn as_game(&self) -> Option<&GameRecord> {
        match self {
            NodePayload::Game(game) => Some(game),
            NodePayload::User(_) => None,
        }
    }
}

#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug)]
pub enum PayloadKind {
    User,
    Game,
}

impl Display for PayloadKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PayloadKind::User => write!(f, "user"),
            PayloadKind::Game => write!(f, "game"),
        }
    }
}
