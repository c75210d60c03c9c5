use std::cmp::Reverse;
use std::collections::HashSet;

use crate::assignment::{Assignment, SeatedUser};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct AssignmentScore {
    pub total_users: usize,
    pub ranking_cost: i64,
}

impl Assignment {
    pub fn score(&self) -> AssignmentScore {
        self.games().fold(AssignmentScore::default(), |score, (_, game)| AssignmentScore {
            total_users: score.total_users + game.players(),
            ranking_cost: score.ranking_cost + game.cost,
        })
    }
    /// Drops games that did not reach their minimum player count.
    pub fn playable(&self) -> Assignment {
        self.games()
            .filter(|(_, game)| game.has_enough_players())
            .map(|(id, game)| (id, game.clone()))
            .collect()
    }
    pub fn seated(&self) -> impl Iterator<Item = &SeatedUser> + '_ {
        self.games().flat_map(|(_, game)| game.user_list.iter())
    }
    /// User ids from `roster` that are not seated in any game, in roster order.
    pub fn unmatched<I: IntoIterator<Item = i64>>(&self, roster: I) -> Vec<i64> {
        let seated: HashSet<i64> = self.seated().map(|user| user.id).collect();
        roster.into_iter().filter(|id| !seated.contains(id)).collect()
    }
}

/// Index of the candidate seating the most users, ties broken by the lowest
/// ranking cost and then by position.
pub fn select_best(candidates: &[Assignment]) -> Option<usize> {
    candidates
        .iter()
        .enumerate()
        .min_by_key(|(index, candidate)| {
            let score = candidate.score();
            (Reverse(score.total_users), score.ranking_cost, *index)
        })
        .map(|(index, _)| index)
}
