// Bracket state: the session-owned mapping of game -> chosen winner name.
// Writes are never rejected; whether a winner is still a valid occupant of its game is decided
// lazily by the deriver and the assessor.

use crate::game::{GameId, GameIdError, SelectionEvent};
use fnv::FnvHashMap;
use serde::{Deserialize, Serialize};

/// What happens to downstream picks when an earlier pick changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ResetPolicy {
    /// Stale downstream winners stay recorded until the user overwrites them.
    Preserve,
    /// Downstream games still holding the replaced team are cleared along its path.
    #[default]
    ClearDependents,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BracketState {
    winners: FnvHashMap<GameId, String>,
    policy: ResetPolicy,
}

impl BracketState {
    pub fn new(policy: ResetPolicy) -> BracketState {
        BracketState {
            winners: FnvHashMap::default(),
            policy,
        }
    }

    pub fn policy(&self) -> ResetPolicy {
        self.policy
    }

    /// Records, overwrites or (with `None`) removes the winner of a game.
    pub fn apply_selection(&mut self, game: GameId, winner: Option<String>) {
        let previous = match winner {
            Some(name) => self.winners.insert(game, name),
            None => self.winners.remove(&game),
        };

        if self.policy == ResetPolicy::ClearDependents {
            if let Some(old) = previous {
                if self.winners.get(&game) != Some(&old) {
                    self.clear_downstream(game, &old);
                }
            }
        }
    }

    /// Validates a raw event at the boundary and applies it.
    pub fn apply_event(&mut self, event: &SelectionEvent) -> Result<GameId, GameIdError> {
        let game = event.game_id()?;
        self.apply_selection(game, event.winner.clone());
        Ok(game)
    }

    pub fn get_winner(&self, game: &GameId) -> Option<&str> {
        self.winners.get(game).map(String::as_str)
    }

    pub fn clear(&mut self, game: &GameId) {
        self.apply_selection(*game, None);
    }

    pub fn reset(&mut self) {
        log::debug!("Resetting bracket state ({} picks)", self.winners.len());
        self.winners.clear();
    }

    pub fn len(&self) -> usize {
        self.winners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.winners.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&GameId, &str)> {
        self.winners.iter().map(|(id, name)| (id, name.as_str()))
    }

    fn clear_downstream(&mut self, game: GameId, replaced: &str) {
        let mut next = game.successor();
        while let Some(id) = next {
            if self.winners.get(&id).map(String::as_str) != Some(replaced) {
                break;
            }
            log::debug!("Clearing stale pick {} for {}", replaced, id);
            self.winners.remove(&id);
            next = id.successor();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{Region, Round, Slot};

    fn id(slot: Slot, round: u8, index: usize) -> GameId {
        GameId::new(slot, round, index).unwrap()
    }

    fn east(round: u8, index: usize) -> GameId {
        id(Slot::Region(Region::East), round, index)
    }

    #[test]
    fn test_apply_and_get_winner() {
        let mut state = BracketState::default();
        assert!(state.get_winner(&east(1, 0)).is_none());
        state.apply_selection(east(1, 0), Some("Connecticut".to_string()));
        assert_eq!(state.get_winner(&east(1, 0)), Some("Connecticut"));
        state.apply_selection(east(1, 0), Some("Stetson".to_string()));
        assert_eq!(state.get_winner(&east(1, 0)), Some("Stetson"));
        assert_eq!(state.len(), 1);
    }

    #[test]
    fn test_write_path_accepts_any_name() {
        let mut state = BracketState::default();
        state.apply_selection(east(2, 0), Some("Not A Team".to_string()));
        assert_eq!(state.get_winner(&east(2, 0)), Some("Not A Team"));
    }

    #[test]
    fn test_clear_dependents_follows_replaced_team() {
        let mut state = BracketState::new(ResetPolicy::ClearDependents);
        let path = [east(1, 0), east(2, 0), east(3, 0), east(4, 0), id(Slot::Final, 5, 0), id(Slot::Final, 6, 0)];
        for game in path {
            state.apply_selection(game, Some("Connecticut".to_string()));
        }
        // An unrelated pick along a different path stays put
        state.apply_selection(east(1, 1), Some("Northwestern".to_string()));

        state.apply_selection(east(1, 0), Some("Stetson".to_string()));
        assert_eq!(state.get_winner(&east(1, 0)), Some("Stetson"));
        for game in &path[1..] {
            assert!(state.get_winner(game).is_none(), "{} should be cleared", game);
        }
        assert_eq!(state.get_winner(&east(1, 1)), Some("Northwestern"));
    }

    #[test]
    fn test_clear_dependents_stops_at_other_team() {
        let mut state = BracketState::new(ResetPolicy::ClearDependents);
        state.apply_selection(east(1, 0), Some("Connecticut".to_string()));
        state.apply_selection(east(2, 0), Some("Northwestern".to_string()));
        state.apply_selection(east(3, 0), Some("Connecticut".to_string()));

        state.apply_selection(east(1, 0), Some("Stetson".to_string()));
        assert_eq!(state.get_winner(&east(2, 0)), Some("Northwestern"));
        // Chain stops at the first game not held by the replaced team
        assert_eq!(state.get_winner(&east(3, 0)), Some("Connecticut"));
    }

    #[test]
    fn test_preserve_policy_keeps_stale_winners() {
        let mut state = BracketState::new(ResetPolicy::Preserve);
        state.apply_selection(east(1, 0), Some("Connecticut".to_string()));
        state.apply_selection(east(2, 0), Some("Connecticut".to_string()));
        state.apply_selection(east(1, 0), Some("Stetson".to_string()));
        assert_eq!(state.get_winner(&east(2, 0)), Some("Connecticut"));
    }

    #[test]
    fn test_clear_and_reset() {
        let mut state = BracketState::default();
        state.apply_selection(east(1, 0), Some("Connecticut".to_string()));
        state.apply_selection(east(2, 0), Some("Connecticut".to_string()));
        state.clear(&east(1, 0));
        assert!(state.get_winner(&east(1, 0)).is_none());
        assert!(state.get_winner(&east(2, 0)).is_none());

        state.apply_selection(east(1, 3), Some("Auburn".to_string()));
        state.reset();
        assert!(state.is_empty());
    }

    #[test]
    fn test_apply_event_validates_boundary() {
        let mut state = BracketState::default();
        let ok = SelectionEvent { region: "WEST".into(), round: 4, index: 0, winner: Some("Arizona".into()) };
        let game = state.apply_event(&ok).unwrap();
        assert_eq!(game.round(), Round::Elite8);
        assert_eq!(state.get_winner(&game), Some("Arizona"));

        let bad = SelectionEvent { region: "west".into(), round: 4, index: 1, winner: None };
        assert!(state.apply_event(&bad).is_err());
        assert_eq!(state.len(), 1);
    }
}
