// Game identity for the 63-game bracket: regions, rounds and the typed (slot, round, index) key
// Selection events coming from the presentation layer are validated here, once, before they
// reach the bracket state or the matchup deriver.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GameIdError {
    #[error("Invalid region name: {0}")]
    UnknownRegion(String),
    #[error("Round number must be between 1 and 6, but was {0}")]
    RoundOutOfRange(u8),
    #[error("Round name not recognised: {0}")]
    UnknownRound(String),
    #[error("{round} is not played in the {slot} slot")]
    SlotMismatch { slot: Slot, round: Round },
    #[error("{round} has {games} games per slot, index {index} is out of range")]
    IndexOutOfRange { round: Round, games: usize, index: usize },
    #[error("Malformed game key: {0}")]
    MalformedKey(String),
}

/// The four tournament regions, in bracket order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Region {
    East,
    West,
    South,
    Midwest,
}

impl Region {
    pub const ALL: [Region; 4] = [Region::East, Region::West, Region::South, Region::Midwest];

    pub fn name(&self) -> &'static str {
        match self {
            Region::East => "East",
            Region::West => "West",
            Region::South => "South",
            Region::Midwest => "Midwest",
        }
    }

    pub fn index(&self) -> usize {
        match self {
            Region::East => 0,
            Region::West => 1,
            Region::South => 2,
            Region::Midwest => 3,
        }
    }

    /// Final Four game this region's champion plays in: East/West meet in game 0, South/Midwest in game 1
    pub fn final_four_game(&self) -> usize {
        self.index() / 2
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Region {
    type Err = GameIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "east" => Ok(Region::East),
            "west" => Ok(Region::West),
            "south" => Ok(Region::South),
            "midwest" => Ok(Region::Midwest),
            _ => Err(GameIdError::UnknownRegion(s.to_string())),
        }
    }
}

/// Tournament rounds, numbered 1 (First Round) through 6 (Championship).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Round {
    FirstRound,
    SecondRound,
    Sweet16,
    Elite8,
    FinalFour,
    Championship,
}

impl Round {
    pub const ALL: [Round; 6] = [
        Round::FirstRound,
        Round::SecondRound,
        Round::Sweet16,
        Round::Elite8,
        Round::FinalFour,
        Round::Championship,
    ];

    pub fn number(&self) -> u8 {
        match self {
            Round::FirstRound => 1,
            Round::SecondRound => 2,
            Round::Sweet16 => 3,
            Round::Elite8 => 4,
            Round::FinalFour => 5,
            Round::Championship => 6,
        }
    }

    pub fn from_number(number: u8) -> Result<Round, GameIdError> {
        match number {
            1..=6 => Ok(Round::ALL[(number - 1) as usize]),
            _ => Err(GameIdError::RoundOutOfRange(number)),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Round::FirstRound => "First Round",
            Round::SecondRound => "Second Round",
            Round::Sweet16 => "Sweet 16",
            Round::Elite8 => "Elite 8",
            Round::FinalFour => "Final Four",
            Round::Championship => "Championship",
        }
    }

    /// Games per slot: per region for rounds 1-4, for the final slot otherwise
    pub fn games_per_slot(&self) -> usize {
        match self {
            Round::FirstRound => 8,
            Round::SecondRound => 4,
            Round::Sweet16 => 2,
            Round::Elite8 => 1,
            Round::FinalFour => 2,
            Round::Championship => 1,
        }
    }

    pub fn is_regional(&self) -> bool {
        self.number() <= 4
    }

    pub fn previous(&self) -> Option<Round> {
        match self {
            Round::FirstRound => None,
            _ => Some(Round::ALL[(self.number() - 2) as usize]),
        }
    }

    /// Highest seed that still counts as a favourite in this round.
    pub fn underdog_threshold(&self) -> u8 {
        match self {
            Round::FirstRound => 8,
            Round::SecondRound => 4,
            Round::Sweet16 => 2,
            Round::Elite8 | Round::FinalFour | Round::Championship => 1,
        }
    }
}

impl fmt::Display for Round {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Round {
    type Err = GameIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "first round" | "round of 64" => Ok(Round::FirstRound),
            "second round" | "round of 32" => Ok(Round::SecondRound),
            "sweet 16" | "sweet sixteen" => Ok(Round::Sweet16),
            "elite 8" | "elite eight" => Ok(Round::Elite8),
            "final four" => Ok(Round::FinalFour),
            "championship" => Ok(Round::Championship),
            _ => Err(GameIdError::UnknownRound(s.to_string())),
        }
    }
}

/// Where a game is played: inside one region (rounds 1-4) or in the cross-region final slot (rounds 5-6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Slot {
    Region(Region),
    Final,
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Slot::Region(region) => f.write_str(&region.name().to_lowercase()),
            Slot::Final => f.write_str("final"),
        }
    }
}

impl FromStr for Slot {
    type Err = GameIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("final") {
            Ok(Slot::Final)
        } else {
            s.parse::<Region>().map(Slot::Region)
        }
    }
}

/// Typed identity of one of the 63 games. Fields are private so every id is a valid one;
/// deserialisation goes through the same checks as `GameId::new`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "RawGameId")]
pub struct GameId {
    slot: Slot,
    round: Round,
    index: usize,
}

/// Unchecked wire shape of a `GameId`.
#[derive(Deserialize)]
struct RawGameId {
    slot: Slot,
    round: Round,
    index: usize,
}

impl TryFrom<RawGameId> for GameId {
    type Error = GameIdError;

    fn try_from(raw: RawGameId) -> Result<GameId, GameIdError> {
        GameId::new(raw.slot, raw.round.number(), raw.index)
    }
}

impl GameId {
    pub fn new(slot: Slot, round_number: u8, index: usize) -> Result<GameId, GameIdError> {
        let round = Round::from_number(round_number)?;
        let slot_ok = match slot {
            Slot::Region(_) => round.is_regional(),
            Slot::Final => !round.is_regional(),
        };
        if !slot_ok {
            return Err(GameIdError::SlotMismatch { slot, round });
        }
        if index >= round.games_per_slot() {
            return Err(GameIdError::IndexOutOfRange {
                round,
                games: round.games_per_slot(),
                index,
            });
        }
        Ok(GameId { slot, round, index })
    }

    /// Internal shorthand for ids whose validity is guaranteed by construction.
    pub(crate) fn regional(region: Region, round: Round, index: usize) -> GameId {
        GameId { slot: Slot::Region(region), round, index }
    }

    pub(crate) fn final_slot(round: Round, index: usize) -> GameId {
        GameId { slot: Slot::Final, round, index }
    }

    /// Parses the legacy `east_round1_game_0` / `final_round6_game_0` key form.
    pub fn parse(key: &str) -> Result<GameId, GameIdError> {
        let malformed = || GameIdError::MalformedKey(key.to_string());
        let mut parts = key.split('_');
        let slot: Slot = parts.next().ok_or_else(malformed)?.parse()?;
        let round_number: u8 = parts
            .next()
            .and_then(|p| p.strip_prefix("round"))
            .and_then(|n| n.parse().ok())
            .ok_or_else(malformed)?;
        if parts.next() != Some("game") {
            return Err(malformed());
        }
        let index: usize = parts.next().and_then(|n| n.parse().ok()).ok_or_else(malformed)?;
        if parts.next().is_some() {
            return Err(malformed());
        }
        GameId::new(slot, round_number, index)
    }

    pub fn slot(&self) -> Slot {
        self.slot
    }

    pub fn round(&self) -> Round {
        self.round
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn region(&self) -> Option<Region> {
        match self.slot {
            Slot::Region(region) => Some(region),
            Slot::Final => None,
        }
    }

    /// The two games whose winners meet in this game; None for the first round.
    pub fn feeders(&self) -> Option<[GameId; 2]> {
        let prev = self.round.previous()?;
        let feeders = match (self.slot, self.round) {
            (Slot::Region(region), _) => [
                GameId::regional(region, prev, self.index * 2),
                GameId::regional(region, prev, self.index * 2 + 1),
            ],
            (Slot::Final, Round::FinalFour) => {
                let first = *Region::ALL.get(self.index * 2)?;
                let second = *Region::ALL.get(self.index * 2 + 1)?;
                [
                    GameId::regional(first, Round::Elite8, 0),
                    GameId::regional(second, Round::Elite8, 0),
                ]
            }
            (Slot::Final, _) => [
                GameId::final_slot(Round::FinalFour, 0),
                GameId::final_slot(Round::FinalFour, 1),
            ],
        };
        Some(feeders)
    }

    /// The game this game's winner advances into; None for the championship.
    pub fn successor(&self) -> Option<GameId> {
        match (self.slot, self.round) {
            (Slot::Region(region), Round::Elite8) => {
                Some(GameId::final_slot(Round::FinalFour, region.final_four_game()))
            }
            (Slot::Region(region), round) => {
                let next = Round::from_number(round.number() + 1).ok()?;
                Some(GameId::regional(region, next, self.index / 2))
            }
            (Slot::Final, Round::FinalFour) => Some(GameId::final_slot(Round::Championship, 0)),
            (Slot::Final, _) => None,
        }
    }

    /// All 63 games; every game appears after both of its feeders.
    pub fn all() -> Vec<GameId> {
        let mut ids = Vec::with_capacity(63);
        for region in Region::ALL {
            for round in &Round::ALL[..4] {
                for index in 0..round.games_per_slot() {
                    ids.push(GameId::regional(region, *round, index));
                }
            }
        }
        for round in [Round::FinalFour, Round::Championship] {
            for index in 0..round.games_per_slot() {
                ids.push(GameId::final_slot(round, index));
            }
        }
        ids
    }
}

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_round{}_game_{}", self.slot, self.round.number(), self.index)
    }
}

/// A raw selection event as it arrives from the presentation layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionEvent {
    pub region: String,
    pub round: u8,
    pub index: usize,
    #[serde(default)]
    pub winner: Option<String>,
}

impl SelectionEvent {
    pub fn game_id(&self) -> Result<GameId, GameIdError> {
        GameId::new(self.region.parse()?, self.round, self.index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_parse_is_case_insensitive() {
        assert_eq!("EAST".parse::<Region>().unwrap(), Region::East);
        assert_eq!("midWest".parse::<Region>().unwrap(), Region::Midwest);
        assert!("north".parse::<Region>().is_err());
        assert_eq!("Final".parse::<Slot>().unwrap(), Slot::Final);
    }

    #[test]
    fn test_game_id_validation() {
        assert!(GameId::new(Slot::Region(Region::East), 1, 7).is_ok());
        assert_eq!(
            GameId::new(Slot::Region(Region::East), 1, 8),
            Err(GameIdError::IndexOutOfRange { round: Round::FirstRound, games: 8, index: 8 })
        );
        assert_eq!(
            GameId::new(Slot::Region(Region::West), 7, 0),
            Err(GameIdError::RoundOutOfRange(7))
        );
        assert!(matches!(
            GameId::new(Slot::Final, 3, 0),
            Err(GameIdError::SlotMismatch { .. })
        ));
        assert!(matches!(
            GameId::new(Slot::Region(Region::South), 5, 0),
            Err(GameIdError::SlotMismatch { .. })
        ));
    }

    #[test]
    fn test_deserialize_validates_game_id() {
        let id: GameId = serde_json::from_str(r#"{"slot":"Final","round":"FinalFour","index":1}"#).unwrap();
        assert_eq!(id, GameId::final_slot(Round::FinalFour, 1));
        assert_eq!(id.index(), 1);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(serde_json::from_str::<GameId>(&json).unwrap(), id);

        assert!(serde_json::from_str::<GameId>(r#"{"slot":"Final","round":"FinalFour","index":3}"#).is_err());
        assert!(serde_json::from_str::<GameId>(r#"{"slot":{"Region":"East"},"round":"FinalFour","index":0}"#).is_err());
        assert!(serde_json::from_str::<GameId>(r#"{"slot":{"Region":"East"},"round":"Sweet16","index":2}"#).is_err());
    }

    #[test]
    fn test_round_underdog_thresholds() {
        let thresholds: Vec<u8> = Round::ALL.iter().map(Round::underdog_threshold).collect();
        assert_eq!(thresholds, vec![8, 4, 2, 1, 1, 1]);
    }

    #[test]
    fn test_parse_legacy_key() {
        let id = GameId::parse("midwest_round3_game_1").unwrap();
        assert_eq!(id, GameId::regional(Region::Midwest, Round::Sweet16, 1));
        assert_eq!(id.to_string(), "midwest_round3_game_1");

        let champ = GameId::parse("final_round6_game_0").unwrap();
        assert_eq!(champ, GameId::final_slot(Round::Championship, 0));

        assert!(GameId::parse("east_round1").is_err());
        assert!(GameId::parse("east_roundx_game_0").is_err());
        assert!(GameId::parse("east_round1_game_0_extra").is_err());
    }

    #[test]
    fn test_all_games_count_and_order() {
        let ids = GameId::all();
        assert_eq!(ids.len(), 63);
        for (pos, id) in ids.iter().enumerate() {
            if let Some(feeders) = id.feeders() {
                for feeder in feeders {
                    let feeder_pos = ids.iter().position(|x| *x == feeder).unwrap();
                    assert!(feeder_pos < pos, "{} listed before its feeder {}", id, feeder);
                }
            }
        }
    }

    #[test]
    fn test_successor_inverts_feeders() {
        for id in GameId::all() {
            if let Some(next) = id.successor() {
                let feeders = next.feeders().unwrap();
                assert!(feeders.contains(&id), "{} does not feed {}", id, next);
            } else {
                assert_eq!(id.round, Round::Championship);
            }
        }
    }

    #[test]
    fn test_final_four_pairs_east_west_and_south_midwest() {
        let ff0 = GameId::final_slot(Round::FinalFour, 0).feeders().unwrap();
        assert_eq!(ff0[0].region(), Some(Region::East));
        assert_eq!(ff0[1].region(), Some(Region::West));
        let ff1 = GameId::final_slot(Round::FinalFour, 1).feeders().unwrap();
        assert_eq!(ff1[0].region(), Some(Region::South));
        assert_eq!(ff1[1].region(), Some(Region::Midwest));
    }

    #[test]
    fn test_selection_event_game_id() {
        let event: SelectionEvent =
            serde_json::from_str(r#"{"region":"South","round":2,"index":3,"winner":"Duke"}"#).unwrap();
        assert_eq!(event.game_id().unwrap(), GameId::regional(Region::South, Round::SecondRound, 3));

        let bad: SelectionEvent = serde_json::from_str(r#"{"region":"final","round":2,"index":0}"#).unwrap();
        assert!(bad.game_id().is_err());
        assert!(bad.winner.is_none());
    }
}
