// Matchup derivation for the 63-game bracket.
// Round 1 is fixed by seeding. Every later game pairs the winners of its two feeder games, where a
// feeder's winner counts only if it is recorded in the bracket state AND is still one of that
// feeder's current occupants. Anything else leaves the slot empty and the game pending.
// Nothing here mutates the bracket state except `fill_defaults`.

use crate::game::{GameId, GameIdError, Round, Slot};
use crate::ingest::{Team, TeamCatalog};
use crate::selection::{BracketState, ResetPolicy};
use serde::Serialize;

// R1 seed pairs in bracket order; game i of round 2 is fed by games 2i and 2i+1
pub const ROUND1_SEED_PAIRS: [[u8; 2]; 8] = [
    [1, 16],
    [8, 9],
    [5, 12],
    [4, 13],
    [6, 11],
    [3, 14],
    [7, 10],
    [2, 15],
];

/// The two slot occupants of a game. Either slot may be empty while earlier rounds are undecided.
#[derive(Serialize, Debug, Clone, Copy, PartialEq)]
pub struct Matchup<'a> {
    pub team1: Option<&'a Team>,
    pub team2: Option<&'a Team>,
}

impl<'a> Matchup<'a> {
    pub fn new(team1: Option<&'a Team>, team2: Option<&'a Team>) -> Matchup<'a> {
        Matchup { team1, team2 }
    }

    /// A game with fewer than two occupants has no resolvable winner.
    pub fn is_pending(&self) -> bool {
        self.team1.is_none() || self.team2.is_none()
    }

    pub fn occupant(&self, name: &str) -> Option<&'a Team> {
        [self.team1, self.team2].into_iter().flatten().find(|t| t.name == name)
    }

    /// The recorded winner, but only while it is still one of the two occupants.
    pub fn resolved_winner(&self, recorded: Option<&str>) -> Option<&'a Team> {
        if self.is_pending() {
            return None;
        }
        recorded.and_then(|name| self.occupant(name))
    }

    /// Winner the presentation layer pre-selects: a still-valid recorded pick is kept,
    /// otherwise the lower seed number wins and equal seeds go to team1.
    pub fn default_winner(&self, recorded: Option<&str>) -> Option<&'a Team> {
        let (team1, team2) = match (self.team1, self.team2) {
            (Some(a), Some(b)) => (a, b),
            _ => return None,
        };
        if let Some(kept) = self.resolved_winner(recorded) {
            return Some(kept);
        }
        if team2.seed < team1.seed {
            Some(team2)
        } else {
            Some(team1)
        }
    }
}

/// A fully derived game: identity, current occupants and the winner that still holds.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Game<'a> {
    pub id: GameId,
    pub team1: Option<&'a Team>,
    pub team2: Option<&'a Team>,
    pub winner: Option<&'a Team>,
}

impl<'a> Game<'a> {
    pub fn is_pending(&self) -> bool {
        self.team1.is_none() || self.team2.is_none()
    }

    pub fn matchup(&self) -> Matchup<'a> {
        Matchup::new(self.team1, self.team2)
    }
}

/// Derives the occupants of a single game from the current bracket state.
pub fn derive_game<'a>(game: &GameId, state: &BracketState, catalog: &'a TeamCatalog) -> Matchup<'a> {
    match game.feeders() {
        None => {
            let region = match game.region() {
                Some(region) => region,
                None => return Matchup::new(None, None),
            };
            let seeds = match ROUND1_SEED_PAIRS.get(game.index()) {
                Some(seeds) => seeds,
                None => return Matchup::new(None, None),
            };
            Matchup::new(
                catalog.team_by_seed(region, seeds[0]),
                catalog.team_by_seed(region, seeds[1]),
            )
        }
        Some([first, second]) => Matchup::new(
            resolve_winner(&first, state, catalog),
            resolve_winner(&second, state, catalog),
        ),
    }
}

/// The winner of a game as far as later rounds are concerned.
pub fn resolve_winner<'a>(game: &GameId, state: &BracketState, catalog: &'a TeamCatalog) -> Option<&'a Team> {
    let name = state.get_winner(game)?;
    // Feeding region first, whole field second
    let team = catalog.find_in_region(game.region(), name)?;
    let matchup = derive_game(game, state, catalog);
    matchup.resolved_winner(Some(team.name.as_str()))
}

/// Ordered matchups for one round of one slot: 8/4/2/1 per region, 2 for the Final Four, 1 for the title game.
pub fn derive_matchups<'a>(
    slot: Slot,
    round: Round,
    state: &BracketState,
    catalog: &'a TeamCatalog,
) -> Result<Vec<Matchup<'a>>, GameIdError> {
    (0..round.games_per_slot())
        .map(|index| {
            let game = GameId::new(slot, round.number(), index)?;
            Ok(derive_game(&game, state, catalog))
        })
        .collect()
}

/// Derives all 63 games in bracket order.
pub fn derive_bracket<'a>(state: &BracketState, catalog: &'a TeamCatalog) -> Vec<Game<'a>> {
    GameId::all()
        .into_iter()
        .map(|id| {
            let matchup = derive_game(&id, state, catalog);
            Game {
                id,
                team1: matchup.team1,
                team2: matchup.team2,
                winner: matchup.resolved_winner(state.get_winner(&id)),
            }
        })
        .collect()
}

/// Applies the default-selection policy to every game in bracket order and returns the number of picks written.
pub fn fill_defaults(state: &mut BracketState, catalog: &TeamCatalog) -> usize {
    let mut written = 0;
    for id in GameId::all() {
        let matchup = derive_game(&id, state, catalog);
        let recorded = state.get_winner(&id);
        if let Some(team) = matchup.default_winner(recorded) {
            if recorded != Some(team.name.as_str()) {
                state.apply_selection(id, Some(team.name.clone()));
                written += 1;
            }
        }
    }
    log::debug!("Filled {} default picks", written);
    written
}

/// Builds a complete bracket from 63 bits in bracket order: `true` keeps the favourite
/// (lower seed, team1 on ties), `false` takes the other team.
pub fn state_from_binary(catalog: &TeamCatalog, bits: &[bool], policy: ResetPolicy) -> BracketState {
    let mut state = BracketState::new(policy);
    for (id, hilo) in GameId::all().into_iter().zip(bits.iter().copied()) {
        let matchup = derive_game(&id, &state, catalog);
        let favourite = match matchup.default_winner(None) {
            Some(team) => team,
            None => continue,
        };
        let pick = if hilo {
            Some(favourite)
        } else {
            [matchup.team1, matchup.team2].into_iter().flatten().find(|t| t.name != favourite.name)
        };
        if let Some(team) = pick {
            state.apply_selection(id, Some(team.name.clone()));
        }
    }
    state
}
