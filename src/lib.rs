//! Bracket derivation and assessment for a 64-team, 63-game single-elimination tournament.
//!
//! A bracket is built incrementally from per-game winner selections ([`selection::BracketState`]).
//! Later-round matchups are derived on demand from those selections ([`bracket`]), and a
//! complete or partial bracket can be scored against historical winning-bracket norms
//! ([`assess`]) and laid out as a sectioned report ([`report`]).

pub mod assess;
pub mod bracket;
pub mod config;
pub mod game;
pub mod ingest;
pub mod norms;
pub mod report;
pub mod selection;
pub mod underdog;

pub use assess::{assess, Assessment, RatingLabel};
pub use bracket::{derive_bracket, derive_game, derive_matchups, fill_defaults, Game, Matchup};
pub use game::{GameId, Region, Round, SelectionEvent, Slot};
pub use ingest::{Team, TeamCatalog};
pub use norms::{HistoricalNorms, NormsLoader};
pub use report::{build_report, PlainTextRenderer, Renderer, Report};
pub use selection::{BracketState, ResetPolicy};
pub use underdog::UpsetCategory;
