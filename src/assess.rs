// Assessment engine: scores a (possibly partial) bracket against historical winning-bracket norms.
// The result is a pure function of (bracket state, team catalog, norms, pool size) and is recomputed
// in full on every request. Failures inside the computation come back as an error assessment,
// never as an Err or a panic.

use crate::bracket::derive_bracket;
use crate::game::{Region, Round};
use crate::ingest::TeamCatalog;
use crate::norms::{HistoricalNorms, NormsError, UpsetBand};
use crate::selection::BracketState;
use crate::underdog::{count_underdogs_by_round, underdog_records, Selections, UnderdogCounts, UnderdogRecord, UpsetCategory};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Denominator for the percentage: 7 band categories x 5, 10 upset credits x 3, 10 for the champion.
/// Actual totals can exceed it.
pub const MAX_SCORE: u32 = 75;
pub const TOP_SPECIFIC_UPSETS: usize = 10;
pub const CHAMPION_RECOMMENDATIONS: usize = 3;

const BAND_GOOD_POINTS: u32 = 5;
const BAND_NEAR_POINTS: u32 = 2;
const BAND_NEAR_DISTANCE: u32 = 2;
const UPSET_FOUND_POINTS: u32 = 3;
const CHAMPION_POINTS: u32 = 10;

#[derive(Debug, Error)]
pub enum AssessmentError {
    #[error("Malformed historical norms: {0}")]
    Norms(#[from] NormsError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RatingLabel {
    Excellent,
    VeryGood,
    Good,
    Fair,
    NeedsImprovement,
}

impl RatingLabel {
    pub fn from_score(score: u32) -> RatingLabel {
        match score {
            60.. => RatingLabel::Excellent,
            45..=59 => RatingLabel::VeryGood,
            30..=44 => RatingLabel::Good,
            15..=29 => RatingLabel::Fair,
            _ => RatingLabel::NeedsImprovement,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RatingLabel::Excellent => "Excellent",
            RatingLabel::VeryGood => "Very Good",
            RatingLabel::Good => "Good",
            RatingLabel::Fair => "Fair",
            RatingLabel::NeedsImprovement => "Needs Improvement",
        }
    }
}

impl fmt::Display for RatingLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BandStatus {
    Good,
    TooMany,
    TooFew,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BandAssessment {
    pub category: UpsetCategory,
    pub count: u32,
    pub band: UpsetBand,
    pub status: BandStatus,
    /// How far outside the band the count sits; 0 when good
    pub distance: u32,
}

impl BandAssessment {
    pub fn new(category: UpsetCategory, count: u32, band: UpsetBand) -> BandAssessment {
        let (status, distance) = if count > band.max {
            (BandStatus::TooMany, count - band.max)
        } else if count < band.min {
            (BandStatus::TooFew, band.min - count)
        } else {
            (BandStatus::Good, 0)
        };
        BandAssessment { category, count, band, status, distance }
    }

    pub fn points(&self) -> u32 {
        match self.status {
            BandStatus::Good => BAND_GOOD_POINTS,
            _ if self.distance <= BAND_NEAR_DISTANCE => BAND_NEAR_POINTS,
            _ => 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValuableUpset {
    pub round: Round,
    pub team: String,
    pub seed: u8,
    pub region: Option<Region>,
    pub freq_diff: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChampionSignal {
    /// No champion picked yet
    Undecided,
    Positive,
    Neutral,
    Negative,
    /// Picked, but absent from the historical table
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChampionRecommendation {
    pub team: String,
    pub seed: u8,
    pub region: Option<Region>,
    pub freq_diff: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChampionAssessment {
    pub champion: Option<String>,
    pub seed: Option<u8>,
    pub region: Option<Region>,
    pub value: f64,
    pub signal: ChampionSignal,
    pub recommendations: Vec<ChampionRecommendation>,
}

impl ChampionAssessment {
    fn undecided() -> ChampionAssessment {
        ChampionAssessment {
            champion: None,
            seed: None,
            region: None,
            value: 0.0,
            signal: ChampionSignal::Undecided,
            recommendations: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Assessment {
    pub pool_size: u32,
    pub error: Option<String>,
    pub selections: Selections,
    pub underdogs: Vec<UnderdogRecord>,
    pub underdog_counts: UnderdogCounts,
    pub valuable_upsets_found: Vec<ValuableUpset>,
    /// Ranked best first; consumers show the first five
    pub valuable_upsets_missing: Vec<ValuableUpset>,
    pub champion: ChampionAssessment,
    /// In fixed category order, only for categories that were assessed
    pub upset_bands: Vec<BandAssessment>,
    pub score: u32,
    pub max_score: u32,
    pub rating: RatingLabel,
}

impl Assessment {
    /// An assessment that failed: carries the message and zeroed fields.
    pub fn error(pool_size: u32, message: String) -> Assessment {
        Assessment {
            pool_size,
            error: Some(message),
            selections: Selections::default(),
            underdogs: Vec::new(),
            underdog_counts: UnderdogCounts::default(),
            valuable_upsets_found: Vec::new(),
            valuable_upsets_missing: Vec::new(),
            champion: ChampionAssessment::undecided(),
            upset_bands: Vec::new(),
            score: 0,
            max_score: MAX_SCORE,
            rating: RatingLabel::NeedsImprovement,
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn percentage(&self) -> f64 {
        self.score as f64 / self.max_score as f64 * 100.0
    }

    pub fn band(&self, category: UpsetCategory) -> Option<&BandAssessment> {
        self.upset_bands.iter().find(|b| b.category == category)
    }
}

/// Winners that still hold in the current bracket, grouped by round.
pub fn resolve_selections(state: &BracketState, catalog: &TeamCatalog) -> Selections {
    let mut selections = Selections::default();
    for game in derive_bracket(state, catalog) {
        if let Some(winner) = game.winner {
            selections.push(game.id.round(), winner.clone());
        }
    }
    let ignored = state.len().saturating_sub(selections.len());
    if ignored > 0 {
        log::warn!("{} recorded picks no longer match their game and were ignored", ignored);
    }
    selections
}

/// Scores a bracket. Never fails: problems come back as an error assessment.
pub fn assess(state: &BracketState, catalog: &TeamCatalog, norms: &HistoricalNorms, pool_size: u32) -> Assessment {
    match try_assess(state, catalog, norms, pool_size) {
        Ok(assessment) => assessment,
        Err(e) => {
            log::error!("Assessment failed for pool size {}: {}", pool_size, e);
            Assessment::error(pool_size, e.to_string())
        }
    }
}

pub fn try_assess(
    state: &BracketState,
    catalog: &TeamCatalog,
    norms: &HistoricalNorms,
    pool_size: u32,
) -> Result<Assessment, AssessmentError> {
    norms.validate()?;

    let selections = resolve_selections(state, catalog);
    let underdogs = underdog_records(&selections);
    let underdog_counts = count_underdogs_by_round(&selections);

    let valuable_upsets_found: Vec<ValuableUpset> = selections
        .iter()
        .filter_map(|(round, team)| {
            norms
                .specific_upset(round, &team.name, team.seed)
                .filter(|v| v.freq_diff > 0.0)
                .map(|v| ValuableUpset {
                    round,
                    team: team.name.clone(),
                    seed: team.seed,
                    region: Some(team.region),
                    freq_diff: v.freq_diff,
                })
        })
        .collect();

    let champion = assess_champion(&selections, catalog, norms);
    let upset_bands = assess_bands(&selections, &underdog_counts, norms);

    // Top-10 is already ranked, filtering keeps that order
    let valuable_upsets_missing: Vec<ValuableUpset> = norms
        .top_specific_upsets(TOP_SPECIFIC_UPSETS)
        .into_iter()
        .filter_map(|v| {
            let round = v.round()?;
            if selections.contains(round, &v.team) {
                return None;
            }
            Some(ValuableUpset {
                round,
                team: v.team.clone(),
                seed: v.seed,
                region: catalog.team(&v.team).map(|t| t.region),
                freq_diff: v.freq_diff,
            })
        })
        .collect();

    let mut score: u32 = upset_bands.iter().map(BandAssessment::points).sum();
    score += UPSET_FOUND_POINTS * valuable_upsets_found.len() as u32;
    if champion.value > 0.0 {
        score += CHAMPION_POINTS;
    }

    log::debug!(
        "Assessed {} picks for pool size {}: score {} ({} upsets, {} valuable)",
        selections.len(),
        pool_size,
        score,
        underdog_counts.total,
        valuable_upsets_found.len()
    );

    Ok(Assessment {
        pool_size,
        error: None,
        selections,
        underdogs,
        underdog_counts,
        valuable_upsets_found,
        valuable_upsets_missing,
        champion,
        upset_bands,
        score,
        max_score: MAX_SCORE,
        rating: RatingLabel::from_score(score),
    })
}

fn assess_champion(selections: &Selections, catalog: &TeamCatalog, norms: &HistoricalNorms) -> ChampionAssessment {
    let pick = match selections.champion() {
        Some(team) => team,
        None => return ChampionAssessment::undecided(),
    };

    let (value, signal) = match norms.champion(&pick.name) {
        Some(v) if v.freq_diff > 0.0 => (v.freq_diff, ChampionSignal::Positive),
        Some(v) if v.freq_diff == 0.0 => (0.0, ChampionSignal::Neutral),
        Some(v) => (v.freq_diff, ChampionSignal::Negative),
        None => (0.0, ChampionSignal::Unknown),
    };

    let recommendations = match signal {
        ChampionSignal::Negative | ChampionSignal::Unknown => norms
            .top_champions(CHAMPION_RECOMMENDATIONS)
            .into_iter()
            .map(|v| ChampionRecommendation {
                team: v.team.clone(),
                seed: v.seed,
                region: catalog.team(&v.team).map(|t| t.region),
                freq_diff: v.freq_diff,
            })
            .collect(),
        _ => Vec::new(),
    };

    ChampionAssessment {
        champion: Some(pick.name.clone()),
        seed: Some(pick.seed),
        region: Some(pick.region),
        value,
        signal,
        recommendations,
    }
}

/// Bands are assessed for rounds with at least one pick, and for Total once anything is picked.
fn assess_bands(selections: &Selections, counts: &UnderdogCounts, norms: &HistoricalNorms) -> Vec<BandAssessment> {
    counts
        .iter()
        .filter(|(category, _)| match category {
            UpsetCategory::Round(round) => !selections.winners(*round).is_empty(),
            UpsetCategory::Total => !selections.is_empty(),
        })
        .filter_map(|(category, count)| {
            norms
                .band(category)
                .map(|band| BandAssessment::new(category, count as u32, *band))
        })
        .collect()
}
