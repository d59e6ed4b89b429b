// Historical norms: what winning brackets looked like for a given pool size.
// Three tables come from the external simulator's output (optimal upset counts per round,
// champion pick value, specific upset value). The loader reads them from CSV, caches them per
// pool size and falls back to a fixed default table whenever a dataset is missing or unreadable.

use crate::game::Round;
use crate::underdog::UpsetCategory;
use fnv::FnvHashMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const OPTIMAL_UPSETS_FILE: &str = "optimal_upset_strategy.csv";
pub const CHAMPION_FILE: &str = "champion_pick_comparison.csv";
pub const SPECIFIC_UPSETS_FILE: &str = "specific_upset_comparison.csv";

#[derive(Debug, Error)]
pub enum NormsError {
    #[error("No historical dataset at {}", .0.display())]
    MissingDataset(PathBuf),
    #[error("Failed to read historical table: {0}")]
    Csv(#[from] csv::Error),
    #[error("Unknown round name '{0}' in historical norms")]
    UnknownRound(String),
    #[error("Upset band for {category} has min {min} above max {max}")]
    InvertedBand { category: UpsetCategory, min: u32, max: u32 },
    #[error("freq_diff for '{team}' is not a finite number")]
    NonFiniteValue { team: String },
    #[error("Seed {seed} for '{team}' is outside 1..16")]
    SeedOutOfRange { team: String, seed: u8 },
    #[error("Malformed row in {file}: {detail}")]
    MalformedRow { file: String, detail: String },
}

/// A dataset row that could not be turned into a norm.
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedRow {
    pub file: String,
    pub detail: String,
}

/// Acceptable band of upset picks for one category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpsetBand {
    pub optimal: u32,
    pub min: u32,
    pub max: u32,
}

impl UpsetBand {
    pub fn new(optimal: u32, min: u32, max: u32) -> UpsetBand {
        UpsetBand { optimal, min, max }
    }

    /// Band derived from a single `max_advantage_upsets` value: optimal +/- max(1, (n + 2) / 4), floored at 0.
    pub fn from_optimal(optimal: u32) -> UpsetBand {
        let half_width = ((optimal + 2) / 4).max(1);
        UpsetBand {
            optimal,
            min: optimal.saturating_sub(half_width),
            max: optimal + half_width,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChampionValue {
    pub team: String,
    pub seed: u8,
    pub freq_diff: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecificUpsetValue {
    /// Round name as it appears in the dataset
    pub round: String,
    pub team: String,
    pub seed: u8,
    pub freq_diff: f64,
}

impl SpecificUpsetValue {
    pub fn round(&self) -> Option<Round> {
        self.round.parse().ok()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistoricalNorms {
    pub optimal_upsets: BTreeMap<UpsetCategory, UpsetBand>,
    pub champion_value: BTreeMap<String, ChampionValue>,
    pub specific_upset_value: Vec<SpecificUpsetValue>,
    /// Rows dropped while loading; `validate` fails on the first one
    pub rejected_rows: Vec<RejectedRow>,
}

impl Default for HistoricalNorms {
    fn default() -> Self {
        let bands = [
            (UpsetCategory::Round(Round::FirstRound), UpsetBand::new(6, 4, 8)),
            (UpsetCategory::Round(Round::SecondRound), UpsetBand::new(3, 2, 5)),
            (UpsetCategory::Round(Round::Sweet16), UpsetBand::new(2, 1, 3)),
            (UpsetCategory::Round(Round::Elite8), UpsetBand::new(1, 0, 2)),
            (UpsetCategory::Round(Round::FinalFour), UpsetBand::new(1, 0, 1)),
            (UpsetCategory::Round(Round::Championship), UpsetBand::new(0, 0, 1)),
            (UpsetCategory::Total, UpsetBand::new(13, 9, 17)),
        ];
        HistoricalNorms {
            optimal_upsets: bands.into_iter().collect(),
            champion_value: BTreeMap::new(),
            specific_upset_value: Vec::new(),
            rejected_rows: Vec::new(),
        }
    }
}

impl HistoricalNorms {
    pub fn band(&self, category: UpsetCategory) -> Option<&UpsetBand> {
        self.optimal_upsets.get(&category)
    }

    pub fn champion(&self, team: &str) -> Option<&ChampionValue> {
        self.champion_value.get(team)
    }

    pub fn specific_upset(&self, round: Round, team: &str, seed: u8) -> Option<&SpecificUpsetValue> {
        self.specific_upset_value
            .iter()
            .find(|v| v.team == team && v.seed == seed && v.round() == Some(round))
    }

    /// Rejects content the assessment cannot reason about.
    pub fn validate(&self) -> Result<(), NormsError> {
        if let Some(row) = self.rejected_rows.first() {
            return Err(NormsError::MalformedRow {
                file: row.file.clone(),
                detail: row.detail.clone(),
            });
        }
        for (category, band) in &self.optimal_upsets {
            if band.min > band.max {
                return Err(NormsError::InvertedBand {
                    category: *category,
                    min: band.min,
                    max: band.max,
                });
            }
        }
        for value in self.champion_value.values() {
            check_value(&value.team, value.seed, value.freq_diff)?;
        }
        for value in &self.specific_upset_value {
            if value.round().is_none() {
                return Err(NormsError::UnknownRound(value.round.clone()));
            }
            check_value(&value.team, value.seed, value.freq_diff)?;
        }
        Ok(())
    }

    /// Champion picks with a positive signal, best first; ties go to the alphabetically first team.
    pub fn top_champions(&self, n: usize) -> Vec<&ChampionValue> {
        let mut ranked: Vec<&ChampionValue> =
            self.champion_value.values().filter(|v| v.freq_diff > 0.0).collect();
        ranked.sort_by(|a, b| b.freq_diff.total_cmp(&a.freq_diff).then_with(|| a.team.cmp(&b.team)));
        ranked.truncate(n);
        ranked
    }

    /// Positive specific upsets across all rounds, best first, ties broken by round then team.
    pub fn top_specific_upsets(&self, n: usize) -> Vec<&SpecificUpsetValue> {
        let mut ranked: Vec<&SpecificUpsetValue> =
            self.specific_upset_value.iter().filter(|v| v.freq_diff > 0.0).collect();
        ranked.sort_by(|a, b| {
            b.freq_diff
                .total_cmp(&a.freq_diff)
                .then_with(|| a.round().cmp(&b.round()))
                .then_with(|| a.team.cmp(&b.team))
        });
        ranked.truncate(n);
        ranked
    }
}

fn check_value(team: &str, seed: u8, freq_diff: f64) -> Result<(), NormsError> {
    if !freq_diff.is_finite() {
        return Err(NormsError::NonFiniteValue { team: team.to_string() });
    }
    if !(1..=16).contains(&seed) {
        return Err(NormsError::SeedOutOfRange { team: team.to_string(), seed });
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
struct OptimalRow {
    round: String,
    max_advantage_upsets: u32,
}

#[derive(Debug, Deserialize)]
struct ChampionRow {
    team: String,
    seed: u8,
    freq_diff: f64,
}

#[derive(Debug, Deserialize)]
struct SpecificRow {
    round: String,
    team: String,
    seed: u8,
    freq_diff: f64,
}

pub fn pool_dir(base_dir: &Path, pool_size: u32) -> PathBuf {
    base_dir.join(format!("pool_{}", pool_size))
}

/// Deserialises every row of one table, setting aside the rows that do not parse.
fn read_rows<T: DeserializeOwned>(path: &Path, file: &str, rejected: &mut Vec<RejectedRow>) -> Result<Vec<T>, NormsError> {
    let mut rdr = csv::Reader::from_path(path)?;
    let mut rows = Vec::new();
    for result in rdr.deserialize() {
        match result {
            Ok(row) => rows.push(row),
            Err(e) => {
                log::warn!("Rejected row in {}: {}", file, e);
                rejected.push(RejectedRow { file: file.to_string(), detail: e.to_string() });
            }
        }
    }
    Ok(rows)
}

/// Reads the three tables for one pool size. The upset table is required, the other two are optional.
/// Only a missing or unopenable table is an error here; malformed rows are kept in `rejected_rows`.
pub fn load_pool_norms(base_dir: &Path, pool_size: u32) -> Result<HistoricalNorms, NormsError> {
    let dir = pool_dir(base_dir, pool_size);
    let optimal_path = dir.join(OPTIMAL_UPSETS_FILE);
    if !optimal_path.exists() {
        return Err(NormsError::MissingDataset(optimal_path));
    }

    let mut rejected_rows = Vec::new();
    let mut optimal_upsets = BTreeMap::new();
    for row in read_rows::<OptimalRow>(&optimal_path, OPTIMAL_UPSETS_FILE, &mut rejected_rows)? {
        match UpsetCategory::parse(&row.round) {
            Some(category) => {
                optimal_upsets.insert(category, UpsetBand::from_optimal(row.max_advantage_upsets));
            }
            None => {
                log::warn!("Unknown round name '{}' in {}", row.round, OPTIMAL_UPSETS_FILE);
                rejected_rows.push(RejectedRow {
                    file: OPTIMAL_UPSETS_FILE.to_string(),
                    detail: NormsError::UnknownRound(row.round).to_string(),
                });
            }
        }
    }

    let mut champion_value = BTreeMap::new();
    let champion_path = dir.join(CHAMPION_FILE);
    if champion_path.exists() {
        for row in read_rows::<ChampionRow>(&champion_path, CHAMPION_FILE, &mut rejected_rows)? {
            champion_value.insert(
                row.team.clone(),
                ChampionValue { team: row.team, seed: row.seed, freq_diff: row.freq_diff },
            );
        }
    } else {
        log::debug!("No champion table at {}", champion_path.display());
    }

    let mut specific_upset_value = Vec::new();
    let specific_path = dir.join(SPECIFIC_UPSETS_FILE);
    if specific_path.exists() {
        for row in read_rows::<SpecificRow>(&specific_path, SPECIFIC_UPSETS_FILE, &mut rejected_rows)? {
            specific_upset_value.push(SpecificUpsetValue {
                round: row.round,
                team: row.team,
                seed: row.seed,
                freq_diff: row.freq_diff,
            });
        }
    } else {
        log::debug!("No specific upset table at {}", specific_path.display());
    }

    log::info!(
        "Loaded norms for pool size {}: {} bands, {} champion rows, {} specific upset rows",
        pool_size,
        optimal_upsets.len(),
        champion_value.len(),
        specific_upset_value.len()
    );

    Ok(HistoricalNorms { optimal_upsets, champion_value, specific_upset_value, rejected_rows })
}

/// Loads norms for a pool size, or the default table if the dataset is missing or cannot be opened.
pub fn load_or_default(base_dir: &Path, pool_size: u32) -> HistoricalNorms {
    match load_pool_norms(base_dir, pool_size) {
        Ok(norms) => norms,
        Err(e) => {
            log::warn!("{}; using default norms for pool size {}", e, pool_size);
            HistoricalNorms::default()
        }
    }
}

/// Owns the per-pool-size cache. One loader per session.
#[derive(Debug)]
pub struct NormsLoader {
    base_dir: PathBuf,
    cache: FnvHashMap<u32, HistoricalNorms>,
}

impl NormsLoader {
    pub fn new<P: Into<PathBuf>>(base_dir: P) -> NormsLoader {
        NormsLoader {
            base_dir: base_dir.into(),
            cache: FnvHashMap::default(),
        }
    }

    pub fn load(&mut self, pool_size: u32) -> &HistoricalNorms {
        let base_dir = &self.base_dir;
        self.cache
            .entry(pool_size)
            .or_insert_with(|| load_or_default(base_dir, pool_size))
    }

    /// Drops the cached entry so the next `load` re-reads the dataset.
    pub fn refresh(&mut self, pool_size: u32) {
        self.cache.remove(&pool_size);
    }

    pub fn is_cached(&self, pool_size: u32) -> bool {
        self.cache.contains_key(&pool_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_dataset(base: &Path, pool_size: u32, optimal: &str, champion: Option<&str>, specific: Option<&str>) {
        let dir = pool_dir(base, pool_size);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(OPTIMAL_UPSETS_FILE), optimal).unwrap();
        if let Some(body) = champion {
            fs::write(dir.join(CHAMPION_FILE), body).unwrap();
        }
        if let Some(body) = specific {
            fs::write(dir.join(SPECIFIC_UPSETS_FILE), body).unwrap();
        }
    }

    #[test]
    fn test_default_table_is_valid() {
        let norms = HistoricalNorms::default();
        assert!(norms.validate().is_ok());
        assert_eq!(norms.optimal_upsets.len(), 7);
        assert_eq!(norms.band(UpsetCategory::Total), Some(&UpsetBand::new(13, 9, 17)));
        assert!(norms.champion_value.is_empty());
    }

    #[test]
    fn test_band_from_optimal() {
        assert_eq!(UpsetBand::from_optimal(6), UpsetBand::new(6, 4, 8));
        assert_eq!(UpsetBand::from_optimal(3), UpsetBand::new(3, 2, 4));
        assert_eq!(UpsetBand::from_optimal(0), UpsetBand::new(0, 0, 1));
        assert_eq!(UpsetBand::from_optimal(13), UpsetBand::new(13, 10, 16));
    }

    #[test]
    fn test_load_pool_norms_reads_all_tables() {
        let tmp = tempfile::tempdir().unwrap();
        write_dataset(
            tmp.path(),
            100,
            "round,max_advantage_upsets\nFirst Round,7\nSweet 16,2\nTotal Upsets,12\n",
            Some("team,seed,freq_diff\nHouston,1,0.05\nKansas,4,-0.02\n"),
            Some("round,team,seed,freq_diff\nSweet 16,Oregon,11,0.08\nFirst Round,Yale,13,0.03\n"),
        );

        let norms = load_pool_norms(tmp.path(), 100).unwrap();
        assert_eq!(norms.band(UpsetCategory::Round(Round::FirstRound)), Some(&UpsetBand::from_optimal(7)));
        assert_eq!(norms.band(UpsetCategory::Total).unwrap().optimal, 12);
        assert!(norms.band(UpsetCategory::Round(Round::Elite8)).is_none());
        assert_eq!(norms.champion("Kansas").unwrap().freq_diff, -0.02);
        assert_eq!(norms.specific_upset(Round::Sweet16, "Oregon", 11).unwrap().freq_diff, 0.08);
        assert!(norms.specific_upset(Round::FirstRound, "Oregon", 11).is_none());
        assert!(norms.validate().is_ok());
    }

    #[test]
    fn test_missing_optional_tables_are_empty() {
        let tmp = tempfile::tempdir().unwrap();
        write_dataset(tmp.path(), 10, "round,max_advantage_upsets\nFirst Round,5\n", None, None);
        let norms = load_pool_norms(tmp.path(), 10).unwrap();
        assert!(norms.champion_value.is_empty());
        assert!(norms.specific_upset_value.is_empty());
    }

    #[test]
    fn test_missing_dataset_falls_back_to_default() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(matches!(load_pool_norms(tmp.path(), 500), Err(NormsError::MissingDataset(_))));
        assert_eq!(load_or_default(tmp.path(), 500), HistoricalNorms::default());
    }

    #[test]
    fn test_malformed_rows_are_kept_not_replaced_by_default() {
        let tmp = tempfile::tempdir().unwrap();
        write_dataset(tmp.path(), 20, "round,max_advantage_upsets\nFirst Round,lots\nSweet 16,2\n", None, None);
        let norms = load_or_default(tmp.path(), 20);
        assert_ne!(norms, HistoricalNorms::default());
        assert_eq!(norms.rejected_rows.len(), 1);
        assert_eq!(norms.rejected_rows[0].file, OPTIMAL_UPSETS_FILE);
        assert_eq!(norms.band(UpsetCategory::Round(Round::Sweet16)), Some(&UpsetBand::from_optimal(2)));
        assert!(matches!(norms.validate(), Err(NormsError::MalformedRow { .. })));

        write_dataset(tmp.path(), 30, "round,max_advantage_upsets\nPlay-In,1\n", None, None);
        let norms = load_pool_norms(tmp.path(), 30).unwrap();
        assert!(norms.optimal_upsets.is_empty());
        let err = norms.validate().unwrap_err();
        assert!(err.to_string().contains("Play-In"), "{}", err);

        write_dataset(
            tmp.path(),
            40,
            "round,max_advantage_upsets\nFirst Round,6\n",
            Some("team,seed,freq_diff\nHouston,one,0.05\n"),
            None,
        );
        let norms = load_pool_norms(tmp.path(), 40).unwrap();
        assert!(norms.champion_value.is_empty());
        assert_eq!(norms.rejected_rows[0].file, CHAMPION_FILE);
    }

    #[test]
    fn test_loader_caches_per_pool_size() {
        let tmp = tempfile::tempdir().unwrap();
        write_dataset(tmp.path(), 100, "round,max_advantage_upsets\nFirst Round,9\n", None, None);
        let mut loader = NormsLoader::new(tmp.path());
        assert!(!loader.is_cached(100));
        assert_eq!(loader.load(100).band(UpsetCategory::Round(Round::FirstRound)).unwrap().optimal, 9);
        assert!(loader.is_cached(100));

        // Cached value survives the file changing until refreshed
        write_dataset(tmp.path(), 100, "round,max_advantage_upsets\nFirst Round,4\n", None, None);
        assert_eq!(loader.load(100).band(UpsetCategory::Round(Round::FirstRound)).unwrap().optimal, 9);
        loader.refresh(100);
        assert_eq!(loader.load(100).band(UpsetCategory::Round(Round::FirstRound)).unwrap().optimal, 4);

        assert_eq!(loader.load(250), &HistoricalNorms::default());
    }

    #[test]
    fn test_validate_rejects_malformed_rows() {
        let mut norms = HistoricalNorms::default();
        norms.optimal_upsets.insert(UpsetCategory::Total, UpsetBand::new(5, 8, 3));
        assert!(matches!(norms.validate(), Err(NormsError::InvertedBand { .. })));

        let mut norms = HistoricalNorms::default();
        norms.champion_value.insert(
            "Duke".into(),
            ChampionValue { team: "Duke".into(), seed: 4, freq_diff: f64::NAN },
        );
        assert!(matches!(norms.validate(), Err(NormsError::NonFiniteValue { .. })));

        let mut norms = HistoricalNorms::default();
        norms.specific_upset_value.push(SpecificUpsetValue {
            round: "Play-In".into(),
            team: "Wagner".into(),
            seed: 16,
            freq_diff: 0.01,
        });
        assert!(matches!(norms.validate(), Err(NormsError::UnknownRound(_))));

        let mut norms = HistoricalNorms::default();
        norms.specific_upset_value.push(SpecificUpsetValue {
            round: "First Round".into(),
            team: "Wagner".into(),
            seed: 17,
            freq_diff: 0.01,
        });
        assert!(matches!(norms.validate(), Err(NormsError::SeedOutOfRange { .. })));
    }

    #[test]
    fn test_top_rankings_are_deterministic() {
        let mut norms = HistoricalNorms::default();
        for (team, value) in [("Kansas", 0.02), ("Duke", 0.05), ("Auburn", 0.05), ("Akron", -0.01), ("Yale", 0.0)] {
            norms.champion_value.insert(team.into(), ChampionValue { team: team.into(), seed: 1, freq_diff: value });
        }
        let top: Vec<&str> = norms.top_champions(3).iter().map(|v| v.team.as_str()).collect();
        assert_eq!(top, vec!["Auburn", "Duke", "Kansas"]);
        assert_eq!(norms.top_champions(10).len(), 3);

        for (round, team, value) in [("Sweet 16", "B", 0.04), ("First Round", "C", 0.04), ("First Round", "A", 0.04), ("Elite 8", "D", -0.1)] {
            norms.specific_upset_value.push(SpecificUpsetValue { round: round.into(), team: team.into(), seed: 12, freq_diff: value });
        }
        let top: Vec<&str> = norms.top_specific_upsets(10).iter().map(|v| v.team.as_str()).collect();
        assert_eq!(top, vec!["A", "C", "B"]);
    }
}
