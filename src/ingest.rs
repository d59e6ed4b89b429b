// This file holds the team catalog: the immutable 64-team field the bracket is built from.
// The field arrives already selected (seeds, regions, ratings); here it is validated once and
// indexed so the deriver and the assessor can look teams up by name or by (region, seed).

use crate::game::{GameIdError, Region};
use fnv::FnvHashMap;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Failed to read roster file: {0}")]
    Csv(#[from] csv::Error),
    #[error("Invalid region on roster row for '{team}': {source}")]
    Region { team: String, source: GameIdError },
    #[error("Invalid seed '{seed}' for team '{team}'")]
    Seed { team: String, seed: String },
    #[error("Expected 64 teams in the field, found {0}")]
    FieldSize(usize),
    #[error("{region} region has {count} teams, expected 16")]
    RegionSize { region: Region, count: usize },
    #[error("{region} region has seed {seed} more than once")]
    DuplicateSeed { region: Region, seed: u8 },
    #[error("Team name '{0}' appears more than once in the field")]
    DuplicateName(String),
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Team {
    pub name: String,
    pub seed: u8,
    pub region: Region,
    pub rating: f64,
    #[serde(default)]
    pub conference: String,
}

impl Team {
    pub fn new(name: &str, seed: u8, region: Region, rating: f64, conference: &str) -> Team {
        Team {
            name: name.to_string(),
            seed,
            region,
            rating,
            conference: conference.to_string(),
        }
    }
}

impl PartialEq for Team {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

/// One row of a roster CSV (`team,seed,region,rating,conference`).
#[derive(Debug, Deserialize)]
struct RosterRow {
    team: String,
    seed: String,
    region: String,
    rating: f64,
    #[serde(default)]
    conference: Option<String>,
}

#[derive(Debug, Clone)]
pub struct TeamCatalog {
    teams: Vec<Team>,
    by_name: FnvHashMap<String, usize>,
    by_seed: FnvHashMap<(Region, u8), usize>,
}

impl TeamCatalog {
    /// Validates and indexes a 64-team field.
    pub fn new(teams: Vec<Team>) -> Result<TeamCatalog, CatalogError> {
        if teams.len() != 64 {
            return Err(CatalogError::FieldSize(teams.len()));
        }

        let mut by_name = FnvHashMap::default();
        let mut by_seed = FnvHashMap::default();
        for (idx, team) in teams.iter().enumerate() {
            if !(1..=16).contains(&team.seed) {
                return Err(CatalogError::Seed {
                    team: team.name.clone(),
                    seed: team.seed.to_string(),
                });
            }
            if by_name.insert(team.name.clone(), idx).is_some() {
                return Err(CatalogError::DuplicateName(team.name.clone()));
            }
            if by_seed.insert((team.region, team.seed), idx).is_some() {
                return Err(CatalogError::DuplicateSeed {
                    region: team.region,
                    seed: team.seed,
                });
            }
        }

        // 64 teams with unique in-range (region, seed) pairs already forces 16 per region,
        // this only reports which region is off when the pairs are not unique.
        for region in Region::ALL {
            let count = teams.iter().filter(|t| t.region == region).count();
            if count != 16 {
                return Err(CatalogError::RegionSize { region, count });
            }
        }

        Ok(TeamCatalog { teams, by_name, by_seed })
    }

    /// Reads a roster CSV. Play-in seeds such as `16a` lose their suffix.
    pub fn from_csv_path<P: AsRef<Path>>(path: P) -> Result<TeamCatalog, CatalogError> {
        let mut rdr = csv::Reader::from_path(path)?;
        let mut teams = Vec::with_capacity(64);
        for result in rdr.deserialize() {
            let row: RosterRow = result?;
            let region = row.region.parse::<Region>().map_err(|source| CatalogError::Region {
                team: row.team.clone(),
                source,
            })?;
            let seed = parse_seed(&row.seed).ok_or_else(|| CatalogError::Seed {
                team: row.team.clone(),
                seed: row.seed.clone(),
            })?;
            teams.push(Team::new(
                row.team.trim(),
                seed,
                region,
                row.rating,
                row.conference.as_deref().unwrap_or("").trim(),
            ));
        }
        log::info!("Loaded {} teams from roster", teams.len());
        TeamCatalog::new(teams)
    }

    pub fn teams(&self) -> &[Team] {
        &self.teams
    }

    /// Case-sensitive lookup across the full field.
    pub fn team(&self, name: &str) -> Option<&Team> {
        self.by_name.get(name).map(|&idx| &self.teams[idx])
    }

    pub fn team_by_seed(&self, region: Region, seed: u8) -> Option<&Team> {
        self.by_seed.get(&(region, seed)).map(|&idx| &self.teams[idx])
    }

    /// The region's 16 teams ordered by seed.
    pub fn region_teams(&self, region: Region) -> Vec<&Team> {
        (1..=16).filter_map(|seed| self.team_by_seed(region, seed)).collect()
    }

    /// Looks a winner up in its feeding region first, then across the whole field.
    pub fn find_in_region(&self, region: Option<Region>, name: &str) -> Option<&Team> {
        let in_region = region.and_then(|r| self.team(name).filter(|t| t.region == r));
        in_region.or_else(|| self.team(name))
    }

    /// A fixed, valid field for demos and tests.
    pub fn sample() -> TeamCatalog {
        let field: [(Region, [(&str, &str); 16]); 4] = [
            (
                Region::East,
                [
                    ("Connecticut", "Big East"), ("Iowa State", "Big 12"), ("Illinois", "Big Ten"),
                    ("Auburn", "SEC"), ("San Diego State", "Mountain West"), ("BYU", "Big 12"),
                    ("Texas", "Big 12"), ("Florida Atlantic", "American"), ("Northwestern", "Big Ten"),
                    ("Drake", "Missouri Valley"), ("Duquesne", "Atlantic 10"), ("UAB", "American"),
                    ("Yale", "Ivy"), ("Morehead State", "Ohio Valley"), ("Long Beach State", "Big West"),
                    ("Stetson", "ASUN"),
                ],
            ),
            (
                Region::West,
                [
                    ("North Carolina", "ACC"), ("Arizona", "Pac-12"), ("Baylor", "Big 12"),
                    ("Alabama", "SEC"), ("Saint Mary's", "WCC"), ("Clemson", "ACC"),
                    ("Dayton", "Atlantic 10"), ("Mississippi State", "SEC"), ("Michigan State", "Big Ten"),
                    ("Nevada", "Mountain West"), ("New Mexico", "Mountain West"), ("Grand Canyon", "WAC"),
                    ("Charleston", "CAA"), ("Colgate", "Patriot"), ("Long Island", "NEC"),
                    ("Wagner", "NEC"),
                ],
            ),
            (
                Region::South,
                [
                    ("Houston", "Big 12"), ("Marquette", "Big East"), ("Kentucky", "SEC"),
                    ("Duke", "ACC"), ("Wisconsin", "Big Ten"), ("Texas Tech", "Big 12"),
                    ("Florida", "SEC"), ("Nebraska", "Big Ten"), ("Texas A&M", "SEC"),
                    ("Colorado", "Pac-12"), ("NC State", "ACC"), ("James Madison", "Sun Belt"),
                    ("Vermont", "America East"), ("Oakland", "Horizon"), ("Western Kentucky", "C-USA"),
                    ("Longwood", "Big South"),
                ],
            ),
            (
                Region::Midwest,
                [
                    ("Purdue", "Big Ten"), ("Tennessee", "SEC"), ("Creighton", "Big East"),
                    ("Kansas", "Big 12"), ("Gonzaga", "WCC"), ("South Carolina", "SEC"),
                    ("Washington State", "Pac-12"), ("Utah State", "Mountain West"), ("TCU", "Big 12"),
                    ("Colorado State", "Mountain West"), ("Oregon", "Pac-12"), ("McNeese", "Southland"),
                    ("Samford", "SoCon"), ("Akron", "MAC"), ("Grambling State", "SWAC"),
                    ("Montana State", "Big Sky"),
                ],
            ),
        ];

        let mut teams = Vec::with_capacity(64);
        for (region, names) in field.iter() {
            for (i, (name, conference)) in names.iter().enumerate() {
                let seed = (i + 1) as u8;
                let rating = 95.0 - 2.5 * i as f64 - region.index() as f64 * 0.25;
                teams.push(Team::new(name, seed, *region, rating, conference));
            }
        }
        match TeamCatalog::new(teams) {
            Ok(catalog) => catalog,
            Err(e) => unreachable!("sample field is invalid: {}", e),
        }
    }
}

/// Parses a seed, dropping a trailing play-in marker (`a`/`b`).
fn parse_seed(raw: &str) -> Option<u8> {
    let trimmed = raw.trim().trim_end_matches(['a', 'b']);
    trimmed.parse::<u8>().ok().filter(|s| (1..=16).contains(s))
}
