// Underdog classification: a pick is an upset when the winner's seed exceeds the round's threshold.

use crate::game::{Round, Region};
use crate::ingest::Team;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A single round, or the bracket-wide total, as used by upset counts and norm bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum UpsetCategory {
    Round(Round),
    Total,
}

impl UpsetCategory {
    /// Fixed reporting order: the six rounds, then Total.
    pub const ALL: [UpsetCategory; 7] = [
        UpsetCategory::Round(Round::FirstRound),
        UpsetCategory::Round(Round::SecondRound),
        UpsetCategory::Round(Round::Sweet16),
        UpsetCategory::Round(Round::Elite8),
        UpsetCategory::Round(Round::FinalFour),
        UpsetCategory::Round(Round::Championship),
        UpsetCategory::Total,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            UpsetCategory::Round(round) => round.name(),
            UpsetCategory::Total => "Total",
        }
    }

    /// Accepts round names plus "Total" / "Total Upsets".
    pub fn parse(name: &str) -> Option<UpsetCategory> {
        let trimmed = name.trim();
        if trimmed.eq_ignore_ascii_case("total") || trimmed.eq_ignore_ascii_case("total upsets") {
            return Some(UpsetCategory::Total);
        }
        trimmed.parse::<Round>().ok().map(UpsetCategory::Round)
    }
}

impl fmt::Display for UpsetCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnderdogRecord {
    pub round: Round,
    pub team: String,
    pub seed: u8,
    pub region: Region,
}

/// Winners picked in each round, in bracket order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Selections {
    pub by_round: BTreeMap<Round, Vec<Team>>,
}

impl Selections {
    pub fn push(&mut self, round: Round, team: Team) {
        self.by_round.entry(round).or_default().push(team);
    }

    pub fn winners(&self, round: Round) -> &[Team] {
        self.by_round.get(&round).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains(&self, round: Round, team: &str) -> bool {
        self.winners(round).iter().any(|t| t.name == team)
    }

    pub fn champion(&self) -> Option<&Team> {
        self.winners(Round::Championship).first()
    }

    pub fn len(&self) -> usize {
        self.by_round.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = (Round, &Team)> {
        self.by_round
            .iter()
            .flat_map(|(round, teams)| teams.iter().map(move |t| (*round, t)))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UnderdogCounts {
    pub by_round: BTreeMap<Round, usize>,
    pub total: usize,
}

impl UnderdogCounts {
    pub fn get(&self, category: UpsetCategory) -> Option<usize> {
        match category {
            UpsetCategory::Round(round) => self.by_round.get(&round).copied(),
            UpsetCategory::Total => Some(self.total),
        }
    }

    /// Every category with a count, rounds first then Total.
    pub fn iter(&self) -> impl Iterator<Item = (UpsetCategory, usize)> + '_ {
        UpsetCategory::ALL
            .into_iter()
            .filter_map(move |c| self.get(c).map(|n| (c, n)))
    }
}

pub fn classify(round: Round, team: &Team) -> bool {
    team.seed > round.underdog_threshold()
}

pub fn underdog_records(selections: &Selections) -> Vec<UnderdogRecord> {
    selections
        .iter()
        .filter(|(round, team)| classify(*round, team))
        .map(|(round, team)| UnderdogRecord {
            round,
            team: team.name.clone(),
            seed: team.seed,
            region: team.region,
        })
        .collect()
}

/// Counts upsets per round (all six rounds present, zero when none) plus the total.
pub fn count_underdogs_by_round(selections: &Selections) -> UnderdogCounts {
    let mut by_round: BTreeMap<Round, usize> = Round::ALL.iter().map(|r| (*r, 0)).collect();
    for (round, team) in selections.iter() {
        if classify(round, team) {
            *by_round.entry(round).or_insert(0) += 1;
        }
    }
    let total = by_round.values().sum();
    UnderdogCounts { by_round, total }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::TeamCatalog;
    use proptest::prelude::*;

    fn team(seed: u8) -> Team {
        Team::new(&format!("Seed {}", seed), seed, Region::East, 80.0, "Test")
    }

    #[test]
    fn test_thresholds() {
        assert!(!classify(Round::FirstRound, &team(8)));
        assert!(classify(Round::FirstRound, &team(9)));
        assert!(!classify(Round::SecondRound, &team(4)));
        assert!(classify(Round::SecondRound, &team(5)));
        assert!(!classify(Round::Sweet16, &team(2)));
        assert!(classify(Round::Sweet16, &team(3)));
        for round in [Round::Elite8, Round::FinalFour, Round::Championship] {
            assert!(!classify(round, &team(1)));
            assert!(classify(round, &team(2)));
        }
    }

    #[test]
    fn test_empty_selections_count_zero_everywhere() {
        let counts = count_underdogs_by_round(&Selections::default());
        assert_eq!(counts.by_round.len(), 6);
        assert!(counts.by_round.values().all(|&n| n == 0));
        assert_eq!(counts.total, 0);
        assert_eq!(counts.iter().count(), 7);
    }

    #[test]
    fn test_counts_and_records() {
        let catalog = TeamCatalog::sample();
        let mut selections = Selections::default();
        selections.push(Round::FirstRound, catalog.team("Oregon").unwrap().clone()); // 11
        selections.push(Round::FirstRound, catalog.team("Purdue").unwrap().clone()); // 1
        selections.push(Round::SecondRound, catalog.team("Oregon").unwrap().clone());
        selections.push(Round::Elite8, catalog.team("Tennessee").unwrap().clone()); // 2

        let counts = count_underdogs_by_round(&selections);
        assert_eq!(counts.get(UpsetCategory::Round(Round::FirstRound)), Some(1));
        assert_eq!(counts.get(UpsetCategory::Round(Round::SecondRound)), Some(1));
        assert_eq!(counts.get(UpsetCategory::Round(Round::Elite8)), Some(1));
        assert_eq!(counts.get(UpsetCategory::Total), Some(3));

        let records = underdog_records(&selections);
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].team, "Oregon");
        assert_eq!(records[0].seed, 11);
        assert_eq!(records[0].region, Region::Midwest);
    }

    #[test]
    fn test_category_parse() {
        assert_eq!(UpsetCategory::parse("Total Upsets"), Some(UpsetCategory::Total));
        assert_eq!(UpsetCategory::parse("elite eight"), Some(UpsetCategory::Round(Round::Elite8)));
        assert_eq!(UpsetCategory::parse("Sweet 16"), Some(UpsetCategory::Round(Round::Sweet16)));
        assert_eq!(UpsetCategory::parse("Play-In"), None);
    }

    proptest! {
        #[test]
        fn prop_adding_an_underdog_never_decreases_its_count(
            picks in proptest::collection::vec((0usize..6, 1u8..=16), 0..40),
            round_idx in 0usize..6,
        ) {
            let mut selections = Selections::default();
            for (r, seed) in &picks {
                selections.push(Round::ALL[*r], team(*seed));
            }
            let round = Round::ALL[round_idx];
            let before = count_underdogs_by_round(&selections);
            selections.push(round, team(16));
            let after = count_underdogs_by_round(&selections);

            prop_assert!(after.by_round[&round] >= before.by_round[&round]);
            prop_assert_eq!(after.by_round[&round], before.by_round[&round] + 1);
            prop_assert_eq!(after.total, before.total + 1);
        }
    }
}
