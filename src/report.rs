// Report model: an assessment laid out as ordered, typed sections.
// Renderers turn the model into a concrete output; the model itself carries no markup.

use crate::assess::{Assessment, BandAssessment, BandStatus, ChampionSignal, ValuableUpset};
use crate::game::{Region, Round};
use crate::underdog::UpsetCategory;
use serde::Serialize;

/// Consumers show this many missing upsets.
pub const MISSING_UPSETS_SHOWN: usize = 5;
pub const SMALL_POOL_MAX: u32 = 10;
pub const LARGE_POOL_MIN: u32 = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    Summary,
    UpsetBands,
    Champion,
    UpsetsFound,
    UpsetsMissing,
    Advice,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "style", content = "text", rename_all = "snake_case")]
pub enum ReportLine {
    Text(String),
    Bullet(String),
    Warning(String),
}

impl ReportLine {
    pub fn text(&self) -> &str {
        match self {
            ReportLine::Text(s) | ReportLine::Bullet(s) | ReportLine::Warning(s) => s,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportSection {
    pub kind: SectionKind,
    pub title: String,
    pub lines: Vec<ReportLine>,
}

impl ReportSection {
    fn new(kind: SectionKind, title: &str) -> ReportSection {
        ReportSection { kind, title: title.to_string(), lines: Vec::new() }
    }

    fn text(&mut self, line: String) {
        self.lines.push(ReportLine::Text(line));
    }

    fn bullet(&mut self, line: String) {
        self.lines.push(ReportLine::Bullet(line));
    }

    fn warning(&mut self, line: String) {
        self.lines.push(ReportLine::Warning(line));
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub pool_size: u32,
    pub sections: Vec<ReportSection>,
}

impl Report {
    pub fn section(&self, kind: SectionKind) -> Option<&ReportSection> {
        self.sections.iter().find(|s| s.kind == kind)
    }

    pub fn is_error(&self) -> bool {
        self.section(SectionKind::Error).is_some()
    }
}

pub trait Renderer {
    fn render(&self, report: &Report) -> String;
}

/// Indented plain text with "-" bullets and "!" warnings.
#[derive(Debug, Clone)]
pub struct PlainTextRenderer {
    pub indent: usize,
}

impl Default for PlainTextRenderer {
    fn default() -> Self {
        PlainTextRenderer { indent: 2 }
    }
}

impl Renderer for PlainTextRenderer {
    fn render(&self, report: &Report) -> String {
        let pad = " ".repeat(self.indent);
        let mut out = String::new();
        for (i, section) in report.sections.iter().enumerate() {
            if section.kind == SectionKind::Error {
                for line in &section.lines {
                    out.push_str(line.text());
                    out.push('\n');
                }
                continue;
            }
            if i > 0 {
                out.push('\n');
            }
            out.push_str(&format!("{}\n{}\n", section.title, "=".repeat(section.title.len())));
            for line in &section.lines {
                let rendered = match line {
                    ReportLine::Text(s) => format!("{}\n", s),
                    ReportLine::Bullet(s) => format!("{}- {}\n", pad, s),
                    ReportLine::Warning(s) => format!("{}! {}\n", pad, s),
                };
                out.push_str(&rendered);
            }
        }
        out
    }
}

pub fn build_report(assessment: &Assessment) -> Report {
    if let Some(message) = &assessment.error {
        let mut section = ReportSection::new(SectionKind::Error, "");
        section.text(format!("Assessment failed: {}", message));
        return Report { pool_size: assessment.pool_size, sections: vec![section] };
    }

    Report {
        pool_size: assessment.pool_size,
        sections: vec![
            summary_section(assessment),
            band_section(assessment),
            champion_section(assessment),
            found_section(assessment),
            missing_section(assessment),
            advice_section(assessment),
        ],
    }
}

fn summary_section(a: &Assessment) -> ReportSection {
    let mut section = ReportSection::new(SectionKind::Summary, "Bracket Assessment");
    section.text(format!("Pool size: {}", a.pool_size));
    section.text(format!("Score: {} / {} ({:.1}%)", a.score, a.max_score, a.percentage()));
    section.text(format!("Rating: {}", a.rating));
    section.text(format!("Picks made: {} of 63, upsets picked: {}", a.selections.len(), a.underdog_counts.total));
    section
}

fn band_line(band: &BandAssessment) -> String {
    let summary = format!(
        "{}: {} upsets (winning brackets: {}-{}, optimal {})",
        band.category, band.count, band.band.min, band.band.max, band.band.optimal
    );
    match band.status {
        BandStatus::Good => format!("{}. On target.", summary),
        BandStatus::TooMany => format!("{}. {} more than the historical maximum.", summary, band.distance),
        BandStatus::TooFew => format!("{}. {} fewer than the historical minimum.", summary, band.distance),
    }
}

fn band_section(a: &Assessment) -> ReportSection {
    let mut section = ReportSection::new(SectionKind::UpsetBands, "Upset Analysis");
    for category in UpsetCategory::ALL {
        match a.band(category) {
            Some(band) if band.status == BandStatus::Good => section.bullet(band_line(band)),
            Some(band) => section.warning(band_line(band)),
            None if category == UpsetCategory::Total => {}
            None => section.bullet(format!("{}: no data", category)),
        }
    }
    section
}

fn percent(freq_diff: f64) -> String {
    format!("{:+.1}%", freq_diff * 100.0)
}

fn team_label(team: &str, seed: u8, region: Option<Region>) -> String {
    match region {
        Some(region) => format!("{} ({} seed, {})", team, seed, region),
        None => format!("{} ({} seed)", team, seed),
    }
}

fn champion_section(a: &Assessment) -> ReportSection {
    let mut section = ReportSection::new(SectionKind::Champion, "Champion Pick");
    let champ = &a.champion;
    let label = match (&champ.champion, champ.seed) {
        (Some(name), Some(seed)) => team_label(name, seed, champ.region),
        _ => {
            section.text("No champion selected yet.".to_string());
            return section;
        }
    };

    match champ.signal {
        ChampionSignal::Positive => section.text(format!(
            "{} shows up in winning brackets more often than in the pool ({}). A strong pick.",
            label,
            percent(champ.value)
        )),
        ChampionSignal::Neutral => section.text(format!(
            "{} is picked about as often by winners as by the pool. A neutral pick.",
            label
        )),
        ChampionSignal::Negative => section.warning(format!(
            "{} is over-picked relative to winning brackets ({}).",
            label,
            percent(champ.value)
        )),
        ChampionSignal::Unknown => section.warning(format!("{} has no historical champion data.", label)),
        ChampionSignal::Undecided => {}
    }

    if !champ.recommendations.is_empty() {
        section.text("Champions with better historical value:".to_string());
        for rec in &champ.recommendations {
            section.bullet(format!("{}: {}", team_label(&rec.team, rec.seed, rec.region), percent(rec.freq_diff)));
        }
    }
    section
}

fn upset_line(upset: &ValuableUpset) -> String {
    format!(
        "{} in the {}: {}",
        team_label(&upset.team, upset.seed, upset.region),
        upset.round,
        percent(upset.freq_diff)
    )
}

fn found_section(a: &Assessment) -> ReportSection {
    let mut section = ReportSection::new(SectionKind::UpsetsFound, "Valuable Upsets Picked");
    if a.valuable_upsets_found.is_empty() {
        section.text("None of your picks match a historically valuable upset.".to_string());
    }
    for upset in &a.valuable_upsets_found {
        section.bullet(upset_line(upset));
    }
    section
}

fn missing_section(a: &Assessment) -> ReportSection {
    let mut section = ReportSection::new(SectionKind::UpsetsMissing, "Valuable Upsets Missing");
    if a.valuable_upsets_missing.is_empty() {
        section.text("You already have every top-value upset.".to_string());
    }
    for upset in a.valuable_upsets_missing.iter().take(MISSING_UPSETS_SHOWN) {
        section.bullet(upset_line(upset));
    }
    section
}

fn band_status(a: &Assessment, round: Round) -> Option<BandStatus> {
    a.band(UpsetCategory::Round(round)).map(|b| b.status)
}

fn advice_section(a: &Assessment) -> ReportSection {
    let mut section = ReportSection::new(SectionKind::Advice, "General Advice");

    match band_status(a, Round::FirstRound) {
        Some(BandStatus::TooMany) => section.bullet(
            "You have more first round upsets than winning brackets carry. Keep the best 12-5 and 11-6 picks and drop the long shots."
                .to_string(),
        ),
        Some(BandStatus::TooFew) => section.bullet(
            "Winning brackets take a few more first round upsets. Look at the 10-7, 11-6 and 12-5 games.".to_string(),
        ),
        _ => {}
    }
    match band_status(a, Round::SecondRound) {
        Some(BandStatus::TooMany) => section.bullet(
            "Too many second round upsets. Most top-4 seeds reach the Sweet 16 in winning brackets.".to_string(),
        ),
        Some(BandStatus::TooFew) => section.bullet(
            "Consider one or two second round upsets, usually a 5 or 6 seed over a 3 or 4.".to_string(),
        ),
        _ => {}
    }

    let count = |round: Round| a.underdog_counts.by_round.get(&round).copied().unwrap_or(0);
    if count(Round::Sweet16) > 4 && count(Round::Elite8) > 2 {
        section.warning("Too many late upsets. Winning brackets rarely stack upsets in both the Sweet 16 and the Elite 8.".to_string());
    }

    let long_shots: Vec<String> = a
        .selections
        .winners(Round::Elite8)
        .iter()
        .filter(|t| t.seed > 8)
        .map(|t| format!("{} ({})", t.name, t.seed))
        .collect();
    if !long_shots.is_empty() {
        section.warning(format!(
            "Final Four check: {} would be a rare run. Seeds above 8 seldom reach the Final Four.",
            long_shots.join(", ")
        ));
    }

    if a.pool_size <= SMALL_POOL_MAX {
        section.bullet("Small pool: stay close to chalk and let a strong champion pick carry the bracket.".to_string());
    } else if a.pool_size >= LARGE_POOL_MIN {
        section.bullet("Large pool: you need separation. Favour a less popular champion and a few high-value upsets.".to_string());
    }

    if section.lines.is_empty() {
        section.text("No adjustments suggested.".to_string());
    }
    section
}
