use bracket_assess::config::{generate_sample_config, Config};
use bracket_assess::{
    assess, build_report, derive_bracket, fill_defaults, BracketState, GameId, NormsLoader, PlainTextRenderer,
    Renderer, SelectionEvent, TeamCatalog,
};
use clap::{Parser, ValueEnum};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Parser)]
#[command(name = "bracket-assess")]
#[command(about = "Derive a tournament bracket from winner picks and score it against historical winning brackets")]
struct Cli {
    /// Roster CSV (team,seed,region,rating,conference); the built-in sample field when omitted
    #[arg(long)]
    teams: Option<PathBuf>,

    /// JSON file of picks: a list of {region, round, index, winner} events or a {game_key: winner} map
    #[arg(long)]
    selections: Option<PathBuf>,

    /// Number of entries in the pool; overrides the config file
    #[arg(long)]
    pool_size: Option<u32>,

    /// Directory holding pool_<size>/ norms datasets; overrides the config file
    #[arg(long)]
    norms_dir: Option<PathBuf>,

    /// YAML config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Complete undecided games with the default winner (lower seed) before assessing
    #[arg(long)]
    fill_defaults: bool,

    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,

    /// Print a sample config file and exit
    #[arg(long)]
    sample_config: bool,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SelectionsFile {
    Events(Vec<SelectionEvent>),
    Keys(BTreeMap<String, Option<String>>),
}

fn read_selections(path: &Path, state: &mut BracketState) -> Result<usize, Box<dyn Error>> {
    let content = fs::read_to_string(path)?;
    let mut applied = 0;
    match serde_json::from_str::<SelectionsFile>(&content)? {
        SelectionsFile::Events(events) => {
            for event in &events {
                state.apply_event(event)?;
                applied += 1;
            }
        }
        SelectionsFile::Keys(keys) => {
            // Keys are "<region|final>_round<N>_game_<i>"
            for (key, winner) in keys {
                state.apply_selection(GameId::parse(&key)?, winner);
                applied += 1;
            }
        }
    }
    Ok(applied)
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let cli = Cli::parse();

    if cli.sample_config {
        print!("{}", generate_sample_config());
        return Ok(());
    }

    let config = Config::load_or_default(cli.config.as_deref());
    let pool_size = cli.pool_size.unwrap_or(config.assessment.pool_size);
    let norms_dir = cli.norms_dir.unwrap_or(config.norms.data_dir);

    let catalog = match &cli.teams {
        Some(path) => TeamCatalog::from_csv_path(path)?,
        None => TeamCatalog::sample(),
    };

    let mut state = BracketState::new(config.bracket.reset_policy);
    if let Some(path) = &cli.selections {
        let applied = read_selections(path, &mut state)?;
        log::info!("Applied {} selections from {}", applied, path.display());
    }
    if cli.fill_defaults {
        let filled = fill_defaults(&mut state, &catalog);
        log::info!("Filled {} undecided games with default winners", filled);
    }

    let pending = derive_bracket(&state, &catalog).iter().filter(|g| g.is_pending()).count();
    if pending > 0 {
        log::info!("{} games are still pending", pending);
    }

    let mut loader = NormsLoader::new(norms_dir);
    let assessment = assess(&state, &catalog, loader.load(pool_size), pool_size);
    let report = build_report(&assessment);

    match cli.format {
        OutputFormat::Text => print!("{}", PlainTextRenderer::default().render(&report)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }
    Ok(())
}
