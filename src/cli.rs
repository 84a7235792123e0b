//! CLI interface for Wayfarer.
//!
//! Every command is non-interactive: arguments in, JSON or plain lines out on
//! stdout, logs on stderr. Place search runs against a local JSON catalogue,
//! so nothing here needs a network.
//!
//! - `wayfarer theme`: today's theme.
//! - `wayfarer history list|clear`: the places already surfaced.
//! - `wayfarer scan`: generate missions around a position.
//! - `wayfarer walk`: scan, start a mission, and replay a recorded track.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use jiff::{Zoned, civil::Date};
use serde::Deserialize;

use wayfarer::config::Config;
use wayfarer::model::{Coordinate, Mission, RawFix};
use wayfarer::offline::{CoordinateGeocoder, NoDirections, PlaceCatalog, SilentNarrator};
use wayfarer::orchestrator::{Collaborators, MissionOrchestrator, Transition};
use wayfarer::rotation::{self, RotationManager};
use wayfarer::storage::SqliteStore;

/// Wayfarer: walkable quests from where you stand.
#[derive(Debug, Parser)]
#[command(name = "wayfarer", after_long_help = USAGE_HELP)]
pub struct Cli {
    /// Config file to use instead of `~/.wayfarer/config.toml`.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

const USAGE_HELP: &str = r#"Walking a quest offline
  1. wayfarer scan --lat 59.3293 --lon 18.0686 --places places.json
     → prints up to six missions
  2. wayfarer walk --lat 59.3293 --lon 18.0686 --places places.json \
       --track morning.jsonl --pick 2
     → prints the completion record

Track lines are JSON fixes with a cumulative step count:
  {"latitude": 59.3293, "longitude": 18.0686, "accuracyMeters": 6.0,
   "timestampMs": 1767254400000, "steps": 120}"#;

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the theme of the day as JSON.
    Theme {
        /// Calendar date (YYYY-MM-DD); defaults to today.
        #[arg(long)]
        date: Option<Date>,
    },

    /// Inspect or reset the history of surfaced places.
    History {
        #[command(subcommand)]
        command: HistoryCommand,
    },

    /// Generate missions around a position and print them as JSON.
    ///
    /// Surfaced places are remembered so the next scan prefers new ones.
    Scan {
        #[command(flatten)]
        position: Position,

        /// JSON array of places to search.
        #[arg(long)]
        places: PathBuf,

        /// Seed for reproducible rankings and headings.
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Scan, start a mission, replay a track, and print the completion record.
    ///
    /// The replay stops at the first update that completes the mission.
    Walk {
        #[command(flatten)]
        position: Position,

        /// JSON array of places to search.
        #[arg(long)]
        places: PathBuf,

        /// JSON-lines file of fixes with cumulative step counts.
        #[arg(long)]
        track: PathBuf,

        /// Index of the mission to start, in scan order.
        #[arg(long, default_value_t = 0)]
        pick: usize,

        /// Seed for reproducible rankings and headings.
        #[arg(long)]
        seed: Option<u64>,
    },
}

#[derive(Debug, Subcommand)]
pub enum HistoryCommand {
    /// List remembered places, most recent first.
    List,

    /// Forget every remembered place.
    Clear,
}

/// Starting position in decimal degrees.
#[derive(Debug, Clone, Copy, clap::Args)]
pub struct Position {
    #[arg(long, allow_negative_numbers = true)]
    lat: f64,

    #[arg(long, allow_negative_numbers = true)]
    lon: f64,
}

impl Position {
    fn coordinate(self) -> Result<Coordinate, String> {
        Coordinate::new(self.lat, self.lon).map_err(|e| e.to_string())
    }
}

/// One line of a replayed track.
#[derive(Debug, Deserialize)]
struct TrackPoint {
    #[serde(flatten)]
    fix: RawFix,
    steps: u64,
}

/// Run the CLI, returning an error message on failure.
pub async fn run() -> Result<(), String> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    match cli.command {
        Command::Theme { date } => cmd_theme(date),
        Command::History { command } => match command {
            HistoryCommand::List => cmd_history_list(&config),
            HistoryCommand::Clear => cmd_history_clear(&config),
        },
        Command::Scan {
            position,
            places,
            seed,
        } => cmd_scan(&config, position.coordinate()?, &places, seed).await,
        Command::Walk {
            position,
            places,
            track,
            pick,
            seed,
        } => cmd_walk(&config, position.coordinate()?, &places, &track, pick, seed).await,
    }
}

fn cmd_theme(date: Option<Date>) -> Result<(), String> {
    let date = date.unwrap_or_else(|| Zoned::now().date());
    let theme = rotation::theme_for(date);

    let json = serde_json::to_string_pretty(&serde_json::json!({
        "date": date.to_string(),
        "theme": theme,
    }))
    .map_err(|e| format!("failed to serialize theme: {e}"))?;
    println!("{json}");
    Ok(())
}

fn cmd_history_list(config: &Config) -> Result<(), String> {
    let rotation = open_rotation(config, None)?;
    let history = rotation.history();

    if history.is_empty() {
        println!("No places seen");
        return Ok(());
    }

    for entry in history.entries() {
        let state = if entry.was_completed {
            "completed"
        } else {
            "seen"
        };
        println!("{}  [{state}]  {}", entry.last_seen, entry.place_id);
    }
    Ok(())
}

fn cmd_history_clear(config: &Config) -> Result<(), String> {
    let mut rotation = open_rotation(config, None)?;
    let count = rotation.history().len();
    rotation
        .clear()
        .map_err(|e| format!("failed to clear history: {e}"))?;

    println!("Forgot {count} places");
    Ok(())
}

async fn cmd_scan(
    config: &Config,
    origin: Coordinate,
    places: &Path,
    seed: Option<u64>,
) -> Result<(), String> {
    let mut orchestrator = offline_orchestrator(config, places, seed)?;
    scan(&mut orchestrator, origin).await?;

    print_json(&orchestrator.missions())
}

async fn cmd_walk(
    config: &Config,
    origin: Coordinate,
    places: &Path,
    track: &Path,
    pick: usize,
    seed: Option<u64>,
) -> Result<(), String> {
    let track = read_track(track)?;
    let mut orchestrator = offline_orchestrator(config, places, seed)?;
    scan(&mut orchestrator, origin).await?;

    let mission: Mission = orchestrator
        .missions()
        .get(pick)
        .cloned()
        .ok_or_else(|| {
            format!(
                "no mission at index {pick} ({} offered)",
                orchestrator.missions().len()
            )
        })?;
    eprintln!("Starting \"{}\" ({} steps)", mission.title, mission.step_target);

    let start_steps = track.first().map_or(0, |p| p.steps);
    orchestrator
        .select(mission, start_steps, origin)
        .await
        .map_err(|e| format!("failed to start mission: {e}"))?;

    for point in track {
        let done = orchestrator
            .observe_fix(point.steps, point.fix)
            .is_some_and(|active| active.is_completed);
        if done {
            break;
        }
    }

    if orchestrator.complete().await == Transition::Ignored {
        return Err("no active mission to complete".to_string());
    }
    let record = orchestrator
        .dismiss()
        .ok_or("mission did not reach completion")?;
    print_json(&record)
}

async fn scan(orchestrator: &mut MissionOrchestrator, origin: Coordinate) -> Result<(), String> {
    orchestrator
        .scan(Some(origin))
        .await
        .map_err(|e| format!("scan failed: {e}"))?;
    Ok(())
}

fn offline_orchestrator(
    config: &Config,
    places: &Path,
    seed: Option<u64>,
) -> Result<MissionOrchestrator, String> {
    let catalog = PlaceCatalog::from_path(places)?;
    if catalog.is_empty() {
        eprintln!("Place catalogue is empty; missions will not lead to real places");
    }

    let rotation = open_rotation(config, seed)?;
    let collaborators = Collaborators {
        search: Arc::new(catalog),
        directions: Arc::new(NoDirections),
        geocoder: Arc::new(CoordinateGeocoder),
        narrator: Arc::new(SilentNarrator),
    };
    Ok(match seed {
        Some(seed) => MissionOrchestrator::with_seed(config, collaborators, rotation, seed),
        None => MissionOrchestrator::new(config, collaborators, rotation),
    })
}

fn open_rotation(config: &Config, seed: Option<u64>) -> Result<RotationManager, String> {
    let path = config
        .storage_path()
        .ok_or("could not determine home directory")?;
    let store = SqliteStore::open(&path)
        .map_err(|e| format!("failed to open {}: {e}", path.display()))?;

    Ok(match seed {
        Some(seed) => RotationManager::with_seed(Box::new(store), seed),
        None => RotationManager::load(Box::new(store)),
    })
}

fn read_track(path: &Path) -> Result<Vec<TrackPoint>, String> {
    let contents =
        fs::read_to_string(path).map_err(|e| format!("failed to read {}: {e}", path.display()))?;

    contents
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| {
            serde_json::from_str(line)
                .map_err(|e| format!("{}:{}: invalid track point: {e}", path.display(), index + 1))
        })
        .collect()
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<(), String> {
    let json =
        serde_json::to_string_pretty(value).map_err(|e| format!("failed to serialize: {e}"))?;
    println!("{json}");
    Ok(())
}
