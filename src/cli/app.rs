use crate::chess::{Engine, MoveRecord, MoveRequest};
use crate::cli::display::{self, describe_event};
use crate::config::Config;
use crate::coordinator::GameCoordinator;
use crate::game::{GameConfig, ParticipantId, SidePreference};
use crate::matchmaking::MatchmakingQueue;
use crate::services::{ChannelNotifier, Event, IdentityResolver, TokenAuthority};
use crate::storage::Database;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, info};

/// Loaded configuration plus where it came from
pub struct App {
    pub config: Config,
    pub config_path: PathBuf,
}

impl App {
    /// Load the configuration at `path`, or the default location, creating
    /// it with defaults when missing
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let config_path = match path {
            Some(path) => path,
            None => Config::default_config_file()?,
        };
        let config = Config::load_or_create(&config_path)
            .context("Failed to initialize configuration")?;
        debug!(path = %config_path.display(), "configuration loaded");
        Ok(Self {
            config,
            config_path,
        })
    }

    /// Open the configured database, or `path` when given
    pub fn open_database(&self, path: Option<&Path>) -> Result<Database> {
        let path = path.unwrap_or(&self.config.storage.database_path);
        Database::open(path, self.config.rating_settings())
            .with_context(|| format!("Failed to open database {}", path.display()))
    }

    pub fn show_config(&self) -> Result<String> {
        toml::to_string_pretty(&self.config).context("Failed to serialize configuration")
    }

    /// Overwrite the configuration file with defaults
    pub fn reset_config(&mut self) -> Result<()> {
        self.config = Config::default();
        self.config.save(&self.config_path)
    }
}

/// Parse a JSON move list of `[piece, cell]` pairs
pub fn parse_move_list(json: &str) -> Result<Vec<MoveRequest>> {
    let pairs: Vec<(String, String)> =
        serde_json::from_str(json).context("Move list must be a JSON array of [piece, cell] pairs")?;
    pairs
        .iter()
        .enumerate()
        .map(|(i, (piece, to))| {
            MoveRequest::parse(piece, to).with_context(|| format!("Move {} is malformed", i + 1))
        })
        .collect()
}

/// Play `moves` from the initial position, alternating sides. Stops at the
/// first rejected move.
pub fn replay(moves: &[MoveRequest], mut on_move: impl FnMut(&Engine, &MoveRecord)) -> Result<Engine> {
    let mut engine = Engine::new();
    for (i, request) in moves.iter().enumerate() {
        let side = engine.to_move();
        let record = engine
            .apply(side, request.piece, request.to)
            .with_context(|| format!("Move {} ({} {} to {}) rejected", i + 1, side, request.piece, request.to))?;
        on_move(&engine, &record);
    }
    Ok(engine)
}

pub fn replay_file(path: &Path, quiet: bool) -> Result<()> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read move list {}", path.display()))?;
    let moves = parse_move_list(&json)?;

    let engine = replay(&moves, |engine, record| {
        println!("{}", record);
        if !quiet {
            display::display_board(engine.board(), engine.to_move());
        }
    })?;

    if quiet {
        display::display_board(engine.board(), engine.to_move());
    }
    if let Some(check) = engine.turn().check {
        println!("{} is in check from {}", check.side, check.by);
    }
    Ok(())
}

fn drain(label: &str, events: &mut UnboundedReceiver<Event>) {
    while let Ok(event) = events.try_recv() {
        println!("[{label}] {:<28} {}", event.name(), describe_event(&event));
    }
}

/// Run a scripted lobby game between two token-holding players through the
/// coordinator and print what each of them receives
pub async fn run_demo(config: &Config) -> Result<()> {
    let database = Database::open_in_memory(config.rating_settings())?;
    let notifier = Arc::new(ChannelNotifier::new());
    let coordinator = GameCoordinator::new(
        MatchmakingQueue::new(config.matchmaking_settings()),
        notifier.clone(),
        Arc::new(database.clone()),
        config.coordinator_settings(),
    );

    let authority = TokenAuthority::generate();
    let alice = ParticipantId::from("alice");
    let bob = ParticipantId::from("bob");
    let mut alice_events = notifier.subscribe(alice.clone());
    let mut bob_events = notifier.subscribe(bob.clone());

    for (id, name) in [(&alice, "Alice"), (&bob, "Bob")] {
        let token = authority.issue(id.as_str(), name)?;
        coordinator.connect(authority.resolve(&format!("Bearer {token}"))?);
    }

    let entry = coordinator.create_game(
        &alice,
        GameConfig {
            side: SidePreference::White,
        },
    )?;
    coordinator.join_game(&bob, entry.id)?;
    info!(game = %entry.id, "demo game started");

    let script = [
        (&alice, "P6", "f3"),
        (&bob, "P5", "e5"),
        (&alice, "P7", "g4"),
        (&bob, "Q", "h4"),
    ];
    for (player, piece, to) in script {
        coordinator.make_move(player, entry.id, piece, to)?;
    }
    coordinator.flush().await;

    drain("alice", &mut alice_events);
    drain("bob", &mut bob_events);

    if let Some(summary) = coordinator.finished_game(entry.id) {
        println!();
        println!("{}", display::format_move_list(&summary.moves));
    }
    println!();
    display::display_leaderboard(&database.leaderboard(10)?);
    Ok(())
}
