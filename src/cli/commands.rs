use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "mate-arena")]
#[command(about = "Two-player chess arena: lobby, rated matchmaking and rematches")]
pub struct Cli {
    /// Configuration file to use instead of the default location
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Configuration management commands
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    /// Show the highest rated players
    ///
    /// Examples:
    ///   mate-arena leaderboard
    ///   mate-arena leaderboard --limit 25
    Leaderboard {
        #[arg(short, long, default_value_t = 10)]
        limit: u32,
        /// Database file to read instead of the configured one
        #[arg(short, long)]
        database: Option<PathBuf>,
    },

    /// Show the rated games a player took part in
    History {
        /// Player identity (the token subject)
        identity: String,
        #[arg(short, long)]
        database: Option<PathBuf>,
    },

    /// Replay a move list and print every resulting position
    ///
    /// The file holds a JSON array of `[piece, cell]` pairs, alternating
    /// sides starting with White, e.g. `[["P5", "e4"], ["P5", "e5"]]`.
    Replay {
        /// Path of the JSON move list
        moves: PathBuf,
        /// Only print the final position
        #[arg(short, long)]
        quiet: bool,
    },

    /// Play a scripted game through the coordinator against an in-memory
    /// database and print every event it emits
    Demo,

    /// Bearer token commands
    Token {
        #[command(subcommand)]
        command: TokenCommand,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show the configuration file path
    Path,
    /// Print the effective configuration
    Show,
    /// Write the default configuration (overwrites existing)
    Init,
}

#[derive(Subcommand)]
pub enum TokenCommand {
    /// Generate a fresh signing secret
    Secret,
    /// Issue a token for a registered player
    Issue {
        identity: String,
        display_name: String,
        /// 64-character hex signing secret
        #[arg(short, long)]
        secret: String,
    },
    /// Check a token and print its claims
    Verify {
        token: String,
        #[arg(short, long)]
        secret: String,
    },
}
