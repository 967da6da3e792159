use anyhow::Result;
use clap::Parser;
use mate_arena::cli::{self, App, Cli, Commands, ConfigCommand, TokenCommand};
use mate_arena::game::ParticipantId;
use mate_arena::services::TokenAuthority;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// `RUST_LOG` wins over the configured filter
fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut app = App::load(cli.config.clone())?;
    init_tracing(&app.config.logging.filter);

    match cli.command {
        Commands::Config { command } => match command {
            ConfigCommand::Path => {
                println!("{}", app.config_path.display());
            }
            ConfigCommand::Show => {
                println!("{}", app.show_config()?);
            }
            ConfigCommand::Init => {
                warn!("Overwriting configuration at {}", app.config_path.display());
                app.reset_config()?;
                info!("Default configuration written to {}", app.config_path.display());
            }
        },
        Commands::Leaderboard { limit, database } => {
            let db = app.open_database(database.as_deref())?;
            cli::display_leaderboard(&db.leaderboard(limit)?);
        }
        Commands::History { identity, database } => {
            let db = app.open_database(database.as_deref())?;
            let identity = ParticipantId::new(identity);
            let games = db.games_for(&identity)?;
            println!("{}", cli::format_history(&identity, &games));
        }
        Commands::Replay { moves, quiet } => {
            cli::replay_file(&moves, quiet)?;
        }
        Commands::Demo => {
            cli::run_demo(&app.config).await?;
        }
        Commands::Token { command } => match command {
            TokenCommand::Secret => {
                let mut secret = [0u8; 32];
                rand::RngCore::fill_bytes(&mut rand::rngs::OsRng, &mut secret);
                println!("{}", hex::encode(secret));
            }
            TokenCommand::Issue {
                identity,
                display_name,
                secret,
            } => {
                let authority = TokenAuthority::from_hex(&secret)?;
                println!("{}", authority.issue(&identity, &display_name)?);
            }
            TokenCommand::Verify { token, secret } => {
                let authority = TokenAuthority::from_hex(&secret)?;
                let claims = authority.verify(token.strip_prefix("Bearer ").unwrap_or(&token))?;
                println!("{}", serde_json::to_string_pretty(&claims)?);
            }
        },
    }

    Ok(())
}
