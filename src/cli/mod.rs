pub mod app;
pub mod commands;
pub mod display;

pub use app::{parse_move_list, replay, replay_file, run_demo, App};
pub use commands::{Cli, Commands, ConfigCommand, TokenCommand};
pub use display::{
    describe_event, display_board, display_leaderboard, format_history, format_leaderboard,
    format_move_list,
};
