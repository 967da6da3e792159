use crate::chess::{Board, MoveRecord, Side};
use crate::game::ParticipantId;
use crate::services::{Event, PlayerRating};
use crate::storage::{StoredGame, StoredResult};

fn rule(left: char, mid: char, right: char, widths: &[usize]) -> String {
    let cells: Vec<String> = widths.iter().map(|w| "─".repeat(w + 2)).collect();
    format!("{}{}{}", left, cells.join(&mid.to_string()), right)
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        text.to_string()
    } else {
        let kept: String = text.chars().take(width.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}

/// Render the leaderboard as a box-drawn table
pub fn format_leaderboard(players: &[PlayerRating]) -> String {
    if players.is_empty() {
        return "No rated players yet.".to_string();
    }

    let rank_width = 4;
    let name_width = players
        .iter()
        .map(|p| p.display_name.chars().count())
        .max()
        .unwrap_or(4)
        .clamp(4, 24);
    let id_width = players
        .iter()
        .map(|p| p.identity.as_str().chars().count())
        .max()
        .unwrap_or(8)
        .clamp(8, 20);
    let rating_width = 6;
    let widths = [rank_width, name_width, id_width, rating_width];

    let mut out = Vec::with_capacity(players.len() + 4);
    out.push(rule('┌', '┬', '┐', &widths));
    out.push(format!(
        "│ {:^rank_width$} │ {:^name_width$} │ {:^id_width$} │ {:^rating_width$} │",
        "#", "Name", "Identity", "Rating"
    ));
    out.push(rule('├', '┼', '┤', &widths));
    for (index, player) in players.iter().enumerate() {
        out.push(format!(
            "│ {:>rank_width$} │ {:name_width$} │ {:id_width$} │ {:>rating_width$} │",
            index + 1,
            truncate(&player.display_name, name_width),
            truncate(player.identity.as_str(), id_width),
            player.rating,
        ));
    }
    out.push(rule('└', '┴', '┘', &widths));
    out.join("\n")
}

pub fn display_leaderboard(players: &[PlayerRating]) {
    println!("{}", format_leaderboard(players));
}

/// One line per game from `identity`'s point of view
pub fn format_history(identity: &ParticipantId, games: &[StoredGame]) -> String {
    if games.is_empty() {
        return format!("No rated games for {}.", identity);
    }

    let mut lines = Vec::with_capacity(games.len() + 1);
    for game in games {
        let opponent = if &game.first_player == identity {
            &game.second_player
        } else {
            &game.first_player
        };
        let verdict = match game.result {
            StoredResult::Draw => "draw",
            StoredResult::Win if game.winner() == Some(identity) => "won",
            StoredResult::Win => "lost",
        };
        lines.push(format!(
            "{:<36}  {:<5} vs {:<20} {:>3} moves",
            game.id,
            verdict,
            truncate(opponent.as_str(), 20),
            game.moves.len()
        ));
    }
    lines.push(format!("{} game(s) total", games.len()));
    lines.join("\n")
}

/// Numbered move list, White and Black moves paired per line
pub fn format_move_list(moves: &[MoveRecord]) -> String {
    moves
        .chunks(2)
        .enumerate()
        .map(|(i, pair)| match pair {
            [white, black] => format!("{:>3}. {:<16} {}", i + 1, white.to_string(), black),
            [white] => format!("{:>3}. {}", i + 1, white),
            _ => String::new(),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn display_board(board: &Board, to_move: Side) {
    println!();
    println!("{}", board.to_ascii());
    println!("To move: {}", to_move);
}

/// Short human-readable description of an event, as printed by `demo`
pub fn describe_event(event: &Event) -> String {
    match event {
        Event::LobbyUpdate { games } => format!("{} game(s) open in the lobby", games.len()),
        Event::GameCreated { game } => format!("created game {}", game.id),
        Event::GameStart { game } => {
            let names: Vec<String> = game
                .players
                .iter()
                .map(|p| format!("{} ({})", p.display_name, p.side))
                .collect();
            format!("game {} started: {}", game.id, names.join(" vs "))
        }
        Event::GameState { game } => format!("state of game {} after {} move(s)", game.id, game.moves.len()),
        Event::BoardUpdate { last_move, .. } => format!("{} played {}", last_move.side, last_move),
        Event::GameEnd { summary } => format!("game {} ended: {:?}", summary.id, summary.reason),
        Event::DrawProposed { by, .. } => format!("{} offers a draw", by),
        Event::DrawRejected { .. } => "draw offer declined".to_string(),
        Event::OpponentDisconnected { participant, .. } => format!("{} disconnected", participant),
        Event::PlayerReconnected { participant, .. } => format!("{} reconnected", participant),
        Event::QueueStatus { status } => format!(
            "queue position {} of {}, range ±{}",
            status.position, status.players_in_queue, status.acceptance_range
        ),
        Event::QueueTimeout => "no opponent found in time".to_string(),
        Event::RematchProposed { proposer, .. } => format!("{} proposes a rematch", proposer),
        Event::RematchAccepted { game, .. } => format!("rematch accepted, new game {}", game.id),
        Event::RematchRejected { .. } => "rematch declined".to_string(),
    }
}
