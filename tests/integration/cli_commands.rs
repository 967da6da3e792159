use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn mate_arena(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_mate-arena"))
        .arg("--config")
        .arg(dir.join("config.toml"))
        .args(args)
        .env("RUST_LOG", "error")
        .env("MATE_ARENA_DATA_DIR", dir)
        .output()
        .expect("Failed to run mate-arena")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

#[test]
fn test_config_path_and_show() {
    let dir = TempDir::new().unwrap();
    let output = mate_arena(dir.path(), &["config", "path"]);
    assert!(output.status.success());
    assert!(stdout(&output).trim().ends_with("config.toml"));
    assert!(dir.path().join("config.toml").exists());

    let output = mate_arena(dir.path(), &["config", "show"]);
    let shown = stdout(&output);
    assert!(shown.contains("[matchmaking]"));
    assert!(shown.contains("k_factor = 24"));
}

#[test]
fn test_replay_prints_mate() {
    let dir = TempDir::new().unwrap();
    let moves = dir.path().join("moves.json");
    std::fs::write(&moves, r#"[["P6","f3"],["P5","e5"],["P7","g4"],["Q","h4"]]"#).unwrap();

    let output = mate_arena(dir.path(), &["replay", "--quiet", moves.to_str().unwrap()]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let printed = stdout(&output);
    assert!(printed.contains("Q d8-h4#"));
    assert!(printed.contains("a b c d e f g h"));
}

#[test]
fn test_replay_rejects_illegal_move() {
    let dir = TempDir::new().unwrap();
    let moves = dir.path().join("moves.json");
    std::fs::write(&moves, r#"[["P5","e4"],["P5","e4"]]"#).unwrap();

    let output = mate_arena(dir.path(), &["replay", moves.to_str().unwrap()]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Move 2"));
}

#[test]
fn test_token_issue_and_verify() {
    let dir = TempDir::new().unwrap();
    let secret = stdout(&mate_arena(dir.path(), &["token", "secret"]));
    let secret = secret.trim();
    assert_eq!(secret.len(), 64);

    let token = stdout(&mate_arena(
        dir.path(),
        &["token", "issue", "user-1", "Vera", "--secret", secret],
    ));
    let output = mate_arena(
        dir.path(),
        &["token", "verify", token.trim(), "--secret", secret],
    );
    assert!(output.status.success());
    assert!(stdout(&output).contains("\"sub\": \"user-1\""));

    let other = "ab".repeat(32);
    let output = mate_arena(dir.path(), &["token", "verify", token.trim(), "--secret", &other]);
    assert!(!output.status.success());
}

#[test]
fn test_leaderboard_on_fresh_database() {
    let dir = TempDir::new().unwrap();
    let output = mate_arena(dir.path(), &["leaderboard"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert!(stdout(&output).contains("No rated players yet."));
    assert!(dir.path().join("arena.sqlite").exists());
}

#[test]
fn test_demo_records_rated_game() {
    let dir = TempDir::new().unwrap();
    let output = mate_arena(dir.path(), &["demo"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let printed = stdout(&output);
    assert!(printed.contains("game:end"));
    assert!(printed.contains("Bob"));
    assert!(printed.contains("1212"));
}
