//! Binary smoke tests
//!
//! Each test points the data and config directories at a temp dir so nothing
//! touches the real home directory.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn refiner(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("refiner").expect("binary should build");
    cmd.env("HOME", home.path())
        .env("XDG_DATA_HOME", home.path().join("data"))
        .env("XDG_CONFIG_HOME", home.path().join("config"))
        .env_remove("GEMINI_API_KEY")
        .current_dir(home.path());
    cmd
}

#[test]
fn test_help_lists_subcommands() {
    let home = TempDir::new().unwrap();
    refiner(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("refine"))
        .stdout(predicate::str::contains("history"))
        .stdout(predicate::str::contains("GEMINI_API_KEY"));
}

#[test]
fn test_version() {
    let home = TempDir::new().unwrap();
    refiner(&home).arg("--version").assert().success().stdout(predicate::str::starts_with("refiner"));
}

#[test]
fn test_stacks_lists_known_technologies() {
    let home = TempDir::new().unwrap();
    refiner(&home)
        .arg("stacks")
        .assert()
        .success()
        .stdout(predicate::str::contains("React"))
        .stdout(predicate::str::contains("PostgreSQL"))
        .stdout(predicate::str::contains("Combined contexts"));
}

#[test]
fn test_config_prints_yaml() {
    let home = TempDir::new().unwrap();
    refiner(&home)
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("max-attempts: 3"))
        .stdout(predicate::str::contains("gemini-2.5-pro"));
}

#[test]
fn test_local_config_file_is_used() {
    let home = TempDir::new().unwrap();
    std::fs::write(home.path().join(".refiner.yml"), "session:\n  max-rounds: 2\n").unwrap();
    refiner(&home)
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("max-rounds: 2"));
}

#[test]
fn test_empty_history() {
    let home = TempDir::new().unwrap();
    refiner(&home)
        .args(["history", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No history yet."));
}

#[test]
fn test_refine_without_key_fails_fast() {
    let home = TempDir::new().unwrap();
    refiner(&home)
        .args(["refine", "write unit tests"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("API key not found"));
}

#[test]
fn test_unknown_history_id() {
    let home = TempDir::new().unwrap();
    refiner(&home)
        .args(["history", "show", "nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No history entry matches"));
}

#[test]
fn test_corrupt_history_still_lists() {
    let home = TempDir::new().unwrap();
    let history = home.path().join("history.json");
    std::fs::write(&history, "{ not json").unwrap();
    std::fs::write(
        home.path().join(".refiner.yml"),
        format!("storage:\n  history-path: {}\n", history.display()),
    )
    .unwrap();

    refiner(&home)
        .args(["history", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No history yet."));
    assert!(home.path().join("history.json.corrupt").exists());
}

#[test]
fn test_templates_lists_library() {
    let home = TempDir::new().unwrap();
    refiner(&home)
        .arg("templates")
        .assert()
        .success()
        .stdout(predicate::str::contains("unit-tests"))
        .stdout(predicate::str::contains("Detailed examples"))
        .stdout(predicate::str::contains("sql-index"));
}

#[test]
fn test_templates_show_one() {
    let home = TempDir::new().unwrap();
    refiner(&home)
        .args(["templates", "SQL-INDEX"])
        .assert()
        .success()
        .stdout(predicate::str::contains("CREATE TABLE users"));
}

#[test]
fn test_refine_unknown_template() {
    let home = TempDir::new().unwrap();
    refiner(&home)
        .env("GEMINI_API_KEY", "test-key")
        .args(["refine", "--template", "nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown template 'nope'"));
}

#[test]
fn test_refine_filled_template_needs_no_input() {
    let home = TempDir::new().unwrap();
    refiner(&home)
        .args(["refine", "-t", "readme", "--set", "PROJECT_NAME=refiner"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("API key not found"));
}
