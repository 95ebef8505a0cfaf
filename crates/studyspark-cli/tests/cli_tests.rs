//! CLI integration tests using assert_cmd.

use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// A command isolated in `dir`: no config is found and cards live in `dir`.
fn studyspark(dir: &Path) -> Command {
    #[allow(deprecated)]
    let mut cmd = Command::cargo_bin("studyspark").unwrap();
    cmd.current_dir(dir)
        .env("HOME", dir)
        .env("STUDYSPARK_DATA", dir.join("data").join("cards.json"))
        .env_remove("STUDYSPARK_OWNER");
    cmd
}

const DECK: &str = r#"
[deck]
id = "dbms"
name = "Databases"

[[cards]]
topic = "sql"
question = "What does SELECT do?"
answer = "Reads rows"

[[cards]]
topic = "sql"
question = "What does DELETE do?"
answer = "Removes rows"

[[cards]]
topic = "os"
question = "What is a page fault?"
answer = "Access to a page not in memory"
"#;

fn write_deck(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("dbms.toml");
    std::fs::write(&path, DECK).unwrap();
    path
}

fn import(dir: &Path) {
    let deck = write_deck(dir);
    studyspark(dir)
        .arg("import")
        .arg("--deck")
        .arg(&deck)
        .assert()
        .success()
        .stdout(predicate::str::contains("Imported 3 card(s) from Databases for local"));
}

fn due_ids(dir: &Path, owner: &str) -> Vec<String> {
    let output = studyspark(dir)
        .args(["due", "--owner", owner, "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let cards: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    cards
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["id"].as_str().unwrap().to_string())
        .collect()
}

#[test]
fn help_output() {
    let dir = TempDir::new().unwrap();
    studyspark(dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Spaced-repetition flashcard scheduler"));
}

#[test]
fn version_output() {
    let dir = TempDir::new().unwrap();
    studyspark(dir.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("studyspark"));
}

#[test]
fn init_creates_files() {
    let dir = TempDir::new().unwrap();

    studyspark(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Created studyspark.toml"))
        .stdout(predicate::str::contains("Created decks/example.toml"));

    assert!(dir.path().join("studyspark.toml").exists());
    assert!(dir.path().join("decks/example.toml").exists());

    studyspark(dir.path())
        .args(["validate", "--deck", "decks/example.toml"])
        .assert()
        .success()
        .stdout(predicate::str::contains("3 cards"))
        .stdout(predicate::str::contains("All decks valid"));
}

#[test]
fn init_skips_existing() {
    let dir = TempDir::new().unwrap();

    studyspark(dir.path()).arg("init").assert().success();

    studyspark(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("already exists"));
}

#[test]
fn validate_reports_warnings() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bad.toml");
    std::fs::write(
        &path,
        r#"
[deck]
id = "bad"
name = "Bad"

[[cards]]
topic = "sql"
question = "Q"
answer = ""

[[cards]]
topic = "sql"
question = "q"
answer = "A"
"#,
    )
    .unwrap();

    studyspark(dir.path())
        .arg("validate")
        .arg("--deck")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("[card 1] WARNING: answer is empty"))
        .stdout(predicate::str::contains("[card 2] WARNING: duplicate question"))
        .stdout(predicate::str::contains("2 warning(s) found"));
}

#[test]
fn validate_nonexistent_file() {
    let dir = TempDir::new().unwrap();
    studyspark(dir.path())
        .args(["validate", "--deck", "nonexistent.toml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error"));
}

#[test]
fn import_then_due() {
    let dir = TempDir::new().unwrap();
    import(dir.path());

    studyspark(dir.path())
        .arg("due")
        .assert()
        .success()
        .stdout(predicate::str::contains("3 card(s) due for local"))
        .stdout(predicate::str::contains("page fault"));

    studyspark(dir.path())
        .args(["due", "--limit", "2", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"owner_id\": \"local\""));

    assert_eq!(due_ids(dir.path(), "local").len(), 3);
    assert!(due_ids(dir.path(), "someone-else").is_empty());
}

#[test]
fn import_with_owner_override() {
    let dir = TempDir::new().unwrap();
    let deck = write_deck(dir.path());

    studyspark(dir.path())
        .arg("import")
        .arg("--deck")
        .arg(&deck)
        .args(["--owner", "alice"])
        .assert()
        .success()
        .stdout(predicate::str::contains("for alice"));

    studyspark(dir.path())
        .arg("due")
        .assert()
        .success()
        .stdout(predicate::str::contains("No cards due for local."));

    studyspark(dir.path())
        .args(["due", "--owner", "alice", "--limit", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 card(s) due for alice"));
}

#[test]
fn review_reschedules_card() {
    let dir = TempDir::new().unwrap();
    import(dir.path());
    let ids = due_ids(dir.path(), "local");
    let reviewed = ids[0].clone();

    studyspark(dir.path())
        .args(["review", "--card", &reviewed, "--correct", "--time", "12"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Recorded correct"))
        .stdout(predicate::str::contains("interval 2.5 days, ease 2.60"))
        .stdout(predicate::str::contains("mastery 100% (1/1 correct, 1 in a row)"));

    let remaining = due_ids(dir.path(), "local");
    assert_eq!(remaining.len(), 2);
    assert!(!remaining.contains(&reviewed));

    let output = studyspark(dir.path())
        .args(["stats", "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let snapshot: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let summary = &snapshot["aggregate"]["summary"];
    assert_eq!(summary["total_flashcards"], 3);
    assert_eq!(summary["total_studied"], 1);
    assert_eq!(summary["total_correct"], 1);
}

#[test]
fn incorrect_review_keeps_card_due_tomorrow() {
    let dir = TempDir::new().unwrap();
    import(dir.path());
    let id = due_ids(dir.path(), "local")[0].clone();

    studyspark(dir.path())
        .args(["review", "--card", &id, "--incorrect"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Recorded incorrect"))
        .stdout(predicate::str::contains("interval 1.0 days, ease 2.30"))
        .stdout(predicate::str::contains("mastery 0% (0/1 correct, 0 in a row)"));
}

#[test]
fn review_requires_exactly_one_outcome() {
    let dir = TempDir::new().unwrap();
    let id = uuid::Uuid::nil().to_string();

    studyspark(dir.path())
        .args(["review", "--card", &id])
        .assert()
        .failure();

    studyspark(dir.path())
        .args(["review", "--card", &id, "--correct", "--incorrect"])
        .assert()
        .failure();
}

#[test]
fn review_unknown_card_fails() {
    let dir = TempDir::new().unwrap();
    import(dir.path());

    studyspark(dir.path())
        .args([
            "review",
            "--card",
            "00000000-0000-0000-0000-000000000001",
            "--correct",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("flashcard not found"));

    studyspark(dir.path())
        .args(["review", "--card", "not-a-uuid", "--correct"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid card id"));
}

#[test]
fn negative_study_time_is_rejected_and_nothing_changes() {
    let dir = TempDir::new().unwrap();
    import(dir.path());
    let id = due_ids(dir.path(), "local")[0].clone();

    studyspark(dir.path())
        .args(["review", "--card", &id, "--correct", "--time=-5"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid input"));

    assert_eq!(due_ids(dir.path(), "local").len(), 3);
}

#[test]
fn stats_save_and_compare() {
    let dir = TempDir::new().unwrap();
    import(dir.path());

    let baseline = dir.path().join("baseline.json");
    studyspark(dir.path())
        .arg("stats")
        .arg("--save")
        .arg(&baseline)
        .assert()
        .success()
        .stdout(predicate::str::contains("Flashcards (all owners): 3"));
    assert!(baseline.exists());

    // Answer one "sql" card correctly: sql mastery goes from 0 to 50.
    let output = studyspark(dir.path())
        .args(["due", "--format", "json"])
        .output()
        .unwrap();
    let cards: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let sql_card = cards
        .as_array()
        .unwrap()
        .iter()
        .find(|c| c["topic"] == "sql")
        .unwrap()["id"]
        .as_str()
        .unwrap()
        .to_string();
    studyspark(dir.path())
        .args(["review", "--card", &sql_card, "--correct"])
        .assert()
        .success();

    let current = dir.path().join("current.json");
    studyspark(dir.path())
        .arg("stats")
        .arg("--save")
        .arg(&current)
        .assert()
        .success();

    studyspark(dir.path())
        .arg("compare")
        .arg("--baseline")
        .arg(&baseline)
        .arg("--current")
        .arg(&current)
        .assert()
        .success()
        .stdout(predicate::str::contains("0 regressions, 1 improvements, 1 unchanged"))
        .stdout(predicate::str::contains("sql 0.0% -> 50.0% (+50.0)"));

    // Swapped, the improvement becomes a regression.
    studyspark(dir.path())
        .arg("compare")
        .arg("--baseline")
        .arg(&current)
        .arg("--current")
        .arg(&baseline)
        .args(["--format", "markdown", "--fail-on-regression"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("### Regressions"));
}

#[test]
fn stats_save_defaults_to_output_dir() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("studyspark.toml"),
        "output_dir = \"reports\"\n",
    )
    .unwrap();
    import(dir.path());

    studyspark(dir.path())
        .args(["stats", "--save"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Snapshot saved to"));

    let saved: Vec<_> = std::fs::read_dir(dir.path().join("reports"))
        .unwrap()
        .collect();
    assert_eq!(saved.len(), 1);
}

#[test]
fn explicit_config_sets_owner_and_store() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("custom.toml");
    std::fs::write(
        &config,
        r#"
default_owner = "bob"

[store]
type = "json"
path = "bob-cards.json"
"#,
    )
    .unwrap();
    let deck = write_deck(dir.path());

    #[allow(deprecated)]
    let mut cmd = Command::cargo_bin("studyspark").unwrap();
    cmd.current_dir(dir.path())
        .env("HOME", dir.path())
        .env_remove("STUDYSPARK_DATA")
        .env_remove("STUDYSPARK_OWNER")
        .arg("--config")
        .arg(&config)
        .arg("import")
        .arg("--deck")
        .arg(&deck)
        .assert()
        .success()
        .stdout(predicate::str::contains("for bob"));

    assert!(dir.path().join("bob-cards.json").exists());
}

#[test]
fn compare_nonexistent_snapshot() {
    let dir = TempDir::new().unwrap();
    studyspark(dir.path())
        .args([
            "compare",
            "--baseline",
            "no_such_file.json",
            "--current",
            "also_no_file.json",
        ])
        .assert()
        .failure();
}

#[test]
fn unknown_format_fails() {
    let dir = TempDir::new().unwrap();
    studyspark(dir.path())
        .args(["due", "--format", "xml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown format"));
}

#[test]
fn validate_bundled_decks() {
    let dir = TempDir::new().unwrap();
    let decks = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../decks");
    studyspark(dir.path())
        .arg("validate")
        .arg("--deck")
        .arg(&decks)
        .assert()
        .success()
        .stdout(predicate::str::contains("Database Fundamentals (6 cards)"))
        .stdout(predicate::str::contains("Operating Systems (4 cards)"))
        .stdout(predicate::str::contains("All decks valid"));
}
