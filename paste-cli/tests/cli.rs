//! End-to-end tests of the `pastebin` binary against an unreachable API.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Data directory with a config pointing at a port nothing listens on.
fn offline_dir() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("pastebin.toml"),
        r#"
[api]
base_url = "http://127.0.0.1:1/address/"
timeout_secs = 2

[sync]
error_delay_ms = 0
"#,
    )
    .unwrap();
    dir
}

fn pastebin(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("pastebin").unwrap();
    cmd.arg("--data-dir").arg(dir.path());
    cmd
}

#[test]
fn help_lists_commands() {
    Command::cargo_bin("pastebin")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("login"))
        .stdout(predicate::str::contains("list"))
        .stdout(predicate::str::contains("sync"));
}

#[test]
fn status_before_login() {
    let dir = offline_dir();

    pastebin(&dir)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("NOT LOGGED IN"));
}

#[test]
fn login_then_status_shows_address() {
    let dir = offline_dir();

    pastebin(&dir)
        .args(["login", "--name", "alice", "--api-key", "secret"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Logged in as alice"));

    pastebin(&dir)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Address: alice"))
        .stdout(predicate::str::contains("secret").not());
}

#[test]
fn add_requires_login() {
    let dir = offline_dir();

    pastebin(&dir)
        .args(["add", "hello", "world"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No user found"));
}

#[test]
fn add_rejects_title_with_spaces() {
    let dir = offline_dir();
    pastebin(&dir)
        .args(["login", "--name", "alice", "--api-key", "k"])
        .assert()
        .success();

    pastebin(&dir)
        .args(["add", "hello world", "x"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Title mustn't contain spaces"));
}

#[test]
fn offline_add_is_listed_as_unsynced() {
    let dir = offline_dir();
    pastebin(&dir)
        .args(["login", "--name", "alice", "--api-key", "k"])
        .assert()
        .success();

    pastebin(&dir)
        .args(["add", "hello", "Hello, world!"])
        .assert()
        .success()
        .stdout(predicate::str::contains("not yet synced"));

    pastebin(&dir)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("* hello"))
        .stderr(predicate::str::contains(
            "Failed to fetch pastes from API, using local data",
        ));

    pastebin(&dir)
        .arg("sync")
        .assert()
        .success()
        .stdout(predicate::str::contains("Deferred: 1"));
}

#[test]
fn add_reads_content_from_file() {
    let dir = offline_dir();
    let file = dir.path().join("note.txt");
    std::fs::write(&file, "from a file").unwrap();
    pastebin(&dir)
        .args(["login", "--name", "alice", "--api-key", "k"])
        .assert()
        .success();

    pastebin(&dir)
        .args(["add", "note", "--file"])
        .arg(&file)
        .assert()
        .success();

    pastebin(&dir)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("from a file"));
}

#[test]
fn logout_keeps_cache() {
    let dir = offline_dir();
    pastebin(&dir)
        .args(["login", "--name", "alice", "--api-key", "k"])
        .assert()
        .success();
    pastebin(&dir)
        .args(["add", "draft", "x"])
        .assert()
        .success();

    pastebin(&dir)
        .arg("logout")
        .assert()
        .success()
        .stdout(predicate::str::contains("Logged out alice"));

    pastebin(&dir)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("NOT LOGGED IN"))
        .stdout(predicate::str::contains("Unsynced:  1"));
}

#[test]
fn invalid_config_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("pastebin.toml"), "[api\n").unwrap();

    pastebin(&dir)
        .arg("status")
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to parse config file"));
}

#[test]
fn api_url_flag_overrides_config() {
    let dir = offline_dir();

    pastebin(&dir)
        .args(["--api-url", "http://127.0.0.1:2/address/", "status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("http://127.0.0.1:2/address/"));
}
