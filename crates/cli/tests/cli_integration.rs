//! CLI integration tests for the `andor` subcommands.
//!
//! Uses `assert_cmd` to spawn the `andor` binary and verify exit codes,
//! stdout content, and stderr content.
//!
//! All tests set `current_dir` to the workspace root so that relative paths
//! to the shared fixtures resolve correctly.

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Locate the workspace root by walking up from CARGO_MANIFEST_DIR.
fn workspace_root() -> PathBuf {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    // crates/cli -> workspace root is two levels up
    manifest_dir
        .parent()
        .and_then(|p| p.parent())
        .expect("workspace root")
        .to_path_buf()
}

/// Helper: create a Command for the `andor` binary, rooted at workspace.
fn andor() -> Command {
    let mut cmd = cargo_bin_cmd!("andor");
    cmd.current_dir(workspace_root());
    cmd
}

fn write_model(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).expect("write model");
    path
}

// ──────────────────────────────────────────────
// 1. Help and version
// ──────────────────────────────────────────────

#[test]
fn help_exits_0_with_description() {
    andor()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Role- and state-based access control",
        ));
}

#[test]
fn version_exits_0() {
    andor()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("andor"));
}

#[test]
fn unknown_subcommand_fails() {
    andor().arg("frobnicate").assert().failure();
}

// ──────────────────────────────────────────────
// 2. check
// ──────────────────────────────────────────────

#[test]
fn check_valid_model_lists_states_and_roles() {
    andor()
        .args(["check", "fixtures/articles.toml"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Workflow 'articles' (default state: created)"))
        .stdout(predicate::str::contains("published"))
        .stdout(predicate::str::contains("may regress published -> review"))
        .stdout(predicate::str::contains("Model is valid."));
}

#[test]
fn check_json_includes_deleted_sentinel() {
    let output = andor()
        .args(["--output", "json", "check", "fixtures/articles.toml"])
        .output()
        .expect("run andor");
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).expect("valid JSON");
    let states = json["workflow"]["states"].as_array().expect("states array");
    let names: Vec<&str> = states.iter().filter_map(|s| s["name"].as_str()).collect();
    assert_eq!(names, vec!["created", "review", "published", "deleted"]);
    assert_eq!(states[3]["index"], 3);
}

#[test]
fn check_quiet_prints_nothing_on_success() {
    andor()
        .args(["--quiet", "check", "fixtures/articles.toml"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

#[test]
fn check_rejects_duplicate_indexes() {
    let dir = TempDir::new().unwrap();
    let path = write_model(
        &dir,
        "dup.toml",
        r#"
[[workflow.states]]
name = "draft"
index = 1

[[workflow.states]]
name = "final"
index = 1
"#,
    );
    andor()
        .arg("check")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("share progression index 1"));
}

#[test]
fn check_rejects_regression_grant_that_advances() {
    let dir = TempDir::new().unwrap();
    let path = write_model(
        &dir,
        "bad.toml",
        r#"
[workflow]
default_state = "draft"

[[workflow.states]]
name = "draft"
index = 0

[[workflow.states]]
name = "final"
index = 1

[[roles.boss.transitions]]
from = "draft"
to = "final"
"#,
    );
    andor()
        .arg("check")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("not a regression"));
}

#[test]
fn check_missing_file_reports_json_error() {
    let output = andor()
        .args(["--output", "json", "check", "fixtures/no-such-model.toml"])
        .output()
        .expect("run andor");
    assert!(!output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stderr).expect("valid JSON");
    assert!(json["error"].as_str().unwrap().contains("no-such-model.toml"));
}

#[test]
fn check_rejects_unsupported_extension() {
    let dir = TempDir::new().unwrap();
    let path = write_model(&dir, "model.yaml", "workflow: {}\n");
    andor()
        .arg("check")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains(".toml or .json"));
}

// ──────────────────────────────────────────────
// 3. grants
// ──────────────────────────────────────────────

#[test]
fn grants_prints_per_state_operations() {
    andor()
        .args([
            "grants",
            "fixtures/articles.toml",
            "--users",
            "fixtures/users.toml",
            "--user",
            "ed@example.edu",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("ed@example.edu (editor)"))
        .stdout(predicate::str::contains("read, update, assign"));
}

#[test]
fn grants_json_unions_roles() {
    let output = andor()
        .args([
            "--output",
            "json",
            "grants",
            "fixtures/articles.toml",
            "--users",
            "fixtures/users.toml",
            "--user",
            "chief@example.edu",
        ])
        .output()
        .expect("run andor");
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).expect("valid JSON");
    assert_eq!(json["roles"], serde_json::json!(["chief", "editor"]));
    let grants = json["grants"].as_array().expect("grants array");
    let deleted = grants
        .iter()
        .find(|g| g["state"] == "deleted")
        .expect("deleted grant");
    assert_eq!(deleted["operations"], serde_json::json!(["read", "assign"]));
}

#[test]
fn grants_unknown_user_fails() {
    andor()
        .args([
            "grants",
            "fixtures/articles.toml",
            "--users",
            "fixtures/users.toml",
            "--user",
            "nobody@example.edu",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown user 'nobody@example.edu'"));
}

// ──────────────────────────────────────────────
// 4. users
// ──────────────────────────────────────────────

/// Copy the fixture users file into a temp dir so edits stay local.
fn scratch_users(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("users.toml");
    fs::copy(workspace_root().join("fixtures/users.toml"), &path).expect("copy users");
    path
}

fn users_cmd(users: &Path) -> Command {
    let mut cmd = andor();
    cmd.args(["users", "--model", "fixtures/articles.toml", "--users"])
        .arg(users);
    cmd
}

#[test]
fn users_list_renders_toml_tables() {
    andor()
        .args([
            "users",
            "--model",
            "fixtures/articles.toml",
            "--users",
            "fixtures/users.toml",
            "list",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("[\"chief@example.edu\"]"))
        .stdout(predicate::str::contains("display_name = \"Chief Editor\""));
}

#[test]
fn users_add_then_grant_and_revoke_roles() {
    let dir = TempDir::new().unwrap();
    let users = scratch_users(&dir);

    users_cmd(&users)
        .args(["add", "rae@example.edu", "--display-name", "Rae", "--role", "reader"])
        .assert()
        .success()
        .stdout(predicate::str::contains("added user 'rae@example.edu'"));
    users_cmd(&users)
        .args(["add-role", "rae@example.edu", "editor"])
        .assert()
        .success();
    users_cmd(&users)
        .args(["remove-role", "rae@example.edu", "reader"])
        .assert()
        .success();

    let output = users_cmd(&users)
        .args(["--output", "json", "list"])
        .output()
        .expect("run andor");
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).expect("valid JSON");
    let rae = json
        .as_array()
        .expect("user array")
        .iter()
        .find(|u| u["user_id"] == "rae@example.edu")
        .expect("rae listed");
    assert_eq!(rae["member_of"], serde_json::json!(["editor"]));
    assert_eq!(rae["display_name"], "Rae");

    // the edited file still loads for grants
    andor()
        .args(["grants", "fixtures/articles.toml", "--user", "rae@example.edu", "--users"])
        .arg(&users)
        .assert()
        .success()
        .stdout(predicate::str::contains("rae@example.edu (editor)"));
}

#[test]
fn users_add_creates_a_missing_file() {
    let dir = TempDir::new().unwrap();
    let users = dir.path().join("fresh.json");
    users_cmd(&users)
        .args(["add", "first@example.edu", "--create-queue", "created"])
        .assert()
        .success();
    let raw = fs::read_to_string(&users).expect("users file written");
    let json: serde_json::Value = serde_json::from_str(&raw).expect("valid JSON");
    assert_eq!(json["first@example.edu"]["create_queue"], "created");
}

#[test]
fn users_refuses_unknown_role_and_leaves_file_alone() {
    let dir = TempDir::new().unwrap();
    let users = scratch_users(&dir);
    let before = fs::read_to_string(&users).unwrap();

    users_cmd(&users)
        .args(["add-role", "ed@example.edu", "janitor"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("role 'janitor' is not defined"));
    users_cmd(&users)
        .args(["add", "ed@example.edu"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
    assert_eq!(fs::read_to_string(&users).unwrap(), before);
}

#[test]
fn users_remove_drops_the_record() {
    let dir = TempDir::new().unwrap();
    let users = scratch_users(&dir);
    users_cmd(&users)
        .args(["remove", "guest@example.edu"])
        .assert()
        .success();
    users_cmd(&users)
        .args(["remove", "guest@example.edu"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown user 'guest@example.edu'"));
}

// ──────────────────────────────────────────────
// 5. serve (startup failures only; see serve_integration.rs)
// ──────────────────────────────────────────────

#[test]
fn serve_missing_config_fails() {
    andor()
        .args(["serve", "--config", "fixtures/missing.toml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing.toml"));
}

#[test]
fn serve_rejects_invalid_collection() {
    let dir = TempDir::new().unwrap();
    let path = write_model(
        &dir,
        "andor.toml",
        "[service]\ncollections = [\"a/b\"]\nmodel = \"m.toml\"\nusers = \"u.toml\"\n",
    );
    andor()
        .arg("serve")
        .arg("--config")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("single non-empty path segment"));
}
