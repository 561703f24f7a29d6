//! Integration tests for the `tstack` CLI.
//!
//! Each test creates a temp workspace, runs `tstack` as a subprocess,
//! and verifies stdout and/or the records on disk.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use serde_json::Value;
use tempfile::TempDir;

/// Get the path to the built `tstack` binary.
fn tstack_bin() -> PathBuf {
    // cargo test builds to target/debug/
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("tstack");
    path
}

/// Run `tstack` with the given args in the given directory, returning (stdout, stderr, success).
fn run(dir: &Path, args: &[&str]) -> (String, String, bool) {
    let output = Command::new(tstack_bin())
        .args(args)
        .current_dir(dir)
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run tstack");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

/// Run `tstack` expecting success, return stdout.
fn run_ok(dir: &Path, args: &[&str]) -> String {
    let (stdout, stderr, success) = run(dir, args);
    if !success {
        panic!(
            "tstack {:?} failed:\nstdout: {}\nstderr: {}",
            args, stdout, stderr
        );
    }
    stdout
}

/// Run `tstack` expecting failure, return stderr.
fn run_err(dir: &Path, args: &[&str]) -> String {
    let (stdout, stderr, success) = run(dir, args);
    if success {
        panic!("tstack {:?} should have failed:\nstdout: {}", args, stdout);
    }
    stderr
}

fn init_workspace() -> TempDir {
    let tmp = TempDir::new().unwrap();
    run_ok(tmp.path(), &["init"]);
    tmp
}

fn push(dir: &Path, title: &str) -> String {
    run_ok(dir, &["push", title]).trim().to_string()
}

fn list_json(dir: &Path) -> Value {
    serde_json::from_str(&run_ok(dir, &["list", "--json"])).unwrap()
}

/// Titles top first.
fn titles(dir: &Path) -> Vec<String> {
    list_json(dir)["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["title"].as_str().unwrap().to_string())
        .collect()
}

fn write_stack_record(dir: &Path, json: &str) {
    fs::write(dir.join(".tstack/todo-stack.json"), json).unwrap();
}

// ---------------------------------------------------------------------------
// init
// ---------------------------------------------------------------------------

#[test]
fn test_init_creates_config() {
    let tmp = TempDir::new().unwrap();
    let out = run_ok(tmp.path(), &["init"]);
    assert!(out.contains("Initialized tstack workspace"));
    let config = fs::read_to_string(tmp.path().join(".tstack/config.toml")).unwrap();
    assert!(config.contains("max_items = 5"));
}

#[test]
fn test_init_twice_needs_force() {
    let tmp = init_workspace();
    let err = run_err(tmp.path(), &["init"]);
    assert!(err.contains("already initialized"));
    run_ok(tmp.path(), &["init", "--force"]);
}

#[test]
fn test_outside_workspace_is_an_error() {
    let tmp = TempDir::new().unwrap();
    let err = run_err(tmp.path(), &["list"]);
    assert!(err.contains("not a tstack workspace"));
}

#[test]
fn test_discovers_workspace_from_subdirectory() {
    let tmp = init_workspace();
    let sub = tmp.path().join("src/deep");
    fs::create_dir_all(&sub).unwrap();
    push(&sub, "from below");
    assert_eq!(titles(tmp.path()), vec!["from below"]);
}

#[test]
fn test_dir_flag() {
    let tmp = init_workspace();
    let elsewhere = TempDir::new().unwrap();
    let root = tmp.path().to_str().unwrap();
    run_ok(elsewhere.path(), &["-C", root, "push", "remote"]);
    assert_eq!(titles(tmp.path()), vec!["remote"]);
}

// ---------------------------------------------------------------------------
// push / pop / list
// ---------------------------------------------------------------------------

#[test]
fn test_list_empty_default_command() {
    let tmp = init_workspace();
    let out = run_ok(tmp.path(), &[]);
    assert_eq!(out, "stack is empty\n0 / 5 items\n");
}

#[test]
fn test_push_lists_top_first() {
    let tmp = init_workspace();
    let a = push(tmp.path(), "first");
    push(tmp.path(), "second");
    assert_eq!(a.len(), 36);

    let out = run_ok(tmp.path(), &["list"]);
    let second = out.find("second").unwrap();
    let first = out.find("first").unwrap();
    assert!(second < first);
    assert!(out.ends_with("2 / 5 items\n"));
}

#[test]
fn test_push_persists_record() {
    let tmp = init_workspace();
    run_ok(
        tmp.path(),
        &["push", "with links", "-d", "details", "-l", "example.com", "-l", " example.com "],
    );
    let raw = fs::read_to_string(tmp.path().join(".tstack/todo-stack.json")).unwrap();
    let items: Value = serde_json::from_str(&raw).unwrap();
    let item = &items[0];
    assert_eq!(item["title"], "with links");
    assert_eq!(item["description"], "details");
    assert_eq!(item["links"], serde_json::json!(["example.com"]));
    assert_eq!(item["selected"], false);
    assert!(item["createdAt"].is_i64());
}

#[test]
fn test_push_empty_title_rejected() {
    let tmp = init_workspace();
    let err = run_err(tmp.path(), &["push", "   "]);
    assert!(err.contains("title cannot be empty"));
}

#[test]
fn test_push_evicts_oldest() {
    let tmp = init_workspace();
    run_ok(tmp.path(), &["settings", "--max-items", "2"]);
    for t in ["a", "b", "c"] {
        push(tmp.path(), t);
    }
    assert_eq!(titles(tmp.path()), vec!["c", "b"]);
}

#[test]
fn test_pop() {
    let tmp = init_workspace();
    push(tmp.path(), "bottom");
    push(tmp.path(), "top");
    let out = run_ok(tmp.path(), &["pop"]);
    assert!(out.contains("top"));
    assert_eq!(titles(tmp.path()), vec!["bottom"]);

    run_ok(tmp.path(), &["pop"]);
    assert_eq!(run_ok(tmp.path(), &["pop"]), "stack is empty\n");
}

// ---------------------------------------------------------------------------
// selection, moves, delete
// ---------------------------------------------------------------------------

#[test]
fn test_select_toggles() {
    let tmp = init_workspace();
    let a = push(tmp.path(), "a");
    let out = run_ok(tmp.path(), &["select", &a[..8]]);
    assert!(out.starts_with("selected"));
    assert_eq!(list_json(tmp.path())["selected"], a.as_str());

    let out = run_ok(tmp.path(), &["select", &a]);
    assert!(out.starts_with("deselected"));
    assert!(list_json(tmp.path()).get("selected").is_none());
}

#[test]
fn test_move_selected_item() {
    let tmp = init_workspace();
    let a = push(tmp.path(), "a");
    push(tmp.path(), "b");
    push(tmp.path(), "c");
    run_ok(tmp.path(), &["select", &a]);

    run_ok(tmp.path(), &["up"]);
    assert_eq!(titles(tmp.path()), vec!["c", "a", "b"]);
    run_ok(tmp.path(), &["up"]);
    assert_eq!(titles(tmp.path()), vec!["a", "c", "b"]);
    assert_eq!(run_ok(tmp.path(), &["up"]), "already at the top\n");

    run_ok(tmp.path(), &["down", &a]);
    assert_eq!(titles(tmp.path()), vec!["c", "a", "b"]);
}

#[test]
fn test_move_without_selection_fails() {
    let tmp = init_workspace();
    push(tmp.path(), "a");
    let err = run_err(tmp.path(), &["up"]);
    assert!(err.contains("no item selected"));
}

#[test]
fn test_delete_clears_selection() {
    let tmp = init_workspace();
    let a = push(tmp.path(), "a");
    let b = push(tmp.path(), "b");
    run_ok(tmp.path(), &["select", &b]);

    let out = run_ok(tmp.path(), &["delete", &a]);
    assert!(out.starts_with("deleted"));
    assert_eq!(titles(tmp.path()), vec!["b"]);
    assert!(list_json(tmp.path()).get("selected").is_none());
}

#[test]
fn test_unknown_id_is_an_error() {
    let tmp = init_workspace();
    push(tmp.path(), "a");
    let err = run_err(tmp.path(), &["delete", "zzzz"]);
    assert!(err.contains("item not found: zzzz"));
}

// ---------------------------------------------------------------------------
// edit / show
// ---------------------------------------------------------------------------

#[test]
fn test_edit_and_show() {
    let tmp = init_workspace();
    let id = push(tmp.path(), "draft");
    run_ok(
        tmp.path(),
        &["edit", &id, "--title", "final", "-d", "notes", "-l", "docs.rs"],
    );

    let show: Value = serde_json::from_str(&run_ok(tmp.path(), &["show", &id, "--json"])).unwrap();
    assert_eq!(show["title"], "final");
    assert_eq!(show["description"], "notes");
    assert_eq!(show["links"], serde_json::json!(["docs.rs"]));
    assert_eq!(show["position"], 1);

    run_ok(tmp.path(), &["edit", &id, "--rm-link", "docs.rs"]);
    let text = run_ok(tmp.path(), &["show", &id]);
    assert!(text.contains("title:     final\n"));
    assert!(!text.contains("links:"));
}

#[test]
fn test_edit_without_changes_fails() {
    let tmp = init_workspace();
    let id = push(tmp.path(), "a");
    let err = run_err(tmp.path(), &["edit", &id]);
    assert!(err.contains("nothing to edit"));
}

// ---------------------------------------------------------------------------
// settings
// ---------------------------------------------------------------------------

#[test]
fn test_settings_show_and_update() {
    let tmp = init_workspace();
    assert_eq!(
        run_ok(tmp.path(), &["settings"]),
        "max items: 5\nmax time:  24h\n"
    );

    let out = run_ok(tmp.path(), &["settings", "--max-hours", "2", "--json"]);
    let json: Value = serde_json::from_str(&out).unwrap();
    assert_eq!(json["max_items"], 5);
    assert_eq!(json["max_time_ms"], 2 * 60 * 60 * 1000);

    let raw = fs::read_to_string(tmp.path().join(".tstack/todo-stack-settings.json")).unwrap();
    let stored: Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(stored["maxItems"], 5);
    assert_eq!(stored["maxTimeInStack"], 7_200_000);
}

#[test]
fn test_settings_lowering_does_not_evict() {
    let tmp = init_workspace();
    for t in ["a", "b", "c"] {
        push(tmp.path(), t);
    }
    let out = run_ok(tmp.path(), &["settings", "--max-items", "1"]);
    assert!(out.contains("evicted on the next push"));
    assert_eq!(titles(tmp.path()).len(), 3);

    push(tmp.path(), "d");
    assert_eq!(titles(tmp.path()), vec!["d"]);
}

#[test]
fn test_settings_out_of_range() {
    let tmp = init_workspace();
    run_err(tmp.path(), &["settings", "--max-items", "11"]);
    run_err(tmp.path(), &["settings", "--max-hours", "0"]);
    assert!(!tmp.path().join(".tstack/todo-stack-settings.json").exists());
}

// ---------------------------------------------------------------------------
// expiry
// ---------------------------------------------------------------------------

const STALE_AND_FRESH: &str = r#"[
  {"id":"00000000-0000-4000-8000-000000000001","title":"stale","description":"","links":[],"createdAt":1000,"selected":false},
  {"id":"00000000-0000-4000-8000-000000000002","title":"fresh","description":"","links":[],"createdAt":32503680000000,"selected":false}
]"#;

#[test]
fn test_sweep_removes_expired() {
    let tmp = init_workspace();
    write_stack_record(tmp.path(), STALE_AND_FRESH);
    assert_eq!(
        run_ok(tmp.path(), &["sweep"]),
        "removed 1 expired item\n"
    );
    assert_eq!(titles(tmp.path()), vec!["fresh"]);
    assert_eq!(run_ok(tmp.path(), &["sweep"]), "removed 0 expired items\n");
}

#[test]
fn test_sweep_json() {
    let tmp = init_workspace();
    write_stack_record(tmp.path(), STALE_AND_FRESH);
    let out: Value = serde_json::from_str(&run_ok(tmp.path(), &["sweep", "--json"])).unwrap();
    assert_eq!(
        out["removed"],
        serde_json::json!(["00000000-0000-4000-8000-000000000001"])
    );
}

#[test]
fn test_any_command_sweeps_on_open() {
    let tmp = init_workspace();
    write_stack_record(tmp.path(), STALE_AND_FRESH);
    run_ok(tmp.path(), &["list"]);
    let raw = fs::read_to_string(tmp.path().join(".tstack/todo-stack.json")).unwrap();
    assert!(!raw.contains("stale"));
}

#[test]
fn test_watch_runs_for_given_ticks() {
    let tmp = init_workspace();
    push(tmp.path(), "watched");
    let out = run_ok(tmp.path(), &["watch", "--interval", "1", "--ticks", "1"]);
    assert!(out.contains("watched"));
    assert!(out.contains("1 / 5 items"));
}

// ---------------------------------------------------------------------------
// recovery
// ---------------------------------------------------------------------------

#[test]
fn test_recovery_log_empty() {
    let tmp = init_workspace();
    assert_eq!(
        run_ok(tmp.path(), &["recovery"]),
        "recovery log is empty\n"
    );
}

#[test]
fn test_unreadable_record_goes_to_recovery_log() {
    let tmp = init_workspace();
    write_stack_record(tmp.path(), "{ not json");

    let (stdout, stderr, success) = run(tmp.path(), &["list"]);
    assert!(success);
    assert_eq!(stdout, "stack is empty\n0 / 5 items\n");
    assert!(stderr.contains("unreadable record"));

    let log = run_ok(tmp.path(), &["recovery"]);
    assert!(log.contains("Key: todo-stack"));
    assert!(log.contains("{ not json"));
}
