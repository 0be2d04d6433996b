#![allow(missing_docs)]

use std::fs;
use std::path::PathBuf;

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use serde_json::Value;
use tempfile::TempDir;

const GRAPH: &str = r#"{
    "nodes": [
        {"key": "ada", "labels": ["Person"], "payload": {"name": "Ada"}},
        {"key": "grace", "labels": ["Person"], "payload": {"name": "Grace"}},
        {"key": "london", "labels": ["City"]}
    ],
    "edges": [
        {"key": "lives-ada", "from": "ada", "to": "london", "labels": ["LIVES_IN"]},
        {"key": "lives-grace", "from": "grace", "to": "london", "labels": ["LIVES_IN"]},
        {"key": "knows", "from": "ada", "to": "grace", "labels": ["KNOWS"]}
    ]
}"#;

const ONE_HOP: &str = r#"{
    "paths": [{
        "parts": [
            {"kind": "node", "binder": "p", "labels": ["Person"]},
            {"kind": "edge", "labels": ["LIVES_IN"], "direction": "right"},
            {"kind": "node", "binder": "c", "labels": ["City"]}
        ]
    }]
}"#;

const TWO_HOP: &str = r#"{
    "paths": [{
        "parts": [
            {"kind": "node", "binder": "p", "labels": ["Person"]},
            {"kind": "edge", "labels": ["KNOWS"], "direction": "right"},
            {"kind": "node", "binder": "q", "labels": ["Person"]},
            {"kind": "edge", "labels": ["LIVES_IN"], "direction": "right"},
            {"kind": "node", "binder": "c", "labels": ["City"]}
        ]
    }]
}"#;

const TWO_PATHS: &str = r#"{
    "paths": [
        {"parts": [{"kind": "node", "binder": "p", "labels": ["Person"]}]},
        {"parts": [{"kind": "node", "binder": "c", "labels": ["City"]}]}
    ]
}"#;

struct Fixture {
    dir: TempDir,
    graph: PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let dir = TempDir::new().expect("tempdir");
        let graph = dir.path().join("graph.json");
        fs::write(&graph, GRAPH).expect("write graph");
        Self { dir, graph }
    }

    fn pattern(&self, name: &str, body: &str) -> PathBuf {
        let path = self.dir.path().join(format!("{name}.json"));
        fs::write(&path, body).expect("write pattern");
        path
    }

    fn config(&self, body: &str) -> PathBuf {
        let path = self.dir.path().join("cli.toml");
        fs::write(&path, body).expect("write config");
        path
    }

    /// Command isolated from the user's config directory and profiling env.
    fn cmd(&self) -> Command {
        let mut cmd = cargo_bin_cmd!("stride");
        cmd.env("XDG_CONFIG_HOME", self.dir.path().join("xdg"))
            .env_remove("STRIDE_CONFIG")
            .env_remove("STRIDE_PROFILE")
            .env_remove("RUST_LOG")
            .args(["--theme", "plain"]);
        cmd
    }
}

fn stdout_of(cmd: &mut Command) -> String {
    let output = cmd.assert().success().get_output().stdout.clone();
    String::from_utf8_lossy(&output).into_owned()
}

fn stderr_of_failure(cmd: &mut Command) -> String {
    let output = cmd.assert().failure().code(1).get_output().stderr.clone();
    String::from_utf8_lossy(&output).into_owned()
}

#[test]
fn explain_text_shows_strides_and_join_tree() {
    let fixture = Fixture::new();
    let pattern = fixture.pattern("two-hop", TWO_HOP);
    let stdout = stdout_of(fixture.cmd().arg("explain").arg("--pattern").arg(&pattern));
    assert!(stdout.contains("Strides"), "missing strides section: {stdout}");
    assert!(stdout.contains("(p:Person)-[:KNOWS]->(q:Person)-[:LIVES_IN]->(c:City)"));
    assert!(stdout.contains("HashJoin [on=2=0]"), "unexpected plan: {stdout}");
    assert!(stdout.contains("plan_hash"));
}

#[test]
fn explain_json_reports_hash_and_strategy() {
    let fixture = Fixture::new();
    let pattern = fixture.pattern("two-hop", TWO_HOP);
    let hashed = stdout_of(
        fixture
            .cmd()
            .args(["--format", "json", "explain", "--pattern"])
            .arg(&pattern),
    );
    let nested = stdout_of(
        fixture
            .cmd()
            .args(["--format", "json", "explain", "--join", "nested-loop", "--pattern"])
            .arg(&pattern),
    );
    let hashed: Value = serde_json::from_str(&hashed).expect("json");
    let nested: Value = serde_json::from_str(&nested).expect("json");
    assert_eq!(hashed["patterns"].as_array().map(Vec::len), Some(1));
    assert_eq!(hashed["plan_hash"].as_str().map(str::len), Some(16));
    assert_ne!(hashed["plan_hash"], nested["plan_hash"]);
    assert!(nested.to_string().contains("NestedLoopJoin"));
}

#[test]
fn run_text_lists_matches_with_fixture_keys() {
    let fixture = Fixture::new();
    let pattern = fixture.pattern("one-hop", ONE_HOP);
    let stdout = stdout_of(
        fixture
            .cmd()
            .args(["run", "--graph"])
            .arg(&fixture.graph)
            .arg("--pattern")
            .arg(&pattern),
    );
    assert!(stdout.contains("1. c=london p=ada  [ada, lives-ada, london]"));
    assert!(stdout.contains("2. c=london p=grace  [grace, lives-grace, london]"));
    assert!(stdout.contains("rows: 2"), "missing summary: {stdout}");
    assert!(!stdout.contains("Profile"));
}

#[test]
fn run_json_joins_two_hops_with_either_strategy() {
    let fixture = Fixture::new();
    let pattern = fixture.pattern("two-hop", TWO_HOP);
    for join in ["hash", "nested-loop"] {
        let stdout = stdout_of(
            fixture
                .cmd()
                .args(["--format", "json", "run", "--join", join, "--graph"])
                .arg(&fixture.graph)
                .arg("--pattern")
                .arg(&pattern),
        );
        let report: Value = serde_json::from_str(&stdout).expect("json");
        assert_eq!(report["count"], 1);
        let row = &report["rows"][0];
        assert_eq!(row["bindings"]["p"], "ada");
        assert_eq!(row["bindings"]["q"], "grace");
        assert_eq!(row["bindings"]["c"], "london");
        assert_eq!(
            row["strides"][0],
            serde_json::json!(["ada", "knows", "grace", "lives-grace", "london"])
        );
    }
}

#[test]
fn row_limit_fails_with_invalid_argument() {
    let fixture = Fixture::new();
    let pattern = fixture.pattern("one-hop", ONE_HOP);
    let stderr = stderr_of_failure(
        fixture
            .cmd()
            .args(["run", "--max-rows", "1", "--graph"])
            .arg(&fixture.graph)
            .arg("--pattern")
            .arg(&pattern),
    );
    assert!(stderr.contains("[InvalidArgument]"), "stderr: {stderr}");
    assert!(stderr.contains("row limit exceeded"));
}

#[test]
fn multiple_paths_fail_as_unsupported() {
    let fixture = Fixture::new();
    let pattern = fixture.pattern("two-paths", TWO_PATHS);
    let stderr = stderr_of_failure(
        fixture
            .cmd()
            .args(["run", "--graph"])
            .arg(&fixture.graph)
            .arg("--pattern")
            .arg(&pattern),
    );
    assert!(stderr.contains("[UnsupportedFeature]"), "stderr: {stderr}");
}

#[test]
fn config_file_sets_format_and_join_strategy() {
    let fixture = Fixture::new();
    let pattern = fixture.pattern("two-hop", TWO_HOP);
    let config = fixture.config("join_strategy = \"nested-loop\"\nformat = \"json\"\n");
    let stdout = stdout_of(
        fixture
            .cmd()
            .arg("--config")
            .arg(&config)
            .args(["explain", "--pattern"])
            .arg(&pattern),
    );
    let report: Value = serde_json::from_str(&stdout).expect("config selects json");
    assert!(report.to_string().contains("NestedLoopJoin"));

    let stdout = stdout_of(
        fixture
            .cmd()
            .arg("--config")
            .arg(&config)
            .args(["--format", "text", "explain", "--join", "hash", "--pattern"])
            .arg(&pattern),
    );
    assert!(stdout.contains("HashJoin"), "flags override config: {stdout}");
}

#[test]
fn missing_explicit_config_is_an_error() {
    let fixture = Fixture::new();
    let pattern = fixture.pattern("one-hop", ONE_HOP);
    let stderr = stderr_of_failure(
        fixture
            .cmd()
            .arg("--config")
            .arg(fixture.dir.path().join("absent.toml"))
            .args(["explain", "--pattern"])
            .arg(&pattern),
    );
    assert!(stderr.contains("[Config]"), "stderr: {stderr}");
}
