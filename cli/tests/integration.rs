//! Integration tests for repopack


use harness::{TestProject, exit_code, run_repopack};
use std::fs;

fn sample_project() -> TestProject {
    let project = TestProject::new();
    project.add_file("README.md", "# Sample\n");
    project.add_file("src/main.rs", "fn main() {}\n");
    project.add_file("src/util/mod.rs", "pub fn util() {}\n");
    project.add_bytes("logo.png", b"\x89PNG\r\n\x1a\n\0\0");
    project.add_file("node_modules/pkg/index.js", "module.exports = {};");
    project
}

fn stats_json(stderr: &str) -> serde_json::Value {
    let line = stderr
        .lines()
        .find(|l| l.trim_start().starts_with('{'))
        .unwrap_or_else(|| panic!("no JSON stats in stderr: {}", stderr));
    serde_json::from_str(line).expect("stats should be valid JSON")
}

#[test]
fn test_pack_emits_document_on_stdout() {
    let project = sample_project();
    let (stdout, stderr, success) =
        run_repopack(project.path(), &["pack", "--stats-format", "json"]);
    assert!(success, "pack should succeed: {}", stderr);
    assert!(stdout.starts_with("<repository_context>\n<file_tree>\n"));
    assert!(stdout.contains("<file path=\"src/main.rs\">"));
    assert!(stdout.contains("<file path=\"src/util/mod.rs\">"));
    assert!(!stdout.contains("logo.png"), "images are ignored by default");
    assert!(!stdout.contains("node_modules"));
    assert!(stdout.trim_end().ends_with("</repository_context>"));

    let stats = stats_json(&stderr);
    assert_eq!(stats["fileCount"], 3);
    assert_eq!(stats["ignoredCount"], 2);
    assert_eq!(stats["budget"], "comfortable");
    assert_eq!(stats["tokenizer"], "chars");
}

#[test]
fn test_gitignore_is_respected_and_can_be_disabled() {
    let project = sample_project();
    project.add_file(".gitignore", "# local\nsecrets/\n");
    project.add_file("secrets/key.txt", "hunter2");

    let (stdout, _stderr, success) = run_repopack(project.path(), &["pack", "-q"]);
    assert!(success);
    assert!(!stdout.contains("secrets/key.txt"));

    let (stdout, _stderr, success) =
        run_repopack(project.path(), &["pack", "-q", "--no-gitignore"]);
    assert!(success);
    assert!(stdout.contains("<file path=\"secrets/key.txt\">"));
}

#[test]
fn test_user_patterns_and_negation() {
    let project = sample_project();
    let (stdout, _stderr, success) = run_repopack(
        project.path(),
        &["pack", "-q", "--ignore", "src,!main.rs"],
    );
    assert!(success);
    assert!(stdout.contains("<file path=\"src/main.rs\">"));
    assert!(!stdout.contains("src/util/mod.rs"));
}

#[test]
fn test_prompt_and_tree_options() {
    let project = sample_project();
    let (stdout, _stderr, success) = run_repopack(
        project.path(),
        &["pack", "-q", "--prompt", "Review carefully.", "--no-tree"],
    );
    assert!(success);
    assert!(stdout.starts_with("Review carefully.\n\n<repository_context>\n<file path="));
    assert!(!stdout.contains("<file_tree>"));

    let (stdout, _stderr, success) =
        run_repopack(project.path(), &["pack", "-q", "--prompt-id", "audit"]);
    assert!(success);
    assert!(!stdout.starts_with("<repository_context>"));
}

#[test]
fn test_tree_command_orders() {
    let project = sample_project();
    let (stdout, _stderr, success) = run_repopack(project.path(), &["tree"]);
    assert!(success);
    assert_eq!(
        stdout,
        "├── README.md\n└── src\n    ├── main.rs\n    └── util\n        └── mod.rs\n"
    );

    let (stdout, _stderr, success) = run_repopack(project.path(), &["tree", "--folders-first"]);
    assert!(success);
    assert_eq!(
        stdout,
        "├── src\n│   ├── util\n│   │   └── mod.rs\n│   └── main.rs\n└── README.md\n"
    );
}

#[test]
fn test_output_file_round_trips_through_unpack() {
    let project = sample_project();
    project.add_file("src/cdata.rs", "const END: &str = \"]]>\";\n");
    let (_stdout, stderr, success) =
        run_repopack(project.path(), &["pack", "-o", "out/context.xml", "-q"]);
    assert!(success, "pack -o should succeed: {}", stderr);
    assert!(project.path().join("out/context.xml").exists());

    let (stdout, _stderr, success) =
        run_repopack(project.path(), &["unpack", "out/context.xml", "-f", "json"]);
    assert!(success);
    let summary: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    let paths: Vec<&str> = summary["files"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["path"].as_str().unwrap())
        .collect();
    assert_eq!(paths, ["README.md", "src/cdata.rs", "src/main.rs", "src/util/mod.rs"]);
    assert_eq!(summary["hasTree"], true);

    let (_stdout, _stderr, success) = run_repopack(
        project.path(),
        &["unpack", "out/context.xml", "--extract", "restored", "-q"],
    );
    assert!(success);
    let restored = fs::read_to_string(project.path().join("restored/src/cdata.rs")).unwrap();
    assert_eq!(restored, "const END: &str = \"]]>\";\n");
}

#[test]
fn test_check_reports_deciding_rule() {
    let project = sample_project();
    let (stdout, _stderr, success) = run_repopack(
        project.path(),
        &["check", "assets/logo.png", "src/main.rs", "-f", "json"],
    );
    assert!(success);
    let verdicts: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(verdicts[0]["ignored"], true);
    assert_eq!(verdicts[0]["rule"], "*.png");
    assert_eq!(verdicts[0]["origin"], "builtin");
    assert_eq!(verdicts[0]["condition"], "extension");
    assert_eq!(verdicts[1]["ignored"], false);
    assert!(verdicts[1].get("rule").is_none());
}

#[test]
fn test_config_file_is_applied() {
    let project = sample_project();
    project.add_file(
        ".repopack.toml",
        "[filters]\nignore = [\"*.md\"]\n\n[output]\ninclude_file_tree = false\nprompt = \"From config.\"\n",
    );
    let (stdout, stderr, success) = run_repopack(project.path(), &["pack", "-q"]);
    assert!(success, "{}", stderr);
    assert!(stdout.starts_with("From config.\n\n<repository_context>\n<file path="));
    assert!(!stdout.contains("README.md"));

    let (stdout, _stderr, success) = run_repopack(project.path(), &["pack", "-q", "--no-config"]);
    assert!(success);
    assert!(stdout.contains("README.md"));
}

#[test]
fn test_show_lists_presets_and_prompts() {
    let project = TestProject::new();
    let (stdout, _stderr, success) = run_repopack(project.path(), &["show", "-f", "json", "presets"]);
    assert!(success);
    let presets: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    let names: Vec<&str> = presets
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, ["default", "docs-only", "code-only", "tests-only"]);

    let (stdout, _stderr, success) = run_repopack(project.path(), &["show", "prompt", "readme"]);
    assert!(success);
    assert!(!stdout.trim().is_empty());
}

#[test]
fn test_config_command_prints_loadable_defaults() {
    let project = TestProject::new();
    let (stdout, _stderr, success) = run_repopack(project.path(), &["config"]);
    assert!(success);
    assert!(stdout.contains("[filters]"));
    assert!(stdout.contains("[remote]"));
    let parsed: toml::Value = toml::from_str(&stdout).unwrap();
    assert_eq!(parsed["output"]["include_file_tree"].as_bool(), Some(true));
}

#[test]
fn test_errors_map_to_exit_codes() {
    let project = sample_project();
    assert_eq!(exit_code(project.path(), &["pack", "not-a-dir-or-repo"]), Some(3));
    assert_eq!(exit_code(project.path(), &["pack", "--preset", "everything"]), Some(5));
    project.add_file("broken.xml", "no document here");
    assert_eq!(exit_code(project.path(), &["unpack", "broken.xml"]), Some(7));
}
