//! Integration tests for `omniforge check`
//!
//! Validates projects through the compiled binary:
//! - a valid project passes with a summary of what would build
//! - missing environment inputs are listed in one pass
//! - check never creates the build tree or the install root

mod common;

use common::TestProject;
use std::process::Command;

/// Helper to run omniforge check command
fn run_check(project: &TestProject, args: &[&str]) -> std::process::Output {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_omniforge"));
    cmd.current_dir(project.path());
    cmd.env_remove("OMNIFORGE_PROJECT_DIR");
    cmd.arg("check");
    for arg in args {
        cmd.arg(arg);
    }
    cmd.output().expect("Failed to execute omniforge check")
}

fn valid_project() -> TestProject {
    let project = TestProject::new();
    project.write_manifest(&["python", "pip"], "");
    project.write_ordered_component("python", &[]);
    project.write_ordered_component("pip", &["python"]);
    project
}

// ============================================
// Validation Outcomes
// ============================================

#[test]
fn test_check_passes_on_a_valid_project() {
    let project = valid_project();

    let output = run_check(&project, &[]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(output.status.success(), "stderr={stderr}");
    assert!(stdout.contains("✓ Configuration is valid"));
    assert!(stdout.contains("✓ Dependency graph resolves (2 components)"));
    assert!(stdout.contains("✓ Required environment inputs are present"));
    assert!(stdout.contains("Would build 2 of 2 components"));
    assert!(stdout.contains("python 1.0.0"));
}

#[test]
fn test_check_reports_missing_env_in_one_pass() {
    let project = TestProject::new();
    project.write_manifest(&["server"], "");
    project.create_file("srcs/server/SOURCE", "server sources\n");
    project.write_component(
        "server",
        r#"name = "server"
version = "1.0.0"
required_env = ["SERVER_MIRROR", "SERVER_KEY"]

[source]
path = "srcs/server"
"#,
    );

    let mut cmd = Command::new(env!("CARGO_BIN_EXE_omniforge"));
    cmd.current_dir(project.path());
    cmd.env_remove("OMNIFORGE_PROJECT_DIR");
    cmd.env_remove("SERVER_MIRROR");
    cmd.env_remove("SERVER_KEY");
    cmd.arg("check");
    let output = cmd.output().expect("Failed to execute omniforge check");
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert_eq!(output.status.code(), Some(2));
    assert!(stderr.contains("SERVER_KEY, SERVER_MIRROR"), "stderr={stderr}");
}

#[test]
fn test_check_cycle_exits_three() {
    let project = TestProject::new();
    project.write_manifest(&["a", "b"], "");
    project.write_ordered_component("a", &["b"]);
    project.write_ordered_component("b", &["a"]);

    let output = run_check(&project, &[]);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert_eq!(output.status.code(), Some(3));
    assert!(stderr.contains("Cyclic dependency detected"));
    assert!(!project.file_exists("build"));
    assert!(!project.file_exists("install"));
}

#[test]
fn test_check_exits_two_without_a_manifest() {
    let project = TestProject::new();

    let output = run_check(&project, &[]);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert_eq!(output.status.code(), Some(2));
    assert!(stderr.contains("omniforge.toml"));
}

// ============================================
// Check Never Mutates
// ============================================

#[test]
fn test_check_creates_no_build_or_install_tree() {
    let project = valid_project();

    let output = run_check(&project, &[]);
    assert!(output.status.success());

    assert!(!project.file_exists("build"));
    assert!(!project.file_exists("install"));
}

#[test]
fn test_check_json_emits_the_dry_run_report() {
    let project = valid_project();

    let output = run_check(&project, &["--json"]);
    assert!(output.status.success());

    let report: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("stdout should be the JSON report");
    assert_eq!(report["dry_run"], true);
    assert_eq!(report["results"].as_array().unwrap().len(), 2);
}
