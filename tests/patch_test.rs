//! Integration tests for the patch step
//!
//! These run the real `patch` tool through the compiled binary and
//! skip themselves when the tool is not installed:
//! - a patch applies against a freshly reset source tree
//! - rebuilding applies the same patch cleanly again
//! - a missing patch tool fails the component, not the whole process

mod common;

use common::TestProject;
use std::process::Command;

fn patch_tool_available() -> bool {
    Command::new("patch")
        .arg("--version")
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}

/// Helper to run omniforge build command
fn run_build(project: &TestProject) -> std::process::Output {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_omniforge"));
    cmd.current_dir(project.path());
    cmd.env_remove("OMNIFORGE_PROJECT_DIR");
    cmd.arg("build");
    cmd.output().expect("Failed to execute omniforge build")
}

const GREETING_PATCH: &str = "--- a/greeting.txt\n\
                              +++ b/greeting.txt\n\
                              @@ -1 +1 @@\n\
                              -hello world\n\
                              +hello omniforge\n";

fn patched_project() -> TestProject {
    let project = TestProject::new();
    project.write_manifest(&["app"], "");
    project.create_file("srcs/app/greeting.txt", "hello world\n");
    project.create_file("components/patches/greeting.patch", GREETING_PATCH);
    project.write_component(
        "app",
        r#"name = "app"
version = "1.0.0"

[source]
path = "srcs/app"

[[step]]
patch = "greeting.patch"

[[step]]
copy = { src = "greeting.txt", dst = "${install_root}/greeting.txt" }
"#,
    );
    project
}

// ============================================
// Patch Application
// ============================================

#[test]
fn test_patch_applies_to_a_fresh_source_tree() {
    if !patch_tool_available() {
        eprintln!("skipping: patch tool not installed");
        return;
    }
    let project = patched_project();

    let output = run_build(&project);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(output.status.success(), "stderr={stderr}");

    assert_eq!(project.read_file("install/greeting.txt"), "hello omniforge\n");
    // The working tree is patched; the pristine mirror never is
    assert_eq!(
        project.read_file("build/src/app/greeting.txt"),
        "hello omniforge\n"
    );
    assert_eq!(
        project.read_file("build/pristine/app/greeting.txt"),
        "hello world\n"
    );
}

#[test]
fn test_rebuild_applies_the_patch_cleanly_again() {
    if !patch_tool_available() {
        eprintln!("skipping: patch tool not installed");
        return;
    }
    let project = patched_project();

    let first = run_build(&project);
    assert!(first.status.success());

    // A second run resets the tree from the pristine mirror, so the
    // patch must not conflict with its own earlier application.
    let second = run_build(&project);
    let stderr = String::from_utf8_lossy(&second.stderr);
    assert!(second.status.success(), "stderr={stderr}");
    assert_eq!(project.read_file("install/greeting.txt"), "hello omniforge\n");
}

#[test]
fn test_missing_patch_tool_fails_the_component() {
    let project = patched_project();

    let mut cmd = Command::new(env!("CARGO_BIN_EXE_omniforge"));
    cmd.current_dir(project.path());
    cmd.env_remove("OMNIFORGE_PROJECT_DIR");
    cmd.env_remove("PATH");
    cmd.arg("build");
    let output = cmd.output().expect("Failed to execute omniforge build");
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert_eq!(output.status.code(), Some(1));
    assert!(stdout.contains("The 'patch' tool was not found on PATH"));
}
