//! Common test utilities and helpers
//!
//! This module provides shared setup for integration tests: a
//! temporary project directory plus builders for omniforge.toml and
//! component descriptors.

use std::path::PathBuf;
use tempfile::TempDir;

/// Test project context
///
/// Creates a temporary directory for test projects and provides
/// utilities for laying out manifests, components, and sources.
pub struct TestProject {
    /// Temporary directory for the test project
    pub dir: TempDir,
}

impl TestProject {
    /// Create a new test project in a temporary directory
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Get the path to the test project directory
    pub fn path(&self) -> PathBuf {
        self.dir.path().to_path_buf()
    }

    /// Absolute install root written by [`TestProject::write_manifest`]
    pub fn install_root(&self) -> PathBuf {
        self.dir.path().join("install")
    }

    /// Create a file in the test project
    pub fn create_file(&self, name: &str, content: &str) {
        let path = self.dir.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent directories");
        }
        std::fs::write(path, content).expect("Failed to write file");
    }

    /// Create a directory in the test project
    pub fn create_dir(&self, name: &str) {
        let path = self.dir.path().join(name);
        std::fs::create_dir_all(path).expect("Failed to create directory");
    }

    /// Check if a file exists in the test project
    pub fn file_exists(&self, name: &str) -> bool {
        self.dir.path().join(name).exists()
    }

    /// Read a file from the test project
    pub fn read_file(&self, name: &str) -> String {
        std::fs::read_to_string(self.dir.path().join(name)).expect("Failed to read file")
    }

    /// Write omniforge.toml listing `components`, with the install root
    /// pointed inside the temp directory. `extra` is appended verbatim
    /// for overrides, version settings, and the like.
    pub fn write_manifest(&self, components: &[&str], extra: &str) {
        let names: Vec<String> = components
            .iter()
            .map(|name| format!("\"{name}\""))
            .collect();
        let manifest = format!(
            "[project]\nname = \"demo\"\ninstall_root = \"{}\"\ncomponents = [{}]\n{extra}",
            self.install_root().display(),
            names.join(", ")
        );
        self.create_file("omniforge.toml", &manifest);
    }

    /// Write a component descriptor under components/
    pub fn write_component(&self, name: &str, body: &str) {
        self.create_file(&format!("components/{name}.toml"), body);
    }

    /// Write a component backed by a local source directory whose one
    /// step appends the component name to install_root/order.log
    pub fn write_ordered_component(&self, name: &str, dependencies: &[&str]) {
        let deps: Vec<String> = dependencies
            .iter()
            .map(|dep| format!("\"{dep}\""))
            .collect();
        self.create_file(&format!("srcs/{name}/SOURCE"), &format!("{name} sources\n"));
        self.write_component(
            name,
            &format!(
                r#"name = "{name}"
version = "1.0.0"
dependencies = [{deps}]

[source]
path = "srcs/{name}"

[[step]]
run = "sh"
args = ["-c", "echo {name} >> \"${{install_root}}/order.log\""]
"#,
                deps = deps.join(", ")
            ),
        );
    }

    /// Lines of install_root/order.log, in append order
    pub fn build_order(&self) -> Vec<String> {
        self.read_file("install/order.log")
            .lines()
            .map(str::to_string)
            .collect()
    }
}

impl Default for TestProject {
    fn default() -> Self {
        Self::new()
    }
}
