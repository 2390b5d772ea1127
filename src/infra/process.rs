//! Process execution
//!
//! Build steps shell out through the [`CommandRunner`] trait so the step
//! executor can be driven by a recording stub in tests. The production
//! implementation wraps `std::process::Command` with captured output.

use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use crate::error::StepError;

/// A single process invocation: argv, working directory, extra environment,
/// and optional bytes piped to stdin.
#[derive(Debug, Clone)]
pub struct CommandRequest {
    /// Program followed by its arguments
    pub argv: Vec<String>,
    /// Working directory for the process
    pub cwd: PathBuf,
    /// Variables added on top of the inherited environment
    pub env: HashMap<String, String>,
    /// Bytes written to the child's stdin, if any
    pub stdin: Option<Vec<u8>>,
}

/// Captured output of a finished process
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Exit code (`-1` when the process was killed by a signal)
    pub code: i32,
    /// Captured stdout
    pub stdout: String,
    /// Captured stderr
    pub stderr: String,
}

impl CommandOutput {
    /// Whether the process exited with code zero
    pub fn success(&self) -> bool {
        self.code == 0
    }

    /// Last `lines` lines of stderr, for error messages
    pub fn stderr_tail(&self, lines: usize) -> String {
        tail_lines(&self.stderr, lines)
    }
}

/// Last `count` lines of `text`, joined back with newlines
pub fn tail_lines(text: &str, count: usize) -> String {
    let all: Vec<&str> = text.lines().collect();
    let start = all.len().saturating_sub(count);
    all[start..].join("\n")
}

/// Seam for running build-step processes
pub trait CommandRunner: Send + Sync {
    /// Run the request to completion, capturing stdout and stderr.
    ///
    /// A non-zero exit is NOT an error at this level; callers inspect
    /// [`CommandOutput::success`] and decide how to report it.
    fn run(&self, request: &CommandRequest) -> Result<CommandOutput, StepError>;

    /// Locate a tool on `PATH`. Stubs override this so tests do not depend
    /// on the host toolchain.
    fn locate(&self, program: &str) -> Option<PathBuf> {
        which::which(program).ok()
    }
}

/// Production runner backed by `std::process::Command`
#[derive(Debug, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, request: &CommandRequest) -> Result<CommandOutput, StepError> {
        let (program, args) =
            request
                .argv
                .split_first()
                .ok_or_else(|| StepError::CommandSpawn {
                    program: String::new(),
                    error: "empty command line".to_string(),
                })?;

        let mut command = Command::new(program);
        command
            .args(args)
            .current_dir(&request.cwd)
            .envs(&request.env)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        if request.stdin.is_some() {
            command.stdin(Stdio::piped());
        } else {
            command.stdin(Stdio::null());
        }

        let mut child = command.spawn().map_err(|e| StepError::CommandSpawn {
            program: program.clone(),
            error: e.to_string(),
        })?;

        if let Some(bytes) = &request.stdin {
            if let Some(mut stdin) = child.stdin.take() {
                stdin
                    .write_all(bytes)
                    .map_err(|e| StepError::CommandSpawn {
                        program: program.clone(),
                        error: format!("failed to write stdin: {e}"),
                    })?;
            }
        }

        let output = child
            .wait_with_output()
            .map_err(|e| StepError::CommandSpawn {
                program: program.clone(),
                error: e.to_string(),
            })?;

        Ok(CommandOutput {
            code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    // ============================================
    // Unit Tests - Output shaping
    // ============================================

    #[test]
    fn test_tail_lines_short_text() {
        assert_eq!(tail_lines("one\ntwo", 10), "one\ntwo");
    }

    #[test]
    fn test_tail_lines_truncates() {
        let text = "1\n2\n3\n4\n5";
        assert_eq!(tail_lines(text, 2), "4\n5");
    }

    #[test]
    fn test_tail_lines_empty() {
        assert_eq!(tail_lines("", 5), "");
    }

    #[test]
    fn test_stderr_tail() {
        let output = CommandOutput {
            code: 1,
            stdout: String::new(),
            stderr: "a\nb\nc".to_string(),
        };
        assert_eq!(output.stderr_tail(2), "b\nc");
        assert!(!output.success());
    }

    // ============================================
    // Unit Tests - SystemRunner
    // ============================================

    #[cfg(unix)]
    #[test]
    fn test_system_runner_captures_output() {
        let temp = TempDir::new().unwrap();
        let runner = SystemRunner;

        let request = CommandRequest {
            argv: vec!["sh".to_string(), "-c".to_string(), "echo out; echo err >&2".to_string()],
            cwd: temp.path().to_path_buf(),
            env: HashMap::new(),
            stdin: None,
        };

        let output = runner.run(&request).unwrap();
        assert!(output.success());
        assert_eq!(output.stdout.trim(), "out");
        assert_eq!(output.stderr.trim(), "err");
    }

    #[cfg(unix)]
    #[test]
    fn test_system_runner_nonzero_exit_is_captured_not_raised() {
        let temp = TempDir::new().unwrap();
        let runner = SystemRunner;

        let request = CommandRequest {
            argv: vec!["sh".to_string(), "-c".to_string(), "exit 7".to_string()],
            cwd: temp.path().to_path_buf(),
            env: HashMap::new(),
            stdin: None,
        };

        let output = runner.run(&request).unwrap();
        assert_eq!(output.code, 7);
        assert!(!output.success());
    }

    #[cfg(unix)]
    #[test]
    fn test_system_runner_passes_env_and_cwd() {
        let temp = TempDir::new().unwrap();
        let runner = SystemRunner;

        let mut env = HashMap::new();
        env.insert("FORGE_PROBE".to_string(), "42".to_string());

        let request = CommandRequest {
            argv: vec!["sh".to_string(), "-c".to_string(), "echo $FORGE_PROBE; pwd".to_string()],
            cwd: temp.path().to_path_buf(),
            env,
            stdin: None,
        };

        let output = runner.run(&request).unwrap();
        assert!(output.stdout.contains("42"));
        let cwd = temp.path().canonicalize().unwrap();
        assert!(output.stdout.contains(&cwd.display().to_string()));
    }

    #[cfg(unix)]
    #[test]
    fn test_system_runner_pipes_stdin() {
        let temp = TempDir::new().unwrap();
        let runner = SystemRunner;

        let request = CommandRequest {
            argv: vec!["cat".to_string()],
            cwd: temp.path().to_path_buf(),
            env: HashMap::new(),
            stdin: Some(b"piped content".to_vec()),
        };

        let output = runner.run(&request).unwrap();
        assert!(output.success());
        assert_eq!(output.stdout, "piped content");
    }

    #[test]
    fn test_system_runner_unknown_program_is_spawn_error() {
        let temp = TempDir::new().unwrap();
        let runner = SystemRunner;

        let request = CommandRequest {
            argv: vec!["omniforge-no-such-program-xyz".to_string()],
            cwd: temp.path().to_path_buf(),
            env: HashMap::new(),
            stdin: None,
        };

        let result = runner.run(&request);
        assert!(matches!(result, Err(StepError::CommandSpawn { .. })));
    }

    #[test]
    fn test_system_runner_empty_argv() {
        let runner = SystemRunner;
        let request = CommandRequest {
            argv: vec![],
            cwd: PathBuf::from("."),
            env: HashMap::new(),
            stdin: None,
        };

        let result = runner.run(&request);
        assert!(matches!(result, Err(StepError::CommandSpawn { .. })));
    }

    #[test]
    fn test_locate_finds_common_tool() {
        let runner = SystemRunner;
        // `sh` exists on any Unix CI machine; skip the assertion elsewhere
        #[cfg(unix)]
        assert!(runner.locate("sh").is_some());
        assert!(runner.locate("omniforge-no-such-program-xyz").is_none());
    }
}
