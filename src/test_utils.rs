//! Test doubles shared across unit tests
//!
//! A recording command runner and a stub source fetcher so executor and
//! step tests run without touching the network or spawning processes.

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::core::context::VariableContext;
use crate::core::fetch::{FetchRequest, SourceFetcher};
use crate::error::{FetchError, StepError};
use crate::infra::filesystem;
use crate::infra::process::{CommandOutput, CommandRequest, CommandRunner};

/// Command runner that records every request instead of spawning anything
pub struct RecordingRunner {
    calls: Mutex<Vec<CommandRequest>>,
    failure: Option<Failure>,
    tools_available: bool,
}

struct Failure {
    /// Fail only the call with this index; `None` fails every call
    at: Option<usize>,
    code: i32,
    stderr: String,
}

impl RecordingRunner {
    /// Every command exits zero
    pub fn succeeding() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            failure: None,
            tools_available: true,
        }
    }

    /// Every command exits with `code` and the given stderr
    pub fn failing_with(code: i32, stderr: &str) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            failure: Some(Failure {
                at: None,
                code,
                stderr: stderr.to_string(),
            }),
            tools_available: true,
        }
    }

    /// The `index`-th command (zero-based) fails; others exit zero
    pub fn failing_at(index: usize, code: i32, stderr: &str) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            failure: Some(Failure {
                at: Some(index),
                code,
                stderr: stderr.to_string(),
            }),
            tools_available: true,
        }
    }

    /// `locate` finds nothing, as on a host without build tools
    pub fn without_tools() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            failure: None,
            tools_available: false,
        }
    }

    /// Snapshot of all recorded requests
    pub fn calls(&self) -> Vec<CommandRequest> {
        self.calls.lock().unwrap().clone()
    }
}

impl CommandRunner for RecordingRunner {
    fn run(&self, request: &CommandRequest) -> Result<CommandOutput, StepError> {
        let mut calls = self.calls.lock().unwrap();
        let index = calls.len();
        calls.push(request.clone());

        if let Some(failure) = &self.failure {
            if failure.at.map_or(true, |n| n == index) {
                return Ok(CommandOutput {
                    code: failure.code,
                    stdout: String::new(),
                    stderr: failure.stderr.clone(),
                });
            }
        }

        Ok(CommandOutput {
            code: 0,
            stdout: String::new(),
            stderr: String::new(),
        })
    }

    fn locate(&self, program: &str) -> Option<PathBuf> {
        self.tools_available.then(|| PathBuf::from(program))
    }
}

/// Source fetcher that stages a canned tree instead of hitting the network
pub struct StubFetcher {
    requests: Mutex<Vec<FetchRequest>>,
    fail_for: Option<String>,
}

impl StubFetcher {
    pub fn new() -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            fail_for: None,
        }
    }

    /// Fail the fetch of the named component; others stage normally
    pub fn failing_for(component: &str) -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            fail_for: Some(component.to_string()),
        }
    }

    /// Snapshot of all recorded fetch requests
    pub fn requests(&self) -> Vec<FetchRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Default for StubFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SourceFetcher for StubFetcher {
    async fn fetch(
        &self,
        request: &FetchRequest,
        _context: &VariableContext,
    ) -> Result<(), FetchError> {
        self.requests.lock().unwrap().push(request.clone());

        if self.fail_for.as_deref() == Some(request.component.as_str()) {
            return Err(FetchError::Download {
                url: "stub://failure".to_string(),
                error: "stub fetch failure".to_string(),
            });
        }

        std::fs::create_dir_all(&request.dest).unwrap();
        std::fs::write(
            request.dest.join("SOURCE"),
            format!("{} sources\n", request.component),
        )
        .unwrap();
        std::fs::write(
            request.dest.join("plugin.yaml"),
            format!("name: {}\n", request.component),
        )
        .unwrap();
        filesystem::reset_tree(&request.dest, &request.pristine).unwrap();

        Ok(())
    }
}
