//! Trace production: run a request script through the device under test.
//!
//! Each trial writes its script to `reqs.txt` in the artifact directory,
//! feeds that file to the device on standard input and stores the device's
//! standard output, minus warning lines, as the trace. Files are
//! overwritten in place, so the artifact directory always holds the most
//! recent trial.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use crate::error::{HarnessError, HarnessResult};
use crate::process::{run_with_timeout, RunOutput};
use crate::script::RequestScript;
use crate::workload::Component;

/// Output lines containing this marker are simulator noise, not events.
pub const WARNING_MARKER: &str = "Warn";

/// Something that executes a request file and reports what happened.
///
/// [`ProcessDevice`] runs an external executable; tests substitute
/// in-process models.
#[async_trait(?Send)]
pub trait Device {
    /// Name of this device for logs.
    fn name(&self) -> &str;

    /// Execute the requests stored at `requests`.
    async fn execute(&self, requests: &Path) -> HarnessResult<RunOutput>;
}

/// A DUT executable fed through standard input.
#[derive(Debug, Clone)]
pub struct ProcessDevice {
    program: PathBuf,
    args: Vec<String>,
    timeout: Duration,
}

impl ProcessDevice {
    pub fn new(program: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            timeout,
        }
    }

    /// Extra command-line arguments passed to the executable.
    pub fn with_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }
}

#[async_trait(?Send)]
impl Device for ProcessDevice {
    fn name(&self) -> &str {
        self.program.to_str().unwrap_or("dut")
    }

    async fn execute(&self, requests: &Path) -> HarnessResult<RunOutput> {
        let input = fs::File::open(requests)?;
        let mut command = Command::new(&self.program);
        command.args(&self.args).stdin(Stdio::from(input));
        run_with_timeout(command, &self.program.display().to_string(), self.timeout).await
    }
}

/// File locations inside a campaign's artifact directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub dir: PathBuf,
    pub requests: PathBuf,
    pub trace: PathBuf,
    pub stderr: PathBuf,
    pub failure: PathBuf,
}

impl ArtifactPaths {
    pub fn new(dir: impl Into<PathBuf>, component: Component) -> Self {
        let dir = dir.into();
        Self {
            requests: dir.join("reqs.txt"),
            trace: dir.join(component.trace_file_name()),
            stderr: dir.join("dut.stderr"),
            failure: dir.join("failure.json"),
            dir,
        }
    }
}

/// The captured trace of one trial.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceArtifact {
    pub path: PathBuf,
    pub requests: PathBuf,
    /// Non-blank lines kept after warning filtering.
    pub event_lines: usize,
    pub exit_code: Option<i32>,
    pub timed_out: bool,
}

impl TraceArtifact {
    /// Read the trace back from disk.
    pub fn read(&self) -> HarnessResult<String> {
        fs::read_to_string(&self.path).map_err(|err| {
            HarnessError::Io(format!("failed reading {}: {err}", self.path.display()))
        })
    }
}

/// Writes request scripts, runs the device and captures traces.
pub struct TraceProducer {
    device: Box<dyn Device>,
    paths: ArtifactPaths,
}

impl TraceProducer {
    pub fn new(device: impl Device + 'static, paths: ArtifactPaths) -> Self {
        Self {
            device: Box::new(device),
            paths,
        }
    }

    pub fn paths(&self) -> &ArtifactPaths {
        &self.paths
    }

    /// Run one script and capture its trace.
    pub async fn produce(&self, script: &RequestScript) -> HarnessResult<TraceArtifact> {
        fs::create_dir_all(&self.paths.dir).map_err(|err| {
            HarnessError::Io(format!("failed creating {}: {err}", self.paths.dir.display()))
        })?;
        fs::write(&self.paths.requests, script.encode())?;

        let run = self.device.execute(&self.paths.requests).await?;
        tracing::debug!(
            device = self.device.name(),
            exit_code = ?run.exit_code,
            stdout_bytes = run.stdout.len(),
            "device finished"
        );
        if !run.timed_out && !run.success() {
            tracing::warn!(
                device = self.device.name(),
                exit_code = ?run.exit_code,
                "device exited unsuccessfully"
            );
        }

        let trace = filter_warnings(&run.stdout);
        let event_lines = trace.lines().filter(|line| !line.trim().is_empty()).count();
        fs::write(&self.paths.trace, trace)?;
        fs::write(&self.paths.stderr, &run.stderr)?;

        Ok(TraceArtifact {
            path: self.paths.trace.clone(),
            requests: self.paths.requests.clone(),
            event_lines,
            exit_code: run.exit_code,
            timed_out: run.timed_out,
        })
    }
}

/// Drop every line containing [`WARNING_MARKER`].
pub fn filter_warnings(stdout: &str) -> String {
    let mut trace = String::with_capacity(stdout.len());
    for line in stdout.lines().filter(|line| !line.contains(WARNING_MARKER)) {
        trace.push_str(line);
        trace.push('\n');
    }
    trace
}
