//! Memory-subsystem validation through an external consistency checker.
//!
//! The harness keeps no oracle of its own for memory traces. The trace file
//! is handed unmodified to a checker together with the name of a memory
//! model; the checker answers `OK` or explains why the trace is not
//! admissible.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use crate::error::HarnessResult;
use crate::process::run_with_timeout;

use super::{Verdict, Violation};

/// Memory model name for weak memory ordering.
pub const WEAK_MEMORY_ORDER: &str = "wmo";

/// A tool that classifies a trace as admissible under a memory model.
#[async_trait(?Send)]
pub trait ConsistencyChecker {
    fn name(&self) -> &str;

    /// Check `trace` under `model`, returning the checker's verdict text.
    async fn check(&self, trace: &Path, model: &str) -> HarnessResult<String>;
}

/// A checker executable invoked as `<program> check <model> <trace>`.
#[derive(Debug, Clone)]
pub struct ProcessChecker {
    program: PathBuf,
    timeout: Duration,
}

impl ProcessChecker {
    pub fn new(program: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }
}

#[async_trait(?Send)]
impl ConsistencyChecker for ProcessChecker {
    fn name(&self) -> &str {
        self.program.to_str().unwrap_or("checker")
    }

    async fn check(&self, trace: &Path, model: &str) -> HarnessResult<String> {
        let mut command = Command::new(&self.program);
        command
            .arg("check")
            .arg(model)
            .arg(trace)
            .stdin(Stdio::null());
        let run = run_with_timeout(command, &self.program.display().to_string(), self.timeout)
            .await?;
        if run.timed_out {
            return Ok(format!("checker timed out after {:?}", self.timeout));
        }
        if !run.stderr.trim().is_empty() {
            tracing::debug!(checker = self.name(), stderr = run.stderr.trim(), "checker stderr");
        }
        Ok(run.stdout)
    }
}

/// Interpret checker output: exactly `OK` passes, anything else fails.
pub fn verdict_from_output(output: &str) -> Verdict {
    if output.trim_end_matches(['\r', '\n']) == "OK" {
        Verdict::Pass
    } else {
        let reason = match output.trim() {
            "" => "consistency checker produced no verdict".to_string(),
            text => format!("consistency checker rejected trace: {text}"),
        };
        Verdict::Fail(Violation::unattributed(reason))
    }
}
