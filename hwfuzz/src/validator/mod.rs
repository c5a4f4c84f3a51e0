//! Trace validation against per-component reference models.
//!
//! - `mailbox` - scratchpad snapshots and inbox multisets
//! - `queue` - FIFO per queue index
//! - `memory` - delegated to an external consistency checker
//!
//! Validation reports the first violation found. Malformed trace lines are
//! not violations; they surface as [`HarnessError::Protocol`].

pub mod mailbox;
pub mod memory;
pub mod queue;

use std::fmt;

use serde::Serialize;

use crate::error::{HarnessError, HarnessResult};
use crate::producer::TraceArtifact;
use crate::trace::{parse_mailbox, parse_queue};
use crate::workload::WorkloadModel;

pub use memory::{ConsistencyChecker, ProcessChecker, WEAK_MEMORY_ORDER};
pub use queue::QueueCheck;

/// Evidence of an invariant violation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    /// 1-based trace line, when the oracle can attribute one.
    pub line: Option<usize>,
    pub reason: String,
}

impl Violation {
    pub fn at(line: usize, reason: impl Into<String>) -> Self {
        Self {
            line: Some(line),
            reason: reason.into(),
        }
    }

    pub fn unattributed(reason: impl Into<String>) -> Self {
        Self {
            line: None,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "{} on line {}", self.reason, line),
            None => f.write_str(&self.reason),
        }
    }
}

/// Outcome of validating one trace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Pass,
    Fail(Violation),
}

impl Verdict {
    pub fn is_fail(&self) -> bool {
        matches!(self, Verdict::Fail(_))
    }

    pub fn violation(&self) -> Option<&Violation> {
        match self {
            Verdict::Pass => None,
            Verdict::Fail(violation) => Some(violation),
        }
    }
}

/// Checks captured traces for one workload model.
pub struct TraceValidator {
    model: WorkloadModel,
    queue_check: QueueCheck,
    consistency_model: String,
    checker: Option<Box<dyn ConsistencyChecker>>,
}

impl TraceValidator {
    pub fn new(model: WorkloadModel) -> Self {
        Self {
            model,
            queue_check: QueueCheck::default(),
            consistency_model: WEAK_MEMORY_ORDER.to_string(),
            checker: None,
        }
    }

    /// Replay strategy for array-of-queue traces.
    pub fn queue_check(mut self, strategy: QueueCheck) -> Self {
        self.queue_check = strategy;
        self
    }

    /// Checker and memory model used for memory traces.
    pub fn checker(
        mut self,
        checker: impl ConsistencyChecker + 'static,
        model: impl Into<String>,
    ) -> Self {
        self.checker = Some(Box::new(checker));
        self.consistency_model = model.into();
        self
    }

    pub fn has_checker(&self) -> bool {
        self.checker.is_some()
    }

    /// Validate one captured trace.
    pub async fn validate(&self, artifact: &TraceArtifact) -> HarnessResult<Verdict> {
        match &self.model {
            WorkloadModel::Mailbox(workload) => {
                let events = parse_mailbox(&artifact.read()?, workload.num_threads)?;
                Ok(mailbox::check(&events, workload.num_threads))
            }
            WorkloadModel::ArrayOfQueue(workload) => {
                let events = parse_queue(&artifact.read()?, workload.num_queues)?;
                Ok(queue::check(&events, self.queue_check))
            }
            WorkloadModel::Memory(_) => {
                let checker = self.checker.as_ref().ok_or_else(|| {
                    HarnessError::Config("memory validation needs a consistency checker".into())
                })?;
                let output = checker
                    .check(&artifact.path, &self.consistency_model)
                    .await?;
                tracing::debug!(
                    checker = checker.name(),
                    model = %self.consistency_model,
                    output = output.trim(),
                    "checker verdict"
                );
                Ok(memory::verdict_from_output(&output))
            }
        }
    }
}
