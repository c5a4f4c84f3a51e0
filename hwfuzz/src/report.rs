//! Campaign outcome reporting.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use crate::error::HarnessResult;
use crate::workload::Component;

/// Process exit status of the campaign runner.
pub struct ExitStatus;

impl ExitStatus {
    /// The iteration cap was reached with every trial passing.
    pub const SUCCESS: u8 = 0;
    /// A trial violated an invariant.
    pub const VIOLATION: u8 = 1;
    /// Configuration, tool, protocol or I/O error.
    pub const ERROR: u8 = 2;
}

/// Exit status for a campaign that finished or was aborted.
pub fn exit_code(result: &HarnessResult<CampaignReport>) -> u8 {
    match result {
        Ok(report) => report.exit_code(),
        Err(_) => ExitStatus::ERROR,
    }
}

/// Everything needed to find and replay a failing trial.
///
/// Serialized to `failure.json` next to the trial's artifacts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureRecord {
    pub component: Component,
    pub campaign_seed: u64,
    pub trial_seed: u64,
    pub depth: u64,
    /// 1-based trial index within the depth.
    pub trial: u64,
    pub line: Option<usize>,
    pub reason: String,
    pub artifacts_dir: PathBuf,
    pub requests: PathBuf,
    pub trace: PathBuf,
}

impl FailureRecord {
    /// Command line that re-runs exactly this trial.
    pub fn replay_command(&self) -> String {
        replay_command(self.component, self.campaign_seed, self.depth, self.trial_seed)
    }
}

/// Command line that re-runs one trial of a campaign.
pub fn replay_command(
    component: Component,
    campaign_seed: u64,
    depth: u64,
    trial_seed: u64,
) -> String {
    format!(
        "SEED={campaign_seed} INIT_DEPTH={depth} hwfuzz {} --replay {trial_seed}",
        component.command()
    )
}

impl fmt::Display for FailureRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Test failed at depth {}, trial {}", self.depth, self.trial)?;
        match self.line {
            Some(line) => writeln!(f, "Reason: {} (line {})", self.reason, line)?,
            None => writeln!(f, "Reason: {}", self.reason)?,
        }
        writeln!(
            f,
            "For details, see directory '{}/'",
            self.artifacts_dir.display()
        )?;
        writeln!(f, "Replay: {}", self.replay_command())
    }
}

/// How a campaign ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CampaignOutcome {
    /// The iteration cap was reached with every trial passing.
    Completed,
    /// A trial violated an invariant; the campaign halted.
    Failed(FailureRecord),
}

/// Summary of one campaign.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CampaignReport {
    pub component: Component,
    pub seed: u64,
    /// Depth levels in which every trial passed.
    pub depth_levels_passed: u64,
    pub trials_passed: u64,
    /// Depth of the last trial run.
    pub last_depth: u64,
    pub outcome: CampaignOutcome,
}

impl CampaignReport {
    pub fn is_success(&self) -> bool {
        self.outcome == CampaignOutcome::Completed
    }

    pub fn exit_code(&self) -> u8 {
        match self.outcome {
            CampaignOutcome::Completed => ExitStatus::SUCCESS,
            CampaignOutcome::Failed(_) => ExitStatus::VIOLATION,
        }
    }

    pub fn failure(&self) -> Option<&FailureRecord> {
        match &self.outcome {
            CampaignOutcome::Completed => None,
            CampaignOutcome::Failed(record) => Some(record),
        }
    }
}

impl fmt::Display for CampaignReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Campaign Report ===")?;
        writeln!(f, "Component: {}", self.component)?;
        writeln!(f, "Seed: {}", self.seed)?;
        writeln!(f, "Depth levels passed: {}", self.depth_levels_passed)?;
        writeln!(f, "Trials passed: {}", self.trials_passed)?;
        writeln!(f, "Last depth: {}", self.last_depth)?;

        match &self.outcome {
            CampaignOutcome::Completed => writeln!(f, "Outcome: OK")?,
            CampaignOutcome::Failed(record) => {
                writeln!(f, "Outcome: FAILED")?;
                writeln!(f)?;
                writeln!(f, "=== Failure ===")?;
                write!(f, "{record}")?;
            }
        }
        Ok(())
    }
}
