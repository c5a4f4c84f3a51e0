//! Campaign configuration.
//!
//! | Key | Field | Default |
//! |-----|-------|---------|
//! | `SEED` | `seed` | 0 |
//! | `NUM_ITERATIONS` | `num_iterations` | 10 (0 = unbounded) |
//! | `INIT_DEPTH` | `init_depth` | 1000 |
//! | `INCR_DEPTH` | `depth_increment` | 1000 |
//! | `TESTS_PER_DEPTH` | `trials_per_depth` | 100 |
//! | `LOG_DIR` | `log_dir` | `test-<component>-log` |
//! | `TIMEOUT_SECS` | `timeout` | 60 s |
//!
//! Component parameters live in [`crate::workload`].

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{HarnessError, HarnessResult};

/// Settings of one escalation campaign.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CampaignConfig {
    /// Seed of the campaign random stream.
    pub seed: u64,
    /// Depth levels to pass before stopping; `None` runs until a failure.
    pub num_iterations: Option<u64>,
    pub init_depth: u64,
    pub depth_increment: u64,
    pub trials_per_depth: u64,
    /// Directory holding the latest trial's artifacts.
    pub log_dir: PathBuf,
    /// Limit on every subprocess invocation. Fixed for the whole campaign,
    /// so it must cover the largest depth the campaign will reach.
    pub timeout: Duration,
    /// Run a single trial at `init_depth` with this trial seed.
    pub replay: Option<u64>,
}

impl Default for CampaignConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            num_iterations: Some(10),
            init_depth: 1000,
            depth_increment: 1000,
            trials_per_depth: 100,
            log_dir: PathBuf::from("test-log"),
            timeout: Duration::from_secs(60),
            replay: None,
        }
    }
}

impl CampaignConfig {
    /// Reject settings that cannot produce a meaningful campaign.
    pub fn validate(&self) -> HarnessResult<()> {
        if self.trials_per_depth == 0 {
            return Err(HarnessError::Config("trials per depth must be positive".into()));
        }
        if self.timeout.is_zero() {
            return Err(HarnessError::Config("timeout must be positive".into()));
        }
        if self.log_dir.as_os_str().is_empty() {
            return Err(HarnessError::Config("log directory must not be empty".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert_eq!(CampaignConfig::default().validate(), Ok(()));
    }

    #[test]
    fn test_zero_trials_rejected() {
        let config = CampaignConfig {
            trials_per_depth: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(HarnessError::Config(_))));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let config = CampaignConfig {
            timeout: Duration::ZERO,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
