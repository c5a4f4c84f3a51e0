//! Shared infrastructure for campaign tests.

pub mod devices;
pub mod tests;

use std::path::Path;
use std::time::Duration;

use hwfuzz::CampaignConfig;

/// Small, fast campaign settings writing artifacts under `dir`.
pub fn small_config(dir: &Path) -> CampaignConfig {
    CampaignConfig {
        seed: 11,
        num_iterations: Some(3),
        init_depth: 40,
        depth_increment: 20,
        trials_per_depth: 5,
        log_dir: dir.join("log"),
        timeout: Duration::from_secs(10),
        replay: None,
    }
}
