//! Command-line and environment configuration.
//!
//! Every option can be given as a flag or through the environment key shown
//! in `--help`; the flag wins. One subcommand per component:
//!
//! ```bash
//! SEED=3 TESTS_PER_DEPTH=20 hwfuzz queue --dut ./testArrayOfQueue
//! hwfuzz memory --checker axe --num-threads 8
//! ```

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use crate::config::CampaignConfig;
use crate::driver::{Campaign, CampaignBuilder};
use crate::error::HarnessResult;
use crate::producer::ProcessDevice;
use crate::validator::{ProcessChecker, QueueCheck, WEAK_MEMORY_ORDER};
use crate::workload::{
    Component, MailboxWeights, MailboxWorkload, MemoryWeights, MemoryWorkload, QueueWeights,
    QueueWorkload, WorkloadModel,
};

#[derive(Parser, Debug)]
#[command(name = "hwfuzz")]
#[command(about = "Randomized trace checking for hardware components", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Message-passing mailbox
    Mailbox(MailboxArgs),
    /// Cache and memory subsystem, checked by an external consistency checker
    Memory(MemoryArgs),
    /// Array of FIFO queues
    Queue(QueueArgs),
}

/// Options shared by every component.
#[derive(Args, Debug, Clone)]
pub struct CampaignArgs {
    /// Campaign seed
    #[arg(long, env = "SEED", default_value_t = 0)]
    pub seed: u64,

    /// Depth levels to pass before exiting (0 runs until failure)
    #[arg(long, env = "NUM_ITERATIONS", default_value_t = 10)]
    pub num_iterations: u64,

    /// Operations per script at the first depth
    #[arg(long, env = "INIT_DEPTH", default_value_t = 1000)]
    pub init_depth: u64,

    /// Operations added per depth level
    #[arg(long, env = "INCR_DEPTH", default_value_t = 1000)]
    pub incr_depth: u64,

    /// Trials run at each depth
    #[arg(long, env = "TESTS_PER_DEPTH", default_value_t = 100)]
    pub tests_per_depth: u64,

    /// Artifact directory (default: test-<component>-log)
    #[arg(long, env = "LOG_DIR")]
    pub log_dir: Option<PathBuf>,

    /// DUT executable (default: the component's test bench in the current directory)
    #[arg(long, env = "DUT")]
    pub dut: Option<PathBuf>,

    /// Seconds before a DUT or checker run is killed.
    ///
    /// The limit does not scale with depth: in long or unbounded campaigns
    /// raise it so a slow DUT at large depths is not reported as hung.
    #[arg(long, env = "TIMEOUT_SECS", default_value_t = 60)]
    pub timeout_secs: u64,

    /// Run one trial at INIT_DEPTH with this trial seed
    #[arg(long)]
    pub replay: Option<u64>,
}

#[derive(Args, Debug, Clone)]
pub struct MailboxArgs {
    #[command(flatten)]
    pub campaign: CampaignArgs,

    #[arg(long, env = "NUM_THREADS", default_value_t = 4)]
    pub num_threads: u32,

    #[arg(long, env = "MAX_DELAY", default_value_t = 16)]
    pub max_delay: u32,
}

#[derive(Args, Debug, Clone)]
pub struct MemoryArgs {
    #[command(flatten)]
    pub campaign: CampaignArgs,

    #[arg(long, env = "NUM_THREADS", default_value_t = 16)]
    pub num_threads: u32,

    /// Base offsets in the shared address set
    #[arg(long, env = "NUM_ADDRS", default_value_t = 3)]
    pub num_addrs: u32,

    #[arg(long, env = "MAX_DELAY", default_value_t = 8)]
    pub max_delay: u32,

    #[arg(long, env = "ASSOC", default_value_t = 4)]
    pub assoc: u32,

    /// Flush chance per operation, out of 20
    #[arg(long, env = "FLUSHES", default_value_t = 1)]
    pub flushes: u32,

    /// Consistency checker executable
    #[arg(long, env = "CHECKER", default_value = "axe")]
    pub checker: PathBuf,

    /// Memory model passed to the checker
    #[arg(long, env = "CONSISTENCY_MODEL", default_value = WEAK_MEMORY_ORDER)]
    pub consistency_model: String,
}

#[derive(Args, Debug, Clone)]
pub struct QueueArgs {
    #[command(flatten)]
    pub campaign: CampaignArgs,

    #[arg(long, env = "NUM_QUEUES", default_value_t = 4)]
    pub num_queues: u32,

    #[arg(long, env = "MAX_DELAY", default_value_t = 5)]
    pub max_delay: u32,

    /// Replay strategy for queue traces
    #[arg(long, env = "QUEUE_CHECK", value_enum, default_value_t = QueueCheck::TwoPass)]
    pub queue_check: QueueCheck,
}

impl Command {
    pub fn component(&self) -> Component {
        match self {
            Command::Mailbox(_) => Component::Mailbox,
            Command::Memory(_) => Component::Memory,
            Command::Queue(_) => Component::ArrayOfQueue,
        }
    }

    fn campaign_args(&self) -> &CampaignArgs {
        match self {
            Command::Mailbox(args) => &args.campaign,
            Command::Memory(args) => &args.campaign,
            Command::Queue(args) => &args.campaign,
        }
    }

    /// Campaign settings with per-component defaults filled in.
    pub fn campaign_config(&self) -> CampaignConfig {
        let args = self.campaign_args();
        let log_dir = args
            .log_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(self.component().default_log_dir()));
        CampaignConfig {
            seed: args.seed,
            num_iterations: (args.num_iterations > 0).then_some(args.num_iterations),
            init_depth: args.init_depth,
            depth_increment: args.incr_depth,
            trials_per_depth: args.tests_per_depth,
            log_dir,
            timeout: Duration::from_secs(args.timeout_secs),
            replay: args.replay,
        }
    }

    pub fn workload_model(&self) -> WorkloadModel {
        match self {
            Command::Mailbox(args) => WorkloadModel::Mailbox(MailboxWorkload {
                num_threads: args.num_threads,
                max_delay: args.max_delay,
                weights: MailboxWeights::default(),
            }),
            Command::Memory(args) => WorkloadModel::Memory(MemoryWorkload {
                num_threads: args.num_threads,
                num_addrs: args.num_addrs,
                max_delay: args.max_delay,
                assoc: args.assoc,
                flushes: args.flushes,
                weights: MemoryWeights::default(),
            }),
            Command::Queue(args) => WorkloadModel::ArrayOfQueue(QueueWorkload {
                num_queues: args.num_queues,
                max_delay: args.max_delay,
                weights: QueueWeights::default(),
            }),
        }
    }

    /// Path of the DUT executable.
    pub fn dut(&self) -> PathBuf {
        self.campaign_args()
            .dut
            .clone()
            .unwrap_or_else(|| PathBuf::from(self.component().default_dut()))
    }

    /// Wire the external executables into a ready campaign.
    pub fn build_campaign(&self) -> HarnessResult<Campaign> {
        let config = self.campaign_config();
        let timeout = config.timeout;
        let builder = CampaignBuilder::new(config, self.workload_model())
            .device(ProcessDevice::new(self.dut(), timeout));

        let builder = match self {
            Command::Memory(args) => builder.checker(
                ProcessChecker::new(args.checker.clone(), timeout),
                args.consistency_model.clone(),
            ),
            Command::Queue(args) => builder.queue_check(args.queue_check),
            Command::Mailbox(_) => builder,
        };
        builder.build()
    }
}
