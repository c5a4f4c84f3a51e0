//! # hwfuzz
//!
//! Randomized correctness testing for concurrent hardware components.
//!
//! A campaign repeatedly generates a random request script, feeds it to a
//! device under test (DUT), captures the event trace the DUT prints and
//! checks that trace against a reference model. Scripts grow longer each
//! time a batch of trials passes, so shallow bugs surface quickly and deep
//! ones eventually. The first failing trial halts the campaign with its
//! requests and trace preserved on disk.
//!
//! ## Components
//!
//! | Component | Oracle |
//! |-----------|--------|
//! | Mailbox | Receives must match a pending snapshot of the sender's scratchpad |
//! | Memory | External consistency checker (`axe check wmo trace.axe`) |
//! | Array of queues | FIFO per queue index |
//!
//! ## Pipeline
//!
//! - [`workload`]: operation vocabularies and weights per component
//! - [`generator`]: seeded request script generation
//! - [`producer`]: runs the DUT and captures the trace
//! - [`validator`]: reference models and the external checker
//! - [`driver`]: the depth-escalating campaign loop
//!
//! ## Quick Start
//!
//! ```ignore
//! use hwfuzz::{CampaignBuilder, CampaignConfig, ProcessDevice, WorkloadModel};
//!
//! let config = CampaignConfig::default();
//! let timeout = config.timeout;
//! let mut campaign = CampaignBuilder::new(config, WorkloadModel::ArrayOfQueue(Default::default()))
//!     .device(ProcessDevice::new("./testArrayOfQueue", timeout))
//!     .build()?;
//! println!("{}", campaign.run().await?);
//! ```
//!
//! Every trial derives its own seed from the campaign seed, so a failure is
//! reproduced with `hwfuzz <component> --replay <trial seed>`.

pub mod cli;
pub mod config;
pub mod driver;
pub mod error;
pub mod generator;
pub mod process;
pub mod producer;
pub mod report;
pub mod rng;
pub mod script;
pub mod trace;
pub mod validator;
pub mod workload;

pub use config::CampaignConfig;
pub use driver::{Campaign, CampaignBuilder, CampaignState};
pub use error::{HarnessError, HarnessResult};
pub use generator::{AddressPlan, RequestGenerator, TestMode};
pub use process::RunOutput;
pub use producer::{ArtifactPaths, Device, ProcessDevice, TraceArtifact, TraceProducer};
pub use report::{CampaignOutcome, CampaignReport, FailureRecord};
pub use rng::SimRandom;
pub use script::{MailboxOp, MemoryOp, Operation, QueueOp, RequestScript};
pub use validator::{
    ConsistencyChecker, ProcessChecker, QueueCheck, TraceValidator, Verdict, Violation,
};
pub use workload::{Component, MailboxWorkload, MemoryWorkload, QueueWorkload, WorkloadModel};
