//! Workload models: the operation vocabulary of each component.
//!
//! A workload model declares which operation kinds a request script may
//! contain, how often each is drawn, and the bounds of their parameters.
//! Models are plain data; all randomness lives in the generator.
//!
//! | Component | Kinds (default weight) |
//! |-----------|------------------------|
//! | mailbox | Send (4), Write (1), Delay (1) |
//! | memory | Store (7), Load (5), Delay (1), Barrier (1), Flush (1, gated by `flushes`) |
//! | array-of-queue | Insert (2), Remove (2), Delay (1), Clear (1) |

use std::fmt;

use serde::Serialize;

use crate::error::{HarnessError, HarnessResult};

/// Denominator of the per-operation flush chance (`flushes` out of 20).
pub const FLUSH_CHANCE_DENOMINATOR: u32 = 20;

/// The hardware component a campaign exercises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Component {
    /// Message-passing mailbox.
    Mailbox,
    /// Set-associative cache and memory subsystem.
    Memory,
    /// Array of FIFO queues.
    ArrayOfQueue,
}

impl Component {
    /// Short name used in logs and default paths.
    pub fn name(&self) -> &'static str {
        match self {
            Component::Mailbox => "mailbox",
            Component::Memory => "mem",
            Component::ArrayOfQueue => "array-of-queue",
        }
    }

    /// Command-line subcommand selecting this component.
    pub fn command(&self) -> &'static str {
        match self {
            Component::Mailbox => "mailbox",
            Component::Memory => "memory",
            Component::ArrayOfQueue => "queue",
        }
    }

    /// Conventional path of the DUT executable.
    pub fn default_dut(&self) -> &'static str {
        match self {
            Component::Mailbox => "./testMailbox",
            Component::Memory => "./testMem",
            Component::ArrayOfQueue => "./testArrayOfQueue",
        }
    }

    /// File name of the captured trace inside the artifact directory.
    ///
    /// The memory trace is consumed by the consistency checker, which
    /// expects its own extension.
    pub fn trace_file_name(&self) -> &'static str {
        match self {
            Component::Memory => "trace.axe",
            Component::Mailbox | Component::ArrayOfQueue => "trace.txt",
        }
    }

    /// Default artifact directory for this component.
    pub fn default_log_dir(&self) -> String {
        format!("test-{}-log", self.name())
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// Mailbox
// ============================================================================

/// Weights for mailbox operation selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailboxWeights {
    pub send: u32,
    pub write: u32,
    pub delay: u32,
}

impl Default for MailboxWeights {
    fn default() -> Self {
        Self {
            send: 4,
            write: 1,
            delay: 1,
        }
    }
}

impl MailboxWeights {
    /// Weights in `[send, write, delay]` order.
    pub fn as_array(&self) -> [u32; 3] {
        [self.send, self.write, self.delay]
    }
}

/// Parameters of a mailbox workload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailboxWorkload {
    /// Number of hardware threads. Thread 0 never receives.
    pub num_threads: u32,
    /// Upper bound (inclusive) of a delay operation, in cycles.
    pub max_delay: u32,
    pub weights: MailboxWeights,
}

impl Default for MailboxWorkload {
    fn default() -> Self {
        Self {
            num_threads: 4,
            max_delay: 16,
            weights: MailboxWeights::default(),
        }
    }
}

// ============================================================================
// Memory
// ============================================================================

/// Weights for memory operation selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryWeights {
    pub store: u32,
    pub load: u32,
    pub delay: u32,
    pub barrier: u32,
    /// Only applies on draws where the flush chance fires.
    pub flush: u32,
}

impl Default for MemoryWeights {
    fn default() -> Self {
        Self {
            store: 7,
            load: 5,
            delay: 1,
            barrier: 1,
            flush: 1,
        }
    }
}

/// Parameters of a memory-subsystem workload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryWorkload {
    pub num_threads: u32,
    /// Number of base offsets drawn for the shared address set.
    pub num_addrs: u32,
    pub max_delay: u32,
    /// Cache associativity; each base offset yields `assoc + 1` conflicting
    /// addresses.
    pub assoc: u32,
    /// Chance, out of [`FLUSH_CHANCE_DENOMINATOR`], that a flush is eligible
    /// for a given draw.
    pub flushes: u32,
    pub weights: MemoryWeights,
}

impl Default for MemoryWorkload {
    fn default() -> Self {
        Self {
            num_threads: 16,
            num_addrs: 3,
            max_delay: 8,
            assoc: 4,
            flushes: 1,
            weights: MemoryWeights::default(),
        }
    }
}

// ============================================================================
// Array of queues
// ============================================================================

/// Weights for queue operation selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueWeights {
    pub insert: u32,
    pub remove: u32,
    pub delay: u32,
    pub clear: u32,
}

impl Default for QueueWeights {
    fn default() -> Self {
        Self {
            insert: 2,
            remove: 2,
            delay: 1,
            clear: 1,
        }
    }
}

impl QueueWeights {
    /// Weights in `[insert, remove, delay, clear]` order.
    pub fn as_array(&self) -> [u32; 4] {
        [self.insert, self.remove, self.delay, self.clear]
    }
}

/// Parameters of an array-of-queue workload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueWorkload {
    pub num_queues: u32,
    pub max_delay: u32,
    pub weights: QueueWeights,
}

impl Default for QueueWorkload {
    fn default() -> Self {
        Self {
            num_queues: 4,
            max_delay: 5,
            weights: QueueWeights::default(),
        }
    }
}

// ============================================================================
// Model
// ============================================================================

/// A component together with its workload parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkloadModel {
    Mailbox(MailboxWorkload),
    Memory(MemoryWorkload),
    ArrayOfQueue(QueueWorkload),
}

impl WorkloadModel {
    /// The component this model drives.
    pub fn component(&self) -> Component {
        match self {
            WorkloadModel::Mailbox(_) => Component::Mailbox,
            WorkloadModel::Memory(_) => Component::Memory,
            WorkloadModel::ArrayOfQueue(_) => Component::ArrayOfQueue,
        }
    }

    /// Reject parameters the generator cannot sample from.
    pub fn validate(&self) -> HarnessResult<()> {
        match self {
            WorkloadModel::Mailbox(m) => {
                if m.num_threads < 2 {
                    return Err(config_error("mailbox needs at least 2 threads"));
                }
                require_positive("max delay", m.max_delay)?;
                require_positive("mailbox weights", m.weights.as_array().iter().sum())
            }
            WorkloadModel::Memory(m) => {
                require_positive("thread count", m.num_threads)?;
                require_positive("address count", m.num_addrs)?;
                require_positive("max delay", m.max_delay)?;
                require_positive("associativity", m.assoc)?;
                if m.flushes > FLUSH_CHANCE_DENOMINATOR {
                    return Err(config_error(format!(
                        "flush chance {} exceeds {}",
                        m.flushes, FLUSH_CHANCE_DENOMINATOR
                    )));
                }
                let w = &m.weights;
                require_positive("memory weights", w.store + w.load + w.delay + w.barrier)
            }
            WorkloadModel::ArrayOfQueue(m) => {
                require_positive("queue count", m.num_queues)?;
                require_positive("max delay", m.max_delay)?;
                require_positive("queue weights", m.weights.as_array().iter().sum())
            }
        }
    }
}

fn config_error(reason: impl Into<String>) -> HarnessError {
    HarnessError::Config(reason.into())
}

fn require_positive(what: &str, value: u32) -> HarnessResult<()> {
    if value == 0 {
        Err(config_error(format!("{what} must be positive")))
    } else {
        Ok(())
    }
}
