//! Request generation.
//!
//! [`RequestGenerator::generate`] turns a workload model, an operation
//! count and a seed into a [`RequestScript`]. Generation is a pure function
//! of those inputs, so a failing trial is reproduced by replaying its seed
//! at its depth.
//!
//! The memory workload additionally depends on an [`AddressPlan`] drawn
//! once per campaign: the test mode and address sets stay fixed across all
//! trials of a run.

use serde::Serialize;

use crate::rng::SimRandom;
use crate::script::{MailboxOp, MemoryOp, Operation, QueueOp, RequestScript};
use crate::workload::{
    MailboxWorkload, MemoryWorkload, QueueWorkload, WorkloadModel, FLUSH_CHANCE_DENOMINATOR,
};

/// Delay issued before and after a mailbox body so the pipeline drains
/// before `E`.
pub const SETTLE_DELAY_CYCLES: u32 = 100;

/// Largest payload word or queue item.
const MAX_PAYLOAD: u64 = 1000;

/// Largest base offset (in words) of a shared memory address.
const MAX_BASE_OFFSET: u64 = 200;

/// Address distance between conflicting lines in the same set.
const SET_STRIDE: u64 = 1024;

/// Largest per-thread skew (in words) in exclusive mode.
const MAX_THREAD_SKEW: u64 = 7;

/// Largest cache line index a flush may target.
const MAX_FLUSH_LINE: u32 = 64;

/// How memory addresses relate to threads for a whole campaign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TestMode {
    /// All threads share a small address set with a 1:1 address to line
    /// mapping.
    LineGrain,
    /// Each thread works in its own disjoint range of lines.
    Exclusive,
}

/// Addresses available to memory requests, fixed for a campaign.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressPlan {
    mode: TestMode,
    shared: Vec<u64>,
    per_thread: Vec<Vec<u64>>,
}

impl AddressPlan {
    /// Draw a test mode and both address layouts.
    pub fn draw(workload: &MemoryWorkload, random: &mut SimRandom) -> Self {
        let mode = if random.random_range(0..2u32) == 0 {
            TestMode::LineGrain
        } else {
            TestMode::Exclusive
        };

        // Each base offset yields assoc + 1 addresses mapping to the same set,
        // enough to force an eviction.
        let mut shared = Vec::new();
        for _ in 0..workload.num_addrs {
            let offset = random.random_inclusive(0..=MAX_BASE_OFFSET);
            for way in 0..=u64::from(workload.assoc) {
                shared.push(4 * offset + way * SET_STRIDE);
            }
        }

        let region = SET_STRIDE * (u64::from(workload.assoc) + 1);
        let per_thread = (0..u64::from(workload.num_threads))
            .map(|thread| {
                let skew = 4 * random.random_inclusive(0..=MAX_THREAD_SKEW);
                shared
                    .iter()
                    .map(|addr| addr + region * (thread + 1) + skew)
                    .collect()
            })
            .collect();

        Self {
            mode,
            shared,
            per_thread,
        }
    }

    /// The campaign's test mode.
    pub fn mode(&self) -> TestMode {
        self.mode
    }

    /// Addresses a given thread may touch under this plan.
    pub fn addresses_for(&self, thread: u32) -> &[u64] {
        match self.mode {
            TestMode::LineGrain => &self.shared,
            TestMode::Exclusive => &self.per_thread[thread as usize],
        }
    }
}

/// Builds request scripts for one campaign.
#[derive(Debug, Clone)]
pub struct RequestGenerator {
    vocabulary: Vocabulary,
}

#[derive(Debug, Clone)]
enum Vocabulary {
    Mailbox(MailboxWorkload),
    Memory(MemoryWorkload, AddressPlan),
    ArrayOfQueue(QueueWorkload),
}

impl RequestGenerator {
    /// Create a generator, drawing any per-campaign state from
    /// `campaign_random`.
    pub fn new(model: WorkloadModel, campaign_random: &mut SimRandom) -> Self {
        let vocabulary = match model {
            WorkloadModel::Mailbox(workload) => Vocabulary::Mailbox(workload),
            WorkloadModel::Memory(workload) => {
                let plan = AddressPlan::draw(&workload, campaign_random);
                Vocabulary::Memory(workload, plan)
            }
            WorkloadModel::ArrayOfQueue(workload) => Vocabulary::ArrayOfQueue(workload),
        };
        Self { vocabulary }
    }

    /// The memory address plan, if this is a memory campaign.
    pub fn address_plan(&self) -> Option<&AddressPlan> {
        match &self.vocabulary {
            Vocabulary::Memory(_, plan) => Some(plan),
            Vocabulary::Mailbox(_) | Vocabulary::ArrayOfQueue(_) => None,
        }
    }

    /// Generate a script with `op_count` random operations from `seed`.
    pub fn generate(&self, op_count: u64, seed: u64) -> RequestScript {
        let mut random = SimRandom::new(seed);
        let body = match &self.vocabulary {
            Vocabulary::Mailbox(workload) => mailbox_body(workload, op_count, &mut random),
            Vocabulary::Memory(workload, plan) => {
                memory_body(workload, plan, op_count, &mut random)
            }
            Vocabulary::ArrayOfQueue(workload) => queue_body(workload, op_count, &mut random),
        };
        RequestScript::new(body)
    }
}

fn mailbox_body(
    workload: &MailboxWorkload,
    op_count: u64,
    random: &mut SimRandom,
) -> Vec<Operation> {
    let settle = Operation::Mailbox(MailboxOp::Delay {
        cycles: SETTLE_DELAY_CYCLES,
    });

    let mut body = Vec::with_capacity(op_count as usize + 2);
    body.push(settle);
    let weights = workload.weights.as_array();
    for _ in 0..op_count {
        let choice = random.pick_weighted(&weights);
        let thread = random.random_range(0..workload.num_threads);
        let op = match choice {
            Some(0) => MailboxOp::Send {
                src: thread,
                dst: random.random_range(1..workload.num_threads),
            },
            Some(1) => MailboxOp::Write {
                thread,
                word1: random.random_inclusive(1..=MAX_PAYLOAD),
                word2: random.random_inclusive(1..=MAX_PAYLOAD),
            },
            _ => MailboxOp::Delay {
                cycles: random.random_inclusive(1..=workload.max_delay),
            },
        };
        body.push(Operation::Mailbox(op));
    }
    body.push(settle);
    body
}

fn memory_body(
    workload: &MemoryWorkload,
    plan: &AddressPlan,
    op_count: u64,
    random: &mut SimRandom,
) -> Vec<Operation> {
    let w = &workload.weights;
    let mut next_value = 1u64;

    let mut body = Vec::with_capacity(op_count as usize);
    for _ in 0..op_count {
        let flush_eligible =
            random.random_inclusive(1..=FLUSH_CHANCE_DENOMINATOR) <= workload.flushes;
        let flush = if flush_eligible { w.flush } else { 0 };
        let choice = random.pick_weighted(&[w.store, w.load, w.delay, w.barrier, flush]);
        let thread = random.random_range(0..workload.num_threads);

        let op = match choice {
            Some(0) => {
                let addr = pick_address(plan, thread, random);
                let value = next_value;
                next_value += 1;
                MemoryOp::Store {
                    thread,
                    addr,
                    value,
                }
            }
            Some(1) => MemoryOp::Load {
                thread,
                addr: pick_address(plan, thread, random),
            },
            Some(3) => MemoryOp::Barrier {
                cycles: random.random_inclusive(1..=workload.max_delay),
            },
            Some(4) => MemoryOp::Flush {
                thread,
                line: random.random_inclusive(0..=MAX_FLUSH_LINE),
                way: random.random_inclusive(0..=workload.assoc),
            },
            _ => MemoryOp::Delay {
                cycles: random.random_inclusive(1..=workload.max_delay),
            },
        };
        body.push(Operation::Memory(op));
    }
    body
}

fn pick_address(plan: &AddressPlan, thread: u32, random: &mut SimRandom) -> u64 {
    let addrs = plan.addresses_for(thread);
    addrs[random.random_range(0..addrs.len())]
}

fn queue_body(workload: &QueueWorkload, op_count: u64, random: &mut SimRandom) -> Vec<Operation> {
    let weights = workload.weights.as_array();

    let mut body = Vec::with_capacity(op_count as usize);
    for _ in 0..op_count {
        let choice = random.pick_weighted(&weights);
        let index = random.random_range(0..workload.num_queues);
        let op = match choice {
            Some(0) => QueueOp::Insert {
                index,
                item: random.random_inclusive(1..=MAX_PAYLOAD),
            },
            Some(1) => QueueOp::Remove { index },
            Some(2) => QueueOp::Delay {
                cycles: random.random_inclusive(1..=workload.max_delay),
            },
            _ => QueueOp::Clear {
                cycles: random.random_inclusive(1..=workload.max_delay),
            },
        };
        body.push(Operation::Queue(op));
    }
    body
}
