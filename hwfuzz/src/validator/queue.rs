//! Array-of-queue reference model.
//!
//! Every queue is strict FIFO. Two replay strategies are available:
//!
//! - [`QueueCheck::TwoPass`]: all inserts first, in line order, then all
//!   removes. Tolerates a DUT that logs a dequeue before the enqueue it
//!   consumes.
//! - [`QueueCheck::SinglePass`]: inserts and removes applied in one scan,
//!   so a remove may only consume items inserted on earlier lines.

use std::collections::{BTreeMap, VecDeque};

use crate::trace::{QueueEvent, TraceLine};

use super::{Verdict, Violation};

/// How queue events are replayed against the reference model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum QueueCheck {
    #[default]
    TwoPass,
    SinglePass,
}

/// One FIFO sequence per queue index.
#[derive(Debug, Clone, Default)]
pub struct QueueRefModel {
    queues: BTreeMap<u32, VecDeque<u64>>,
}

impl QueueRefModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, index: u32, item: u64) {
        self.queues.entry(index).or_default().push_back(item);
    }

    /// Pop the front of queue `index` and compare it with `item`.
    fn remove(&mut self, line: usize, index: u32, item: u64) -> Result<(), Violation> {
        match self.queues.get_mut(&index).and_then(VecDeque::pop_front) {
            None => Err(Violation::at(
                line,
                format!("dequeue from empty queue {index}"),
            )),
            Some(expected) if expected != item => Err(Violation::at(
                line,
                format!("bad dequeue on queue {index}: got {item}, expected {expected}"),
            )),
            Some(_) => Ok(()),
        }
    }

    /// Items still queued at `index`, front first.
    #[cfg(test)]
    fn contents(&self, index: u32) -> Vec<u64> {
        self.queues
            .get(&index)
            .map(|queue| queue.iter().copied().collect())
            .unwrap_or_default()
    }
}

/// Replay queue events with the chosen strategy.
pub fn check(events: &[TraceLine<QueueEvent>], strategy: QueueCheck) -> Verdict {
    let outcome = match strategy {
        QueueCheck::TwoPass => replay_two_pass(events),
        QueueCheck::SinglePass => replay_single_pass(events),
    };
    match outcome {
        Ok(()) => Verdict::Pass,
        Err(violation) => Verdict::Fail(violation),
    }
}

fn replay_two_pass(events: &[TraceLine<QueueEvent>]) -> Result<(), Violation> {
    let mut model = QueueRefModel::new();
    for line in events {
        if let QueueEvent::Insert { index, item } = line.event {
            model.insert(index, item);
        }
    }
    for line in events {
        if let QueueEvent::Remove { index, item } = line.event {
            model.remove(line.number, index, item)?;
        }
    }
    Ok(())
}

fn replay_single_pass(events: &[TraceLine<QueueEvent>]) -> Result<(), Violation> {
    let mut model = QueueRefModel::new();
    for line in events {
        match line.event {
            QueueEvent::Insert { index, item } => model.insert(index, item),
            QueueEvent::Remove { index, item } => model.remove(line.number, index, item)?,
        }
    }
    Ok(())
}
