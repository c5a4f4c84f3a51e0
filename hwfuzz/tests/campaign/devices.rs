//! In-process device models and checkers.
//!
//! Each device reads the request file the producer wrote and prints the
//! trace a correct (or deliberately broken) DUT would print.

use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};
use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use std::rc::Rc;

use async_trait::async_trait;
use hwfuzz::{ConsistencyChecker, Device, HarnessResult, RunOutput};

fn request_lines(requests: &Path) -> HarnessResult<Vec<Vec<String>>> {
    let text = fs::read_to_string(requests)?;
    Ok(text
        .lines()
        .map(|line| line.split_whitespace().map(str::to_string).collect())
        .collect())
}

fn field(tokens: &[String], index: usize) -> u64 {
    tokens
        .get(index)
        .and_then(|token| token.parse().ok())
        .unwrap_or_else(|| panic!("bad request line {tokens:?}"))
}

/// Array of queues; `lifo` pops the back instead of the front.
pub struct QueueModel {
    lifo: bool,
}

impl QueueModel {
    pub fn fifo() -> Self {
        Self { lifo: false }
    }

    pub fn lifo() -> Self {
        Self { lifo: true }
    }
}

#[async_trait(?Send)]
impl Device for QueueModel {
    fn name(&self) -> &str {
        if self.lifo { "lifo-queue" } else { "fifo-queue" }
    }

    async fn execute(&self, requests: &Path) -> HarnessResult<RunOutput> {
        let mut queues: BTreeMap<u64, VecDeque<u64>> = BTreeMap::new();
        let mut out = String::from("Warning: model device\n");
        for tokens in request_lines(requests)? {
            match tokens.first().map(String::as_str) {
                Some("I") => {
                    let (index, item) = (field(&tokens, 1), field(&tokens, 2));
                    queues.entry(index).or_default().push_back(item);
                    writeln!(out, "I {index} {item}").expect("write");
                }
                Some("R") => {
                    let index = field(&tokens, 1);
                    let queue = queues.entry(index).or_default();
                    let popped = if self.lifo {
                        queue.pop_back()
                    } else {
                        queue.pop_front()
                    };
                    if let Some(item) = popped {
                        writeln!(out, "R {index} {item}").expect("write");
                    }
                }
                _ => {}
            }
        }
        Ok(RunOutput::completed(out))
    }
}

/// Mailbox that delivers each send immediately.
///
/// With `late_delivery` the payload is read from the sender's scratchpad at
/// the end of the script instead of at send time.
pub struct MailboxModel {
    late_delivery: bool,
}

impl MailboxModel {
    pub fn correct() -> Self {
        Self {
            late_delivery: false,
        }
    }

    pub fn late_delivery() -> Self {
        Self {
            late_delivery: true,
        }
    }
}

#[async_trait(?Send)]
impl Device for MailboxModel {
    fn name(&self) -> &str {
        "mailbox"
    }

    async fn execute(&self, requests: &Path) -> HarnessResult<RunOutput> {
        let mut scratchpad: BTreeMap<u64, (u64, u64)> = BTreeMap::new();
        let mut deferred = Vec::new();
        let mut out = String::new();
        for tokens in request_lines(requests)? {
            match tokens.first().map(String::as_str) {
                Some("W") => {
                    let (thread, a, b) = (field(&tokens, 1), field(&tokens, 2), field(&tokens, 3));
                    scratchpad.insert(thread, (a, b));
                    writeln!(out, "W {thread} {a} {b}").expect("write");
                }
                Some("S") => {
                    let (src, dst) = (field(&tokens, 1), field(&tokens, 2));
                    writeln!(out, "S {src} {dst}").expect("write");
                    if self.late_delivery {
                        deferred.push((src, dst));
                    } else {
                        let (a, b) = scratchpad.get(&src).copied().unwrap_or((src, 100 + src));
                        writeln!(out, "R {dst} {a} {b}").expect("write");
                    }
                }
                _ => {}
            }
        }
        for (src, dst) in deferred {
            let (a, b) = scratchpad.get(&src).copied().unwrap_or((src, 100 + src));
            writeln!(out, "R {dst} {a} {b}").expect("write");
        }
        Ok(RunOutput::completed(out))
    }
}

/// Memory device that echoes every load and store request.
pub struct MemoryEcho;

#[async_trait(?Send)]
impl Device for MemoryEcho {
    fn name(&self) -> &str {
        "memory-echo"
    }

    async fn execute(&self, requests: &Path) -> HarnessResult<RunOutput> {
        let mut out = String::new();
        for tokens in request_lines(requests)? {
            if matches!(tokens.first().map(String::as_str), Some("L" | "S")) {
                writeln!(out, "{}", tokens.join(" ")).expect("write");
            }
        }
        Ok(RunOutput::completed(out))
    }
}

/// Device that never prints anything.
pub struct Silent;

#[async_trait(?Send)]
impl Device for Silent {
    fn name(&self) -> &str {
        "silent"
    }

    async fn execute(&self, _requests: &Path) -> HarnessResult<RunOutput> {
        Ok(RunOutput::completed(""))
    }
}

/// Wraps a device and records the operation count of every script it runs.
pub struct Recording<D> {
    inner: D,
    pub depths: Rc<RefCell<Vec<usize>>>,
}

impl<D> Recording<D> {
    pub fn new(inner: D) -> Self {
        Self {
            inner,
            depths: Rc::default(),
        }
    }
}

#[async_trait(?Send)]
impl<D: Device> Device for Recording<D> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn execute(&self, requests: &Path) -> HarnessResult<RunOutput> {
        // Every line but the trailing `E` is one operation.
        let ops = request_lines(requests)?.len() - 1;
        self.depths.borrow_mut().push(ops);
        self.inner.execute(requests).await
    }
}

/// Consistency checker answering with a fixed verdict.
pub struct FixedChecker {
    answer: &'static str,
    pub calls: Rc<RefCell<Vec<String>>>,
}

impl FixedChecker {
    pub fn answering(answer: &'static str) -> Self {
        Self {
            answer,
            calls: Rc::default(),
        }
    }
}

#[async_trait(?Send)]
impl ConsistencyChecker for FixedChecker {
    fn name(&self) -> &str {
        "fixed"
    }

    async fn check(&self, trace: &Path, model: &str) -> HarnessResult<String> {
        assert!(trace.exists(), "checker called before trace was written");
        self.calls.borrow_mut().push(model.to_string());
        Ok(format!("{}\n", self.answer))
    }
}
