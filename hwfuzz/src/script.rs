//! Request scripts and their line encoding.
//!
//! A script is an ordered list of operations in the DUT's request protocol,
//! one whitespace-separated line per operation with the op-code letter
//! first, always terminated by a single bare `E`.

use std::fmt;

/// Mailbox request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MailboxOp {
    /// `D <cycles>`
    Delay { cycles: u32 },
    /// `S <src> <dst>`: send the sender's scratchpad to `dst`.
    Send { src: u32, dst: u32 },
    /// `W <thread> <word1> <word2>`: overwrite the thread's scratchpad.
    Write { thread: u32, word1: u64, word2: u64 },
}

/// Memory-subsystem request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryOp {
    /// `L <thread> <addr>`
    Load { thread: u32, addr: u64 },
    /// `S <thread> <addr> <value>`
    Store { thread: u32, addr: u64, value: u64 },
    /// `F <thread> <line> <way>`
    Flush { thread: u32, line: u32, way: u32 },
    /// `B <cycles>`
    Barrier { cycles: u32 },
    /// `D <cycles>`
    Delay { cycles: u32 },
}

/// Array-of-queue request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueOp {
    /// `I <index> <item>`
    Insert { index: u32, item: u64 },
    /// `R <index>`
    Remove { index: u32 },
    /// `D <cycles>`
    Delay { cycles: u32 },
    /// `C <cycles>`
    Clear { cycles: u32 },
}

/// One line of a request script.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Mailbox(MailboxOp),
    Memory(MemoryOp),
    Queue(QueueOp),
    /// Sentinel `E`, always the last line.
    End,
}

impl Operation {
    /// Whether the DUT reports this operation in its trace.
    pub fn produces_event(&self) -> bool {
        matches!(
            self,
            Operation::Mailbox(MailboxOp::Send { .. } | MailboxOp::Write { .. })
                | Operation::Memory(MemoryOp::Load { .. } | MemoryOp::Store { .. })
                | Operation::Queue(QueueOp::Insert { .. })
        )
    }
}

impl fmt::Display for MailboxOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MailboxOp::Delay { cycles } => write!(f, "D {cycles}"),
            MailboxOp::Send { src, dst } => write!(f, "S {src} {dst}"),
            MailboxOp::Write {
                thread,
                word1,
                word2,
            } => write!(f, "W {thread} {word1} {word2}"),
        }
    }
}

impl fmt::Display for MemoryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemoryOp::Load { thread, addr } => write!(f, "L {thread} {addr}"),
            MemoryOp::Store {
                thread,
                addr,
                value,
            } => write!(f, "S {thread} {addr} {value}"),
            MemoryOp::Flush { thread, line, way } => write!(f, "F {thread} {line} {way}"),
            MemoryOp::Barrier { cycles } => write!(f, "B {cycles}"),
            MemoryOp::Delay { cycles } => write!(f, "D {cycles}"),
        }
    }
}

impl fmt::Display for QueueOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueueOp::Insert { index, item } => write!(f, "I {index} {item}"),
            QueueOp::Remove { index } => write!(f, "R {index}"),
            QueueOp::Delay { cycles } => write!(f, "D {cycles}"),
            QueueOp::Clear { cycles } => write!(f, "C {cycles}"),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Mailbox(op) => op.fmt(f),
            Operation::Memory(op) => op.fmt(f),
            Operation::Queue(op) => op.fmt(f),
            Operation::End => f.write_str("E"),
        }
    }
}

/// An ordered request script ending in exactly one [`Operation::End`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestScript {
    ops: Vec<Operation>,
}

impl RequestScript {
    /// Build a script from its body. Any `End` inside the body is dropped
    /// and a single one is appended.
    pub fn new(mut body: Vec<Operation>) -> Self {
        body.retain(|op| *op != Operation::End);
        body.push(Operation::End);
        Self { ops: body }
    }

    /// All operations, including the trailing `End`.
    pub fn operations(&self) -> &[Operation] {
        &self.ops
    }

    /// Operations before the trailing `End`.
    pub fn body(&self) -> &[Operation] {
        &self.ops[..self.ops.len() - 1]
    }

    /// Whether a working DUT must emit at least one trace event.
    pub fn expects_events(&self) -> bool {
        self.ops.iter().any(Operation::produces_event)
    }

    /// Serialize to the request protocol, one line per operation.
    pub fn encode(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for RequestScript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for op in &self.ops {
            writeln!(f, "{op}")?;
        }
        Ok(())
    }
}
